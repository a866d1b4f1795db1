//! Random but schema-valid claim data for demos and smoke tests.

use rand::Rng;
use std::io;

use crate::claim::ClaimRecord;

const GENDERS: &[&str] = &["Male", "Female", "Other"];
const PROVIDER_TYPES: &[&str] = &["Clinic", "Hospital", "Laboratory", "Pharmacy"];
const DIAGNOSIS_CODES: &[&str] = &["A09", "I10", "Z00.00"];
const PROCEDURE_CODES: &[&str] = &["99213", "99214", "71045"];
const ADMISSION_TYPES: &[&str] = &["Emergency", "Elective", "Urgent"];
const DISCHARGE_TYPES: &[&str] = &["Home", "Transfer to another facility"];
const SERVICE_TYPES: &[&str] = &["Inpatient", "Outpatient"];

fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&str]) -> String {
    options[rng.random_range(0..options.len())].to_string()
}

fn money<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    (rng.random_range(low..high) * 100.0).round() / 100.0
}

pub fn generate_claim<R: Rng + ?Sized>(rng: &mut R) -> ClaimRecord {
    ClaimRecord {
        claim_amount: money(rng, 100.0, 10_000.0),
        patient_age: rng.random_range(0..100),
        patient_gender: pick(rng, GENDERS),
        provider_type: pick(rng, PROVIDER_TYPES),
        diagnosis_code: pick(rng, DIAGNOSIS_CODES),
        procedure_code: pick(rng, PROCEDURE_CODES),
        number_of_procedures: rng.random_range(1..5),
        admission_type: pick(rng, ADMISSION_TYPES),
        discharge_type: pick(rng, DISCHARGE_TYPES),
        length_of_stay_days: rng.random_range(1..30),
        service_type: pick(rng, SERVICE_TYPES),
        deductible_amount: money(rng, 0.0, 1_000.0),
        copay_amount: money(rng, 0.0, 500.0),
        previous_claims_patient: rng.random_range(0..20),
        previous_claims_provider: rng.random_range(0..100),
        provider_patient_distance_miles: money(rng, 0.0, 50.0),
        claim_submitted_late: rng.random_bool(0.5),
    }
}

pub fn generate_claims<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<ClaimRecord> {
    (0..count).map(|_| generate_claim(rng)).collect()
}

/// Writes claims as CSV with the required column names as header.
pub fn write_csv<W: io::Write>(writer: W, claims: &[ClaimRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for claim in claims {
        writer.serialize(claim)?;
    }
    writer.flush()?;
    Ok(())
}
