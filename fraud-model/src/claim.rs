use serde::{Deserialize, Serialize};

use crate::{error::ProcessingError, table::Cell};

/// Column names the model expects, in the order it expects them.
pub const REQUIRED_COLUMNS: [&str; 17] = [
    "Claim_Amount",
    "Patient_Age",
    "Patient_Gender",
    "Provider_Type",
    "Diagnosis_Code",
    "Procedure_Code",
    "Number_of_Procedures",
    "Admission_Type",
    "Discharge_Type",
    "Length_of_Stay_Days",
    "Service_Type",
    "Deductible_Amount",
    "CoPay_Amount",
    "Number_of_Previous_Claims_Patient",
    "Number_of_Previous_Claims_Provider",
    "Provider_Patient_Distance_Miles",
    "Claim_Submitted_Late",
];

/// Semantic type of a claim field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Decimal,
    Integer,
    Categorical,
    Flag,
}

impl FieldKind {
    /// Target type named in coercion errors.
    pub fn type_name(self) -> &'static str {
        match self {
            FieldKind::Decimal => "float",
            FieldKind::Integer => "int",
            FieldKind::Categorical => "str",
            FieldKind::Flag => "bool",
        }
    }
}

/// The fixed set of fields a claim row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimField {
    ClaimAmount,
    PatientAge,
    PatientGender,
    ProviderType,
    DiagnosisCode,
    ProcedureCode,
    NumberOfProcedures,
    AdmissionType,
    DischargeType,
    LengthOfStayDays,
    ServiceType,
    DeductibleAmount,
    CoPayAmount,
    PreviousClaimsPatient,
    PreviousClaimsProvider,
    ProviderPatientDistanceMiles,
    ClaimSubmittedLate,
}

impl ClaimField {
    /// All fields in required column order.
    pub const ALL: [ClaimField; 17] = [
        ClaimField::ClaimAmount,
        ClaimField::PatientAge,
        ClaimField::PatientGender,
        ClaimField::ProviderType,
        ClaimField::DiagnosisCode,
        ClaimField::ProcedureCode,
        ClaimField::NumberOfProcedures,
        ClaimField::AdmissionType,
        ClaimField::DischargeType,
        ClaimField::LengthOfStayDays,
        ClaimField::ServiceType,
        ClaimField::DeductibleAmount,
        ClaimField::CoPayAmount,
        ClaimField::PreviousClaimsPatient,
        ClaimField::PreviousClaimsProvider,
        ClaimField::ProviderPatientDistanceMiles,
        ClaimField::ClaimSubmittedLate,
    ];

    pub fn column_name(self) -> &'static str {
        REQUIRED_COLUMNS[self as usize]
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        REQUIRED_COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|i| Self::ALL[i])
    }

    pub fn kind(self) -> FieldKind {
        use ClaimField::*;
        match self {
            ClaimAmount | DeductibleAmount | CoPayAmount | ProviderPatientDistanceMiles => {
                FieldKind::Decimal
            }
            PatientAge
            | NumberOfProcedures
            | LengthOfStayDays
            | PreviousClaimsPatient
            | PreviousClaimsProvider => FieldKind::Integer,
            PatientGender | ProviderType | DiagnosisCode | ProcedureCode | AdmissionType
            | DischargeType | ServiceType => FieldKind::Categorical,
            ClaimSubmittedLate => FieldKind::Flag,
        }
    }
}

/// A single typed value read from a claim.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Decimal(f64),
    Integer(i64),
    Categorical(&'a str),
    Flag(bool),
}

impl FieldValue<'_> {
    /// Numeric view used by scaling transformers. Flags count as 0/1.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Decimal(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Flag(v) => Some(if *v { 1.0 } else { 0.0 }),
            FieldValue::Categorical(s) => s.trim().parse().ok(),
        }
    }

    /// Category label used by one-hot encoders.
    pub fn as_category(&self) -> String {
        match self {
            FieldValue::Decimal(v) => format_decimal(*v),
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Categorical(s) => s.to_string(),
            FieldValue::Flag(true) => "True".to_string(),
            FieldValue::Flag(false) => "False".to_string(),
        }
    }
}

impl std::fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_category())
    }
}

/// Integral floats print without a fractional part so that `99213.0` read
/// from a spreadsheet matches the `99213` category of a CSV upload.
pub(crate) fn format_decimal(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// One claim row, projected onto the required columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(rename = "Claim_Amount")]
    pub claim_amount: f64,
    #[serde(rename = "Patient_Age")]
    pub patient_age: i64,
    #[serde(rename = "Patient_Gender")]
    pub patient_gender: String,
    #[serde(rename = "Provider_Type")]
    pub provider_type: String,
    #[serde(rename = "Diagnosis_Code")]
    pub diagnosis_code: String,
    #[serde(rename = "Procedure_Code")]
    pub procedure_code: String,
    #[serde(rename = "Number_of_Procedures")]
    pub number_of_procedures: i64,
    #[serde(rename = "Admission_Type")]
    pub admission_type: String,
    #[serde(rename = "Discharge_Type")]
    pub discharge_type: String,
    #[serde(rename = "Length_of_Stay_Days")]
    pub length_of_stay_days: i64,
    #[serde(rename = "Service_Type")]
    pub service_type: String,
    #[serde(rename = "Deductible_Amount")]
    pub deductible_amount: f64,
    #[serde(rename = "CoPay_Amount")]
    pub copay_amount: f64,
    #[serde(rename = "Number_of_Previous_Claims_Patient")]
    pub previous_claims_patient: i64,
    #[serde(rename = "Number_of_Previous_Claims_Provider")]
    pub previous_claims_provider: i64,
    #[serde(rename = "Provider_Patient_Distance_Miles")]
    pub provider_patient_distance_miles: f64,
    #[serde(rename = "Claim_Submitted_Late")]
    pub claim_submitted_late: bool,
}

impl ClaimRecord {
    pub fn value(&self, field: ClaimField) -> FieldValue<'_> {
        use ClaimField::*;
        match field {
            ClaimAmount => FieldValue::Decimal(self.claim_amount),
            PatientAge => FieldValue::Integer(self.patient_age),
            PatientGender => FieldValue::Categorical(&self.patient_gender),
            ProviderType => FieldValue::Categorical(&self.provider_type),
            DiagnosisCode => FieldValue::Categorical(&self.diagnosis_code),
            ProcedureCode => FieldValue::Categorical(&self.procedure_code),
            NumberOfProcedures => FieldValue::Integer(self.number_of_procedures),
            AdmissionType => FieldValue::Categorical(&self.admission_type),
            DischargeType => FieldValue::Categorical(&self.discharge_type),
            LengthOfStayDays => FieldValue::Integer(self.length_of_stay_days),
            ServiceType => FieldValue::Categorical(&self.service_type),
            DeductibleAmount => FieldValue::Decimal(self.deductible_amount),
            CoPayAmount => FieldValue::Decimal(self.copay_amount),
            PreviousClaimsPatient => FieldValue::Integer(self.previous_claims_patient),
            PreviousClaimsProvider => FieldValue::Integer(self.previous_claims_provider),
            ProviderPatientDistanceMiles => {
                FieldValue::Decimal(self.provider_patient_distance_miles)
            }
            ClaimSubmittedLate => FieldValue::Flag(self.claim_submitted_late),
        }
    }

    /// Builds a record from cells already arranged in required column order.
    /// `row` is the 0-based data row index, used in error messages.
    pub fn from_cells(cells: [&Cell; 17], row: usize) -> Result<Self, ProcessingError> {
        let reader = CellReader { cells, row };
        Ok(Self {
            claim_amount: reader.decimal(ClaimField::ClaimAmount)?,
            patient_age: reader.integer(ClaimField::PatientAge)?,
            patient_gender: reader.text(ClaimField::PatientGender)?,
            provider_type: reader.text(ClaimField::ProviderType)?,
            diagnosis_code: reader.text(ClaimField::DiagnosisCode)?,
            procedure_code: reader.text(ClaimField::ProcedureCode)?,
            number_of_procedures: reader.integer(ClaimField::NumberOfProcedures)?,
            admission_type: reader.text(ClaimField::AdmissionType)?,
            discharge_type: reader.text(ClaimField::DischargeType)?,
            length_of_stay_days: reader.integer(ClaimField::LengthOfStayDays)?,
            service_type: reader.text(ClaimField::ServiceType)?,
            deductible_amount: reader.decimal(ClaimField::DeductibleAmount)?,
            copay_amount: reader.decimal(ClaimField::CoPayAmount)?,
            previous_claims_patient: reader.integer(ClaimField::PreviousClaimsPatient)?,
            previous_claims_provider: reader.integer(ClaimField::PreviousClaimsProvider)?,
            provider_patient_distance_miles: reader
                .decimal(ClaimField::ProviderPatientDistanceMiles)?,
            claim_submitted_late: reader.flag(ClaimField::ClaimSubmittedLate)?,
        })
    }
}

struct CellReader<'a> {
    cells: [&'a Cell; 17],
    row: usize,
}

impl CellReader<'_> {
    fn cell(&self, field: ClaimField) -> &Cell {
        self.cells[field as usize]
    }

    fn error(&self, field: ClaimField) -> ProcessingError {
        ProcessingError::Coercion {
            column: field.column_name(),
            row: self.row,
            value: self.cell(field).to_string(),
            target: field.kind().type_name(),
        }
    }

    fn decimal(&self, field: ClaimField) -> Result<f64, ProcessingError> {
        self.cell(field)
            .as_f64()
            .ok_or_else(|| self.error(field))
    }

    fn integer(&self, field: ClaimField) -> Result<i64, ProcessingError> {
        self.cell(field)
            .as_i64()
            .ok_or_else(|| self.error(field))
    }

    fn text(&self, field: ClaimField) -> Result<String, ProcessingError> {
        self.cell(field)
            .as_text()
            .ok_or_else(|| self.error(field))
    }

    fn flag(&self, field: ClaimField) -> Result<bool, ProcessingError> {
        self.cell(field)
            .as_bool()
            .ok_or_else(|| self.error(field))
    }
}
