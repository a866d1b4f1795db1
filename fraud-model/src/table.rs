//! Decoding of uploaded claim files into an untyped table, and projection of
//! that table onto typed [`ClaimRecord`]s.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

use crate::{
    claim::{ClaimField, ClaimRecord, REQUIRED_COLUMNS, format_decimal},
    error::{PredictError, ProcessingError},
};

/// Upload formats accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Case-sensitive suffix match on the uploaded file name.
    pub fn from_filename(filename: &str) -> Result<Self, PredictError> {
        if filename.ends_with(".csv") {
            Ok(FileFormat::Csv)
        } else if filename.ends_with(".xlsx") || filename.ends_with(".xls") {
            Ok(FileFormat::Spreadsheet)
        } else {
            Err(PredictError::UnsupportedFormat)
        }
    }
}

/// A raw cell as read from the upload, before per-field coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    fn from_text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    /// Non-finite values (`nan`, `inf`) are rejected.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Int(v) => Some(*v as f64),
            Cell::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Empty => None,
        }
        .filter(|v| v.is_finite())
    }

    /// Fractional values truncate toward zero. Values outside the `i64`
    /// range are rejected rather than clamped.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) => truncate_to_i64(*v),
            Cell::Bool(v) => Some(i64::from(*v)),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate_to_i64))
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(v) => Some(*v),
            Cell::Int(0) => Some(false),
            Cell::Int(1) => Some(true),
            Cell::Float(v) if *v == 0.0 => Some(false),
            Cell::Float(v) if *v == 1.0 => Some(true),
            Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => f.write_str(&format_decimal(*v)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

fn truncate_to_i64(value: f64) -> Option<i64> {
    // 2^63 is exactly representable; every float below it fits.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let value = value.trunc();
    (value.is_finite() && value >= -LIMIT && value < LIMIT).then(|| value as i64)
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Bool(v) => Cell::Bool(*v),
            Data::Int(v) => Cell::Int(*v),
            Data::Float(v) => Cell::Float(*v),
            Data::String(s) => Cell::from_text(s),
            other => Cell::from_text(&other.to_string()),
        }
    }
}

/// Header row plus data rows, in file order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn parse(format: FileFormat, bytes: &[u8]) -> Result<Self, ProcessingError> {
        let table = match format {
            FileFormat::Csv => Self::from_csv(bytes)?,
            FileFormat::Spreadsheet => Self::from_spreadsheet(bytes)?,
        };
        if table.headers.is_empty() {
            return Err(ProcessingError::EmptyFile);
        }
        debug!(
            columns = table.headers.len(),
            rows = table.rows.len(),
            "Parsed upload"
        );
        Ok(table)
    }

    /// Comma-delimited, first record is the header. Ragged rows are an error.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, ProcessingError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .from_reader(bytes);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::from_text).collect());
        }

        Ok(Self { headers, rows })
    }

    /// First worksheet, first row is the header. Works for both `.xls` and
    /// `.xlsx` payloads; the container type is sniffed from the bytes.
    pub fn from_spreadsheet(bytes: &[u8]) -> Result<Self, ProcessingError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ProcessingError::NoWorksheet)??;

        let mut sheet_rows = range.rows();
        let headers = match sheet_rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| Cell::from(cell).to_string())
                .collect(),
            None => Vec::new(),
        };
        let rows = sheet_rows
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Required columns absent from the header, in required order.
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|required| !self.headers.iter().any(|h| h.as_str() == **required))
            .map(|c| c.to_string())
            .collect()
    }

    /// Position of each required column in the header. The first occurrence
    /// wins when a header name repeats.
    fn required_positions(&self) -> Result<[usize; 17], PredictError> {
        let mut positions = [0usize; 17];
        let mut missing = Vec::new();
        for field in ClaimField::ALL {
            let name = field.column_name();
            match self.headers.iter().position(|h| h == name) {
                Some(pos) => positions[field as usize] = pos,
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(positions)
        } else {
            Err(PredictError::MissingColumns(missing))
        }
    }

    /// Selects the required columns in required order and coerces every row
    /// into a [`ClaimRecord`]. Unrecognised columns are dropped here.
    pub fn project(&self) -> Result<Vec<ClaimRecord>, PredictError> {
        let positions = self.required_positions()?;
        let mut records = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let cells = positions.map(|pos| row.get(pos).unwrap_or(&EMPTY_CELL));
            records.push(ClaimRecord::from_cells(cells, index)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Claim_Amount,Patient_Age,Patient_Gender,Provider_Type,Diagnosis_Code,\
Procedure_Code,Number_of_Procedures,Admission_Type,Discharge_Type,Length_of_Stay_Days,\
Service_Type,Deductible_Amount,CoPay_Amount,Number_of_Previous_Claims_Patient,\
Number_of_Previous_Claims_Provider,Provider_Patient_Distance_Miles,Claim_Submitted_Late";

    #[test]
    fn format_from_filename() {
        assert_eq!(FileFormat::from_filename("claims.csv").unwrap(), FileFormat::Csv);
        assert_eq!(
            FileFormat::from_filename("claims.xlsx").unwrap(),
            FileFormat::Spreadsheet
        );
        assert_eq!(
            FileFormat::from_filename("claims.xls").unwrap(),
            FileFormat::Spreadsheet
        );
        assert!(matches!(
            FileFormat::from_filename("data.txt"),
            Err(PredictError::UnsupportedFormat)
        ));
        assert!(matches!(
            FileFormat::from_filename("CLAIMS.CSV"),
            Err(PredictError::UnsupportedFormat)
        ));
    }

    #[test]
    fn cell_coercions() {
        assert_eq!(Cell::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(Cell::Float(41.9).as_i64(), Some(41));
        assert_eq!(Cell::Text("7.0".into()).as_i64(), Some(7));
        assert_eq!(Cell::Text("TRUE".into()).as_bool(), Some(true));
        assert_eq!(Cell::Int(0).as_bool(), Some(false));
        assert_eq!(Cell::Text("maybe".into()).as_bool(), None);
        assert_eq!(Cell::Float(71045.0).as_text(), Some("71045".to_string()));
        assert_eq!(Cell::Empty.as_f64(), None);
        assert_eq!(Cell::Text("nan".into()).as_f64(), None);
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        assert_eq!(Cell::Float(1e30).as_i64(), None);
        assert_eq!(Cell::Float(-1e30).as_i64(), None);
        assert_eq!(Cell::Text("1e30".into()).as_i64(), None);
        assert_eq!(Cell::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(Cell::Float(-9.2e18).as_i64(), Some(-9_200_000_000_000_000_000));

        let csv = format!(
            "{}\n100,1e30,Male,Hospital,A09,71045,1,Emergency,Home,4,Inpatient,100,20,0,3,2.5,False\n",
            HEADER
        );
        let table = Table::parse(FileFormat::Csv, csv.as_bytes()).unwrap();
        match table.project() {
            Err(PredictError::Processing(ProcessingError::Coercion { column, .. })) => {
                assert_eq!(column, "Patient_Age")
            }
            other => panic!("expected coercion error, got {:?}", other),
        }
    }

    #[test]
    fn projects_required_columns_and_drops_extras() {
        let csv = format!(
            "Claim_ID,{},Notes\n\
             C-1,900.5,30,Male,Hospital,A09,71045,1,Emergency,Home,4,Inpatient,100,20,0,3,2.5,True,late\n\
             C-2,120,65,Female,Pharmacy,I10,99214,2,Elective,Home,1,Outpatient,0,10,5,40,11,False,\n",
            HEADER
        );
        let table = Table::parse(FileFormat::Csv, csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.missing_columns().is_empty());

        let records = table.project().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].claim_amount, 900.5);
        assert_eq!(records[0].provider_type, "Hospital");
        assert!(records[0].claim_submitted_late);
        assert_eq!(records[1].patient_age, 65);
        assert_eq!(records[1].provider_patient_distance_miles, 11.0);
    }

    #[test]
    fn reports_missing_columns_in_required_order() {
        let header = HEADER
            .split(',')
            .filter(|c| *c != "Service_Type" && *c != "Patient_Age")
            .collect::<Vec<_>>()
            .join(",");
        let table = Table::parse(FileFormat::Csv, format!("{}\n", header).as_bytes()).unwrap();

        assert_eq!(table.missing_columns(), vec!["Patient_Age", "Service_Type"]);
        match table.project() {
            Err(PredictError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["Patient_Age", "Service_Type"])
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn header_only_file_has_no_records() {
        let table = Table::parse(FileFormat::Csv, format!("{}\n", HEADER).as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(table.project().unwrap().is_empty());
    }

    #[test]
    fn empty_file_is_a_processing_error() {
        assert!(matches!(
            Table::parse(FileFormat::Csv, b""),
            Err(ProcessingError::EmptyFile)
        ));
    }

    #[test]
    fn ragged_csv_row_is_a_processing_error() {
        let csv = "a,b\n1,2,3\n";
        assert!(matches!(
            Table::parse(FileFormat::Csv, csv.as_bytes()),
            Err(ProcessingError::Csv(_))
        ));
    }

    #[test]
    fn parses_first_worksheet_of_a_workbook() {
        use crate::batch::predict_file;
        use crate::testing::fixed_model;
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in REQUIRED_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        sheet.write_string(0, 17, "Notes").unwrap();

        let rows: [(f64, f64, &str, f64, bool); 2] = [
            (9000.0, 47.0, "Hospital", 99214.0, true),
            (150.0, 31.0, "Pharmacy", 71045.0, false),
        ];
        for (i, (amount, age, provider, procedure, late)) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write_number(r, 0, *amount).unwrap();
            sheet.write_number(r, 1, *age).unwrap();
            sheet.write_string(r, 2, "Female").unwrap();
            sheet.write_string(r, 3, *provider).unwrap();
            sheet.write_string(r, 4, "I10").unwrap();
            sheet.write_number(r, 5, *procedure).unwrap();
            sheet.write_number(r, 6, 2).unwrap();
            sheet.write_string(r, 7, "Elective").unwrap();
            sheet.write_string(r, 8, "Home").unwrap();
            sheet.write_number(r, 9, 3).unwrap();
            sheet.write_string(r, 10, "Inpatient").unwrap();
            sheet.write_number(r, 11, 250.5).unwrap();
            sheet.write_number(r, 12, 40).unwrap();
            sheet.write_number(r, 13, 1).unwrap();
            sheet.write_number(r, 14, 12).unwrap();
            sheet.write_number(r, 15, 8.25).unwrap();
            sheet.write_boolean(r, 16, *late).unwrap();
            sheet.write_string(r, 17, "ignored").unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let table = Table::parse(FileFormat::Spreadsheet, &bytes).unwrap();
        assert_eq!(table.headers().len(), 18);
        assert_eq!(table.headers()[0], "Claim_Amount");
        assert!(table.missing_columns().is_empty());

        let records = table.project().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].claim_amount, 9000.0);
        assert_eq!(records[0].patient_age, 47);
        assert_eq!(records[0].provider_type, "Hospital");
        assert_eq!(records[0].procedure_code, "99214");
        assert_eq!(records[0].number_of_procedures, 2);
        assert_eq!(records[0].deductible_amount, 250.5);
        assert!(records[0].claim_submitted_late);
        assert_eq!(records[1].procedure_code, "71045");
        assert!(!records[1].claim_submitted_late);

        let batch = predict_file(&fixed_model(), FileFormat::Spreadsheet, &bytes).unwrap();
        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.results[0].prediction, 1);
        assert!(batch.results[0].is_fraud);
        assert_eq!(batch.results[0].patient_age, 47);
        assert_eq!(batch.results[0].provider_type, "Hospital");
        assert_eq!(batch.results[1].prediction, 0);
    }

    #[test]
    fn garbage_spreadsheet_is_a_processing_error() {
        let result = Table::parse(FileFormat::Spreadsheet, b"definitely not a workbook");
        assert!(result.is_err());
    }
}
