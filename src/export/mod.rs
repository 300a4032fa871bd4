//! Spreadsheet export of query results

use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{Format, Workbook};

use crate::data::{ParcelRecord, Value};

/// Name of the single result sheet
pub const SHEET_NAME: &str = "Результаты";

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// `кадастр_<username>_<YYYYMMDD_HHMM>.xlsx`
pub fn export_filename<Tz: TimeZone>(username: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("кадастр_{}_{}.xlsx", username, at.format("%Y%m%d_%H%M"))
}

/// Write the header and one row per record into a single-sheet workbook
pub fn to_spreadsheet(columns: &[String], records: &[&ParcelRecord]) -> Result<Vec<u8>, ExportError> {
    if columns.len() > u16::MAX as usize {
        return Err(ExportError::TooManyColumns(columns.len()));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        for (col, cell) in record.cells.iter().enumerate().take(columns.len()) {
            let col = col as u16;
            match cell {
                Value::Null => {}
                Value::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Value::Int64(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                Value::Float64(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                Value::String(s) => {
                    worksheet.write_string(row, col, s)?;
                }
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = records.len(), bytes = bytes.len(), "Built spreadsheet export");
    Ok(bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Too many columns for a worksheet: {0}")]
    TooManyColumns(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_dataset, ColumnMapping};
    use crate::data::loader::tests::sample_csv;
    use chrono::Utc;

    #[test]
    fn test_export_filename() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(export_filename("alice", &at), "кадастр_alice_20240307_0905.xlsx");
    }

    #[test]
    fn test_spreadsheet_is_zip_container() {
        let outcome = parse_dataset(sample_csv().as_bytes(), &ColumnMapping::builtin()).unwrap();
        let records: Vec<&ParcelRecord> = outcome.dataset.records().iter().collect();

        let bytes = to_spreadsheet(outcome.dataset.columns(), &records).unwrap();
        // XLSX files are ZIP archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_export_still_has_header_sheet() {
        let columns = vec!["Номер".to_string()];
        let bytes = to_spreadsheet(&columns, &[]).unwrap();
        assert!(!bytes.is_empty());
    }
}
