#![cfg(not(tarpaulin_include))]

use rust_xlsxwriter::Workbook;

use crate::cell::CellValue;
use crate::error::Result;
use crate::pipeline::View;

pub const EXPORT_SHEET: &str = "FilteredData";
pub const XLSX_FILENAME: &str = "filtered_survey_data.xlsx";
pub const CSV_FILENAME: &str = "filtered_survey_data.csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Convert a view to XLSX format
///
/// Writes a single `FilteredData` sheet: the header row holds the view's
/// column names, followed by one row per record in view order. Empty cells
/// are left blank.
///
/// # Arguments
/// * `view` - The filtered, projected view to export
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use survey_explorer::downloader::to_xlsx;
/// use survey_explorer::pipeline::View;
///
/// let view = View { columns: vec!["farmer_id".into()], rows: vec![vec![3i64.into()]] };
/// let bytes = to_xlsx(&view).unwrap();
/// assert!(!bytes.is_empty());
/// ```
pub fn to_xlsx(view: &View) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET)?;

    for (c, name) in view.columns.iter().enumerate() {
        worksheet.write_string(0, c as u16, name)?;
    }

    for (r, row) in view.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            match value {
                CellValue::Text(s) if !s.is_empty() => {
                    worksheet.write_string(r, c, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                CellValue::Text(_) | CellValue::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Convert a view to CSV text with a header row.
pub fn to_csv(view: &View) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&view.columns)?;
    for row in &view.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
