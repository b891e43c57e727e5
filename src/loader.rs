#![cfg(not(tarpaulin_include))]

use calamine::{Data, Range, Reader, Xlsx, open_workbook_from_rs};
use chrono::Timelike;
use log::{debug, info, warn};
use std::io::Cursor;

use crate::cell::CellValue;
use crate::config::Config;
use crate::dataset::{Dataset, Workbook};
use crate::error::{ExplorerError, Result};

/// Which codec a source should be parsed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Csv,
}

impl SourceFormat {
    /// Guess the format from a URL or path; anything that is not `.csv` is
    /// treated as an Excel workbook.
    pub fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.to_ascii_lowercase().ends_with(".csv") {
            SourceFormat::Csv
        } else {
            SourceFormat::Xlsx
        }
    }
}

/// Load a workbook from raw bytes and prepare it for filtering
///
/// Parses the bytes with the codec matching `location`, picks the primary and
/// auxiliary sheets named in the configuration, then applies every configured
/// recoding to the primary sheet. The result is ready to be shared read-only.
///
/// # Arguments
/// * `bytes` - Downloaded or read file content
/// * `location` - Where the bytes came from, used to pick the codec
/// * `config` - Sheet names, recodings and unknown-column policy
///
/// # Returns
/// * `Result<Workbook>` - The prepared workbook or a parse error
///
/// # Examples
/// ```no_run
/// use survey_explorer::config::Config;
/// use survey_explorer::loader::load_workbook;
///
/// let bytes = std::fs::read("SurveyData.xlsx").unwrap();
/// let workbook = load_workbook(&bytes, "SurveyData.xlsx", &Config::default()).unwrap();
/// println!("{} records", workbook.primary.len());
/// ```
pub fn load_workbook(bytes: &[u8], location: &str, config: &Config) -> Result<Workbook> {
    let mut workbook = match SourceFormat::from_location(location) {
        SourceFormat::Xlsx => {
            let auxiliary: Vec<&str> = config.auxiliary_sheets.values().map(String::as_str).collect();
            from_excel(bytes, config.primary_sheet.as_deref(), &auxiliary)?
        }
        SourceFormat::Csv => Workbook::new(from_csv(bytes)?),
    };

    for recoding in &config.recoding {
        recoding.apply(&mut workbook.primary, config.unknown_columns)?;
    }

    info!(
        "loaded {} records x {} columns from {} ({} auxiliary sheets)",
        workbook.primary.len(),
        workbook.primary.columns.len(),
        location,
        workbook.auxiliary.len()
    );

    Ok(workbook)
}

/// Parse an Excel workbook
///
/// The primary sheet is `primary` when given, otherwise the first sheet.
/// Auxiliary sheets that are missing from the file are logged and skipped,
/// a missing primary sheet is an error.
///
/// # Arguments
/// * `bytes` - xlsx file content
/// * `primary` - Optional name of the survey sheet
/// * `auxiliary` - Names of detail sheets to keep alongside it
///
/// # Returns
/// * `Result<Workbook>` - Primary plus auxiliary datasets
pub fn from_excel(bytes: &[u8], primary: Option<&str>, auxiliary: &[&str]) -> Result<Workbook> {
    let mut excel: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let sheet_names = excel.sheet_names();

    let primary_name = match primary {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => return Err(ExplorerError::MissingSheet(name.to_string())),
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ExplorerError::MissingSheet("<first sheet>".to_string()))?,
    };

    let range = excel.worksheet_range(&primary_name)?;
    let mut workbook = Workbook::new(range_to_dataset(&primary_name, &range)?);

    for &name in auxiliary {
        if !sheet_names.iter().any(|s| s == name) {
            warn!("auxiliary sheet '{}' not found, skipping", name);
            continue;
        }
        let range = excel.worksheet_range(name)?;
        let dataset = range_to_dataset(name, &range)?;
        debug!("auxiliary sheet '{}': {} records", name, dataset.len());
        workbook.auxiliary.insert(name.to_string(), dataset);
    }

    Ok(workbook)
}

fn range_to_dataset(sheet: &str, range: &Range<Data>) -> Result<Dataset> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| ExplorerError::EmptySheet(sheet.to_string()))?;

    let columns = header.iter().map(|cell| data_to_cell(cell).to_string()).collect();
    let records = rows
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();

    Ok(Dataset::new(columns, records))
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                CellValue::Text(dt.format("%Y-%m-%d").to_string())
            }
            Some(dt) => CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Parse a CSV table into a dataset
///
/// The first record is the header. Empty fields become `Empty`, numeric
/// fields become numbers and everything else stays text.
pub fn from_csv(bytes: &[u8]) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(ExplorerError::EmptySheet("csv".to_string()));
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(guess_cell).collect());
    }

    Ok(Dataset::new(columns, records))
}

fn guess_cell(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = field.parse::<f64>() {
        if n.is_finite() {
            return CellValue::Number(n);
        }
    }
    match field {
        "true" | "TRUE" => CellValue::Bool(true),
        "false" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::Text(field.to_string()),
    }
}
