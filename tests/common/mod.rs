#![allow(dead_code)]

use rust_xlsxwriter::Workbook as XlsxWorkbook;
use std::collections::BTreeMap;
use survey_explorer::{CellValue, ColumnRoles, Config, Dataset};

pub const COLUMNS: [&str; 10] = [
    "farmer_id",
    "Priority",
    "farmers_name_marathi",
    "village_marathi",
    "taluka_marathi",
    "informant_name",
    "informant_mobile",
    "Health",
    "AgriEqui",
    "Education",
];

fn row(id: i64, priority: i64, village: &str, taluka: &str, health: &str, agri: &str) -> Vec<CellValue> {
    vec![
        id.into(),
        priority.into(),
        format!("farmer {id}").into(),
        village.into(),
        taluka.into(),
        format!("informant {id}").into(),
        (9_800_000_000 + id).into(),
        if health.is_empty() { CellValue::Empty } else { health.into() },
        agri.into(),
        format!("grade {id}").into(),
    ]
}

/// Five survey records; Health is filled only for farmer 3.
pub fn sample_dataset() -> Dataset {
    Dataset::new(
        COLUMNS.iter().map(|c| c.to_string()).collect(),
        vec![
            row(1, 1, "Kothali", "Jalgaon", "", "Tractor"),
            row(2, 2, "Nashirabad", "Jalgaon", "", ""),
            row(3, 1, "Pimpri", "Bhusawal", "Hospital bill", ""),
            row(4, 3, "Kothali", "Jalgaon", "", "Pump"),
            row(5, 2, "Varangaon", "Bhusawal", "", ""),
        ],
    )
}

pub fn roles() -> ColumnRoles {
    let config = Config::default();
    config.roles()
}

pub fn sentinels() -> BTreeMap<String, String> {
    Config::default().auxiliary_sheets
}

pub fn values(items: &[CellValue]) -> std::collections::BTreeSet<CellValue> {
    items.iter().cloned().collect()
}

fn write_sheet(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    header: &[&str],
    rows: &[Vec<CellValue>],
) {
    for (c, name) in header.iter().enumerate() {
        worksheet.write_string(0, c as u16, *name).unwrap();
    }
    for (r, record) in rows.iter().enumerate() {
        for (c, value) in record.iter().enumerate() {
            let (r, c) = ((r + 1) as u32, c as u16);
            match value {
                CellValue::Text(s) if !s.is_empty() => {
                    worksheet.write_string(r, c, s.as_str()).unwrap();
                }
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n).unwrap();
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b).unwrap();
                }
                CellValue::Text(_) | CellValue::Empty => {}
            }
        }
    }
}

/// The sample dataset as an xlsx workbook with the two auxiliary sheets.
pub fn sample_workbook_bytes() -> Vec<u8> {
    let ds = sample_dataset();
    let mut workbook = XlsxWorkbook::new();

    let primary = workbook.add_worksheet();
    primary.set_name("Survey").unwrap();
    write_sheet(primary, &COLUMNS, &ds.records);

    let jobs = workbook.add_worksheet();
    jobs.set_name("JobSupport").unwrap();
    write_sheet(
        jobs,
        &["farmer_id", "job"],
        &[vec![2i64.into(), "Anganwadi helper".into()]],
    );

    let health = workbook.add_worksheet();
    health.set_name("Health support").unwrap();
    write_sheet(
        health,
        &["farmer_id", "scheme"],
        &[vec![3i64.into(), "MJPJAY".into()]],
    );

    workbook.save_to_buffer().unwrap()
}
