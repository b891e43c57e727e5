mod common;

use common::{COLUMNS, roles, sample_dataset, sample_workbook_bytes, sentinels};
use survey_explorer::downloader::{EXPORT_SHEET, to_csv, to_xlsx};
use survey_explorer::loader::{SourceFormat, from_csv, from_excel, load_workbook};
use survey_explorer::pipeline::evaluate;
use survey_explorer::{
    CellValue, Config, Dataset, ExplorerError, FilterParams, UnknownColumnPolicy,
};

#[test]
fn excel_primary_and_auxiliary_sheets_are_loaded() {
    let bytes = sample_workbook_bytes();
    let workbook = from_excel(&bytes, None, &["JobSupport", "Health support", "Missing"]).unwrap();

    assert_eq!(workbook.primary.columns, COLUMNS);
    assert_eq!(workbook.primary.len(), 5);
    assert_eq!(workbook.auxiliary.len(), 2);
    assert_eq!(
        workbook.auxiliary_sheet("Health support").unwrap().value(0, "scheme"),
        Some(&CellValue::text("MJPJAY"))
    );

    assert_eq!(workbook.primary.records, sample_dataset().records);
}

#[test]
fn named_primary_sheet_must_exist() {
    let bytes = sample_workbook_bytes();
    assert!(from_excel(&bytes, Some("Survey"), &[]).is_ok());
    assert!(matches!(
        from_excel(&bytes, Some("Responses"), &[]),
        Err(ExplorerError::MissingSheet(name)) if name == "Responses"
    ));
}

#[test]
fn garbage_bytes_are_a_workbook_error() {
    assert!(matches!(
        from_excel(b"not a zip file", None, &[]),
        Err(ExplorerError::Workbook(_))
    ));
}

#[test]
fn load_applies_priority_recoding() {
    let bytes = sample_workbook_bytes();
    let workbook = load_workbook(&bytes, "SurveyData.xlsx", &Config::default()).unwrap();

    assert_eq!(workbook.primary.value(0, "Priority"), Some(&CellValue::text("High")));
    assert_eq!(workbook.primary.value(1, "Priority"), Some(&CellValue::text("Medium")));
    assert_eq!(workbook.primary.value(3, "Priority"), Some(&CellValue::text("Low")));
    assert!(workbook.auxiliary.contains_key("JobSupport"));
}

#[test]
fn format_is_picked_from_location() {
    assert_eq!(SourceFormat::from_location("data/survey.CSV"), SourceFormat::Csv);
    assert_eq!(
        SourceFormat::from_location("https://example.org/export.csv?raw=1"),
        SourceFormat::Csv
    );
    assert_eq!(
        SourceFormat::from_location("https://github.com/o/r/raw/main/SurveyData.xlsx"),
        SourceFormat::Xlsx
    );
}

#[test]
fn csv_source_types_cells() {
    let csv = "farmer_id,Priority,Health\n1,2,\n3,1,Hospital bill\n4\n";
    let ds = from_csv(csv.as_bytes()).unwrap();

    assert_eq!(ds.columns, vec!["farmer_id", "Priority", "Health"]);
    assert_eq!(ds.len(), 3);
    assert_eq!(ds.value(0, "farmer_id"), Some(&CellValue::Number(1.0)));
    assert_eq!(ds.value(0, "Health"), Some(&CellValue::Empty));
    assert_eq!(ds.value(1, "Health"), Some(&CellValue::text("Hospital bill")));
    // short rows are padded
    assert_eq!(ds.value(2, "Priority"), Some(&CellValue::Empty));
}

#[test]
fn exported_view_reads_back_identically() {
    let ds = sample_dataset();
    let params = FilterParams {
        geographic_values: ["Jalgaon".into()].into_iter().collect(),
        selected_columns: vec!["Education".into()],
        ..Default::default()
    };
    let view = evaluate(&ds, &roles(), &params, &sentinels(), UnknownColumnPolicy::Reject).unwrap();
    assert_eq!(view.len(), 3);

    let bytes = to_xlsx(&view).unwrap();
    let reread = from_excel(&bytes, Some(EXPORT_SHEET), &[]).unwrap();

    assert_eq!(reread.primary.columns, view.columns);
    assert_eq!(reread.primary.records, view.rows);
}

#[test]
fn blank_text_cells_survive_an_export_round_trip() {
    let ds = Dataset::new(
        vec!["farmer_id".into(), "AgriEqui".into(), "Education".into()],
        vec![
            vec![CellValue::Number(1.0), "".into(), "grade 1".into()],
            vec![CellValue::Number(2.0), "Pump".into(), CellValue::text("")],
        ],
    );
    assert_eq!(ds.value(0, "AgriEqui"), Some(&CellValue::Empty));

    let mut roles = roles();
    roles.mandatory = vec!["farmer_id".into()];
    let params = FilterParams {
        selected_columns: vec!["AgriEqui".into(), "Education".into()],
        ..Default::default()
    };
    let view = evaluate(&ds, &roles, &params, &sentinels(), UnknownColumnPolicy::Reject).unwrap();

    let reread = from_excel(&to_xlsx(&view).unwrap(), Some(EXPORT_SHEET), &[]).unwrap();
    assert_eq!(reread.primary.columns, view.columns);
    assert_eq!(reread.primary.records, view.rows);
}

#[test]
fn empty_view_exports_header_only() {
    let ds = sample_dataset();
    let params = FilterParams {
        geographic_values: ["Raver".into()].into_iter().collect(),
        ..Default::default()
    };
    let view = evaluate(&ds, &roles(), &params, &sentinels(), UnknownColumnPolicy::Reject).unwrap();

    let reread = from_excel(&to_xlsx(&view).unwrap(), None, &[]).unwrap();
    assert_eq!(reread.primary.columns, view.columns);
    assert!(reread.primary.is_empty());

    let csv = to_csv(&view).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn csv_export_quotes_and_keeps_order() {
    let view = survey_explorer::View {
        columns: vec!["farmer_id".into(), "informant_name".into()],
        rows: vec![
            vec![CellValue::Number(3.0), "Patil, Sunita".into()],
            vec![CellValue::Number(1.0), CellValue::Empty],
        ],
    };

    let csv = to_csv(&view).unwrap();
    assert_eq!(csv, "farmer_id,informant_name\n3,\"Patil, Sunita\"\n1,\n");

    let reread = from_csv(csv.as_bytes()).unwrap();
    assert_eq!(reread.columns, view.columns);
    assert_eq!(reread.records, view.rows);
}
