mod common;

use std::io::Write;

use common::{FakeBackend, account};
use rust_xlsxwriter::Workbook;
use sheetbridge::detect::{ReadMode, read_content};
use sheetbridge::{
    CellValue, ExportWidget, FileFormat, ImportConfig, ImportError, ImportWidget, RawFile,
    StandardCodec, SpreadsheetCodec, build_preview, detect, parse, to_submission_payload,
};

fn run_pipeline(file: &RawFile, row_cap: usize) -> Result<(Vec<String>, usize, String), ImportError> {
    let mode = detect(&file.name)
        .read_mode()
        .ok_or_else(|| ImportError::UnsupportedFormat(file.name.clone()))?;
    let content = read_content(file, mode);
    let table = parse(&StandardCodec, &file.name, &content)?;

    let preview = build_preview(&table, row_cap);
    let payload = to_submission_payload(&StandardCodec, &table, row_cap)?;
    Ok((preview.headers, preview.rows.len(), payload))
}

/// xlsx bytes with a header row of `cols` columns and `rows` data rows.
fn xlsx_bytes(cols: u16, rows: u32) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for c in 0..cols {
        sheet.write_string(0, c, &format!("Col{}", c + 1)).unwrap();
    }
    for r in 1..=rows {
        for c in 0..cols {
            sheet.write_number(r, c, (r * 10 + c as u32) as f64).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

#[test]
fn csv_scenario_round_trips() {
    let input = "Name,Email\nAda,a@x.com\nBob,b@x.com";
    let (headers, rows, payload) = run_pipeline(&RawFile::new("people.csv", input), 50).unwrap();

    assert_eq!(headers, vec!["Index", "Name", "Email"]);
    assert_eq!(rows, 2);
    assert_eq!(payload, input);
}

#[test]
fn empty_file_reports_no_data() {
    let mut widget = ImportWidget::new(StandardCodec, ImportConfig::default());
    assert!(widget.select_file(Some(RawFile::new("empty.csv", Vec::new()))).is_ok());
    assert!(widget.message().contains("no data"));

    let mut widget = ImportWidget::new(StandardCodec, ImportConfig::default());
    let err = widget
        .select_file(Some(RawFile::new("empty.xlsx", Vec::new())))
        .unwrap_err();
    assert!(matches!(err, ImportError::Parse { .. }));
}

#[test]
fn xlsx_on_disk_is_previewed() {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(&xlsx_bytes(3, 5)).unwrap();
    let bytes = std::fs::read(file.path()).unwrap();

    let mut widget = ImportWidget::new(StandardCodec, ImportConfig::default());
    widget.select_file(Some(RawFile::new("data.xlsx", bytes))).unwrap();

    let preview = widget.preview();
    assert_eq!(preview.headers, vec!["Index", "Col1", "Col2", "Col3"]);
    assert_eq!(preview.rows.len(), 5);
    assert!(preview.rows.iter().all(|r| r.cells.len() == 4));
    assert_eq!(preview.rows[0].cells[1].value, CellValue::Float(10.0));
    assert_eq!(widget.payload().unwrap().lines().next(), Some("Col1,Col2,Col3"));
}

#[test]
fn preview_and_payload_share_the_row_cap() {
    let mut input = String::from("id,name");
    for i in 0..1000 {
        input.push_str(&format!("\n{},row {}", i, i));
    }
    let (_, rows, payload) = run_pipeline(&RawFile::new("big.csv", input), 50).unwrap();

    assert_eq!(rows, 50);
    assert_eq!(payload.lines().count(), 51);
    assert_eq!(payload.lines().next(), Some("id,name"));
}

#[test]
fn large_workbook_is_capped_too() {
    let (_, rows, payload) = run_pipeline(&RawFile::new("big.XLSX", xlsx_bytes(2, 120)), 50).unwrap();
    assert_eq!(rows, 50);
    assert_eq!(payload.lines().count(), 51);
}

#[test]
fn only_the_first_sheet_is_imported() {
    let mut workbook = Workbook::new();
    workbook.add_worksheet().set_name("First").unwrap().write_string(0, 0, "Kept").unwrap();
    workbook.add_worksheet().set_name("Second").unwrap().write_string(0, 0, "Ignored").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let (headers, _, payload) = run_pipeline(&RawFile::new("two.xlsx", bytes), 50).unwrap();
    assert_eq!(headers, vec!["Index", "Kept"]);
    assert_eq!(payload, "Kept");
}

#[test]
fn detection_drives_read_mode() {
    assert_eq!(detect("a.CSV").read_mode(), Some(ReadMode::Text));
    assert_eq!(detect("a.xls").read_mode(), Some(ReadMode::Binary));
    assert_eq!(detect("a.json"), FileFormat::Unsupported);
}

#[tokio::test]
async fn export_with_only_accounts_has_one_sheet() {
    let backend = FakeBackend {
        accounts: vec![account("Acme"), account("Globex")],
        ..FakeBackend::default()
    };
    let widget = ExportWidget::load(&backend, &ImportConfig::default()).await;
    let file = widget.export(&StandardCodec).unwrap();

    assert_eq!(file.file_name, "ExportedData.xlsx");
    let workbook = StandardCodec
        .parse_workbook(&sheetbridge::FileContent::Binary(file.bytes))
        .unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Accounts"]);

    let header: Vec<String> = workbook.sheets[0].rows[0].iter().map(ToString::to_string).collect();
    assert_eq!(header, vec!["Id", "Name", "Industry", "Phone"]);
    assert_eq!(workbook.sheets[0].rows.len(), 3);
}

#[tokio::test]
async fn failed_fetch_leaves_only_that_list_empty() {
    let backend = FakeBackend {
        employees: vec![common::employee("Ada")],
        accounts: vec![account("Acme")],
        fail_accounts: true,
        ..FakeBackend::default()
    };
    let widget = ExportWidget::load(&backend, &ImportConfig::default()).await;

    assert_eq!(widget.employees().len(), 1);
    assert!(widget.accounts().is_empty());
}

#[tokio::test]
async fn submitted_payload_matches_preview() {
    let backend = FakeBackend::default();
    let mut widget = ImportWidget::new(
        StandardCodec,
        ImportConfig {
            row_cap: 3,
            ..ImportConfig::default()
        },
    );
    widget
        .select_file(Some(RawFile::new("p.csv", "n\n1\n2\n3\n4\n5")))
        .unwrap();

    let inserted = widget.upload(&backend).await.unwrap();
    assert_eq!(inserted, widget.preview().rows.len() as u64);
    assert_eq!(backend.submitted(), vec![("n\n1\n2\n3".to_string(), "Customer__c".to_string())]);
}
