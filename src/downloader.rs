use tracing::info;

use crate::codec::{CellValue, Sheet, SpreadsheetCodec};
use crate::error::ImportError;
use crate::remote::Record;

/// File name of the generated workbook.
pub const EXPORT_FILE_NAME: &str = "ExportedData.xlsx";

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A column of an exported sheet: friendly label and the record field it
/// reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub label: &'static str,
    pub field_name: &'static str,
}

const fn column(label: &'static str, field_name: &'static str) -> ColumnDef {
    ColumnDef { label, field_name }
}

pub const EMPLOYEE_COLUMNS: &[ColumnDef] = &[
    column("Id", "Id"),
    column("Name", "Name"),
    column("Email", "Email__c"),
    column("Role", "Role__c"),
];

pub const ACCOUNT_COLUMNS: &[ColumnDef] = &[
    column("Id", "Id"),
    column("Name", "Name"),
    column("Industry", "Industry"),
    column("Phone", "Phone"),
];

/// A generated file ready to be downloaded.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Build a sheet with a header row of labels and one row per record.
///
/// Fields missing from a record become empty cells.
pub fn records_to_sheet(name: &str, columns: &[ColumnDef], records: &[Record]) -> Sheet {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(columns.iter().map(|c| CellValue::from(c.label)).collect());

    for record in records {
        rows.push(
            columns
                .iter()
                .map(|c| record.get(c.field_name).map(CellValue::from).unwrap_or_default())
                .collect(),
        );
    }

    Sheet::new(name, rows)
}

/// Export employees and accounts to `ExportedData.xlsx`.
///
/// Only non-empty lists get a sheet, employees first. When both lists are
/// empty no file is generated and [`ImportError::NoDataToExport`] is
/// returned.
///
/// # Arguments
/// * `codec` - Codec that writes the xlsx bytes
/// * `employees` - Records for the `Employees` sheet
/// * `accounts` - Records for the `Accounts` sheet
///
/// # Returns
/// * `Result<ExportFile, ImportError>` - The workbook bytes named `ExportedData.xlsx`
pub fn export_workbook<C: SpreadsheetCodec + ?Sized>(
    codec: &C,
    employees: &[Record],
    accounts: &[Record],
) -> Result<ExportFile, ImportError> {
    if employees.is_empty() && accounts.is_empty() {
        return Err(ImportError::NoDataToExport);
    }

    let mut sheets = Vec::new();
    if !employees.is_empty() {
        sheets.push(records_to_sheet("Employees", EMPLOYEE_COLUMNS, employees));
    }
    if !accounts.is_empty() {
        sheets.push(records_to_sheet("Accounts", ACCOUNT_COLUMNS, accounts));
    }

    let bytes = codec.write_workbook(&sheets)?;
    info!(
        employees = employees.len(),
        accounts = accounts.len(),
        bytes = bytes.len(),
        "exported workbook"
    );

    Ok(ExportFile {
        file_name: EXPORT_FILE_NAME.to_string(),
        bytes,
    })
}
