#![cfg(not(tarpaulin_include))]

use std::path::PathBuf;

use clap::Parser;
use sheetbridge::{ImportConfig, ImportWidget, RawFile, StandardCodec};

/// Preview a CSV or Excel file the way the import widget shows it.
#[derive(Debug, Parser)]
#[command(name = "sheetbridge-preview")]
struct Args {
    /// File to read
    path: PathBuf,

    /// Data rows to keep
    #[arg(long, default_value_t = sheetbridge::preview::DEFAULT_ROW_CAP)]
    row_cap: usize,

    /// Also print the submission payload
    #[arg(long)]
    payload: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sheetbridge::init_tracing();
    let args = Args::parse();

    let name = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = std::fs::read(&args.path)?;

    let config = ImportConfig {
        row_cap: args.row_cap,
        ..ImportConfig::default()
    };
    let mut widget = ImportWidget::new(StandardCodec, config);

    if let Err(e) = widget.select_file(Some(RawFile::new(name, bytes))) {
        eprintln!("{}", widget.message());
        return Err(e.into());
    }
    println!("{}", widget.message());

    let preview = widget.preview();
    if !preview.headers.is_empty() {
        println!("{}", preview.headers.join("\t"));
    }
    for row in &preview.rows {
        let cells: Vec<String> = row.cells.iter().map(|c| c.value.to_string()).collect();
        println!("{}", cells.join("\t"));
    }

    if args.payload {
        if let Some(payload) = widget.payload() {
            println!("\n{}", payload);
        }
    }

    Ok(())
}
