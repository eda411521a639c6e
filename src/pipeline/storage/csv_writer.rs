use crate::common::error::Result;
use crate::pipeline::processing::aggregate::FacilityTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Text encoding rows must fit into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvEncoding {
    #[default]
    Utf8,
    /// 7-bit only; rows with any other character are dropped
    Ascii,
}

impl CsvEncoding {
    /// First character of `cell` this encoding cannot represent
    pub fn unencodable(&self, cell: &str) -> Option<char> {
        match self {
            CsvEncoding::Utf8 => None,
            CsvEncoding::Ascii => cell.chars().find(|c| !c.is_ascii()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    /// Position in the table, header excluded
    pub record: usize,
    pub id: String,
    pub state: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvWriteReport {
    pub path: PathBuf,
    /// Data rows written, header excluded
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub dropped: Vec<DroppedRow>,
}

/// Writes the header and every record of `table` to `path`.
///
/// A record that cannot be encoded is skipped and listed in the report
/// instead of failing the file. The CSV is written beside `path` first and
/// renamed into place, so a failed write never leaves a truncated file.
pub fn write_table(table: &FacilityTable, path: &Path, encoding: CsvEncoding) -> Result<CsvWriteReport> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_path_for(path);

    let result = write_rows(table, &tmp_path, encoding);
    let (rows_written, dropped) = match result {
        Ok(counts) => counts,
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
    };
    fs::rename(&tmp_path, path)?;

    if !dropped.is_empty() {
        warn!(
            path = %path.display(),
            dropped = dropped.len(),
            "Dropped rows that could not be encoded"
        );
    }
    info!(path = %path.display(), rows = rows_written, "CSV written");

    Ok(CsvWriteReport {
        path: path.to_path_buf(),
        rows_written,
        rows_dropped: dropped.len(),
        dropped,
    })
}

fn write_rows(
    table: &FacilityTable,
    tmp_path: &Path,
    encoding: CsvEncoding,
) -> Result<(usize, Vec<DroppedRow>)> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_path(tmp_path)?;
    wtr.write_record(table.header())?;

    let mut written = 0;
    let mut dropped = Vec::new();
    for (i, record) in table.records().iter().enumerate() {
        let row = record.to_row();
        if let Some(bad) = row.iter().find_map(|cell| encoding.unencodable(cell)) {
            let common = record.common();
            warn!(
                state = %common.state,
                id = %common.id,
                character = %bad.escape_unicode(),
                "Row not representable in {:?}; dropped",
                encoding
            );
            dropped.push(DroppedRow {
                record: i,
                id: common.id.clone(),
                state: common.state.clone(),
                reason: format!("character {} not representable", bad.escape_unicode()),
            });
            continue;
        }
        wtr.write_record(&row)?;
        written += 1;
    }
    wtr.flush()?;
    Ok((written, dropped))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
