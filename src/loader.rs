//! Record ingestion. JSON dumps of the backend match API are read with
//! serde; tabular registry exports (CSV/Parquet/Arrow) go through polars
//! with every cell cast to a string. Column headers are matched loosely, so
//! "cause_no", "Cause No." and "causeNo" all feed the same field.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::GmvError;
use crate::record::{Field, MatchRecord};

#[derive(Debug)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

// The backend wraps its match list in an envelope on some endpoints and
// returns a bare array on others.
#[derive(Deserialize)]
struct Envelope {
    #[serde(alias = "results")]
    matches: Vec<MatchRecord>,
}

pub fn load_records(path: &Path) -> Result<Vec<MatchRecord>, GmvError> {
    let file_info = get_file_info(path)?;
    let start_time = Instant::now();

    let records = match file_info.file_type {
        FileType::JSON => load_json(&file_info.path)?,
        FileType::CSV => records_from_frame(&load_csv(&file_info.path)?.collect()?)?,
        FileType::PARQUET => records_from_frame(&load_parquet(&file_info.path)?.collect()?)?,
        FileType::ARROW => records_from_frame(&load_arrow(&file_info.path)?.collect()?)?,
    };

    info!(
        "Loaded {} records ({} bytes) from {} in {}ms",
        records.len(),
        file_info.file_size,
        file_info.path.display(),
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

fn load_json(path: &Path) -> Result<Vec<MatchRecord>, GmvError> {
    let raw = fs::read_to_string(path)?;
    if let Ok(records) = serde_json::from_str::<Vec<MatchRecord>>(&raw) {
        return Ok(records);
    }
    let envelope: Envelope = serde_json::from_str(&raw)?;
    Ok(envelope.matches)
}

fn records_from_frame(df: &DataFrame) -> Result<Vec<MatchRecord>, PolarsError> {
    let mut records = vec![MatchRecord::default(); df.height()];
    for column in df.get_columns() {
        let Some(field) = Field::parse(column.name()) else {
            debug!("Ignoring unknown column \"{}\"", column.name());
            continue;
        };
        let cast = column.cast(&DataType::String)?;
        let series = cast.str()?;
        for (ridx, value) in series.into_iter().enumerate() {
            records[ridx].set_field(field, value.map(|s| s.to_string()));
        }
    }
    Ok(records)
}

fn detect_file_type(path: &Path) -> Result<FileType, GmvError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(GmvError::UnknownFileType),
    }
}

fn get_file_info(path: &Path) -> Result<FileInfo, GmvError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GmvError::FileNotFound,
        ErrorKind::PermissionDenied => GmvError::PermissionDenied,
        _ => GmvError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(GmvError::LoadingFailed("Not a file!".into()));
    }

    Ok(FileInfo {
        path: path.to_path_buf(),
        file_size: metadata.len(),
        file_type: detect_file_type(path)?,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
