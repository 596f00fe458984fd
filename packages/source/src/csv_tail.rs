//! Reads the most recent rows of a large bulk CSV export.
//!
//! Bulk exports are append-ordered and can be several gigabytes, so only
//! the header line and the trailing `tail_rows` lines are read. Each row
//! becomes a JSON object keyed by the trimmed header names, which lets the
//! same [`crate::feed_def::FieldMapping`] logic normalize CSV and API
//! records alike.

use std::fs::File;
use std::io::{BufRead as _, BufReader, Read as _, Seek as _, SeekFrom};
use std::path::{Path, PathBuf};

use crate::SourceError;

/// Size of each backward read while searching for the tail.
const CHUNK_SIZE: u64 = 64 * 1024;

/// Reads the header and the last `tail_rows` rows of a CSV file.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be opened or read and
/// [`SourceError::Csv`] if the header line cannot be parsed.
pub async fn read_tail(
    path: PathBuf,
    tail_rows: usize,
) -> Result<Vec<serde_json::Value>, SourceError> {
    tokio::task::spawn_blocking(move || read_tail_blocking(&path, tail_rows))
        .await
        .map_err(|e| SourceError::Normalization {
            message: format!("CSV reader task failed: {e}"),
        })?
}

fn read_tail_blocking(path: &Path, tail_rows: usize) -> Result<Vec<serde_json::Value>, SourceError> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let mut reader = BufReader::new(&file);
    let mut header_line = String::new();
    let header_len = reader.read_line(&mut header_line)? as u64;
    drop(reader);

    let headers: Vec<String> = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(header_line.as_bytes())
        .records()
        .next()
        .transpose()?
        .map(|r| r.iter().map(|h| h.trim().to_string()).collect())
        .unwrap_or_default();

    if headers.is_empty() || tail_rows == 0 {
        return Ok(Vec::new());
    }

    let start = tail_start(&mut file, header_len, file_len, tail_rows)?;
    file.seek(SeekFrom::Start(start))?;
    let mut body = Vec::new();
    file.read_to_end(&mut body)?;

    // A seek into the middle of the data lands inside a row.
    let body = if start > header_len {
        body.iter()
            .position(|b| *b == b'\n')
            .map_or(&body[body.len()..], |i| &body[i + 1..])
    } else {
        &body[..]
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in csv_reader.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let mut obj = serde_json::Map::new();
        for (i, value) in record.iter().enumerate() {
            if let Some(key) = headers.get(i) {
                obj.insert(key.clone(), serde_json::Value::String(value.to_string()));
            }
        }
        rows.push(serde_json::Value::Object(obj));
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} unreadable rows in {}", path.display());
    }

    let excess = rows.len().saturating_sub(tail_rows);
    rows.drain(..excess);

    log::debug!("Read {} trailing rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Finds a byte offset from which at least `tail_rows` complete lines
/// remain, never earlier than the end of the header.
fn tail_start(
    file: &mut File,
    header_len: u64,
    file_len: u64,
    tail_rows: usize,
) -> Result<u64, SourceError> {
    let mut pos = file_len;
    let mut newlines = 0usize;
    let mut buf = vec![0u8; usize::try_from(CHUNK_SIZE).unwrap_or(65_536)];

    while pos > header_len {
        let read_len = CHUNK_SIZE.min(pos - header_len);
        pos -= read_len;
        file.seek(SeekFrom::Start(pos))?;
        let chunk = &mut buf[..usize::try_from(read_len).unwrap_or(0)];
        file.read_exact(chunk)?;
        newlines += chunk.iter().filter(|b| **b == b'\n').count();
        if newlines > tail_rows {
            return Ok(pos);
        }
    }

    Ok(header_len)
}
