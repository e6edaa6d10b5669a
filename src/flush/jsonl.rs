use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SnapshotError;

fn serde_error(path: &Path, source: serde_json::Error) -> SnapshotError {
    SnapshotError::Serde {
        file: path.display().to_string(),
        source,
    }
}

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
pub fn write_jsonl<T: Serialize>(
    path: &Path,
    items: impl Iterator<Item = T>,
) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item).map_err(|e| serde_error(path, e))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every non-blank line of a JSONL file.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SnapshotError> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line).map_err(|e| serde_error(path, e))?);
    }
    Ok(items)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| serde_error(path, e))?;
    writer.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| serde_error(path, e))
}
