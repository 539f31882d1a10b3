//! Line-delimited JSON storage for message records.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::types::MessageRecord;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid record: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to encode record {id}: {source}")]
    Encode {
        id: String,
        source: serde_json::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> RecordsError + '_ {
    move |source| RecordsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write one JSON object per line, replacing any existing file.
pub fn write_records(path: &Path, records: &[MessageRecord]) -> Result<(), RecordsError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let file = File::create(path).map_err(io_err(path))?;
    let mut out = BufWriter::new(file);
    for rec in records {
        let line = serde_json::to_string(rec).map_err(|source| RecordsError::Encode {
            id: rec.id.clone(),
            source,
        })?;
        out.write_all(line.as_bytes()).map_err(io_err(path))?;
        out.write_all(b"\n").map_err(io_err(path))?;
    }
    out.flush().map_err(io_err(path))?;
    Ok(())
}

/// Read every record; blank lines are skipped, a malformed line is an error.
pub fn read_records(path: &Path) -> Result<Vec<MessageRecord>, RecordsError> {
    let file = File::open(path).map_err(io_err(path))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err(path))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let rec = serde_json::from_str(line).map_err(|source| RecordsError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(rec);
    }
    Ok(records)
}

/// Split records into `<dir>/<year>.ndjson`. Records without a year are left out.
///
/// Returns the number of year files written.
pub fn write_by_year(dir: &Path, records: &[MessageRecord]) -> Result<usize, RecordsError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut per_year: BTreeMap<i32, Vec<MessageRecord>> = BTreeMap::new();
    for rec in records {
        if let Some(year) = rec.year {
            per_year.entry(year).or_default().push(rec.clone());
        }
    }
    for (year, recs) in &per_year {
        write_records(&dir.join(format!("{year}.ndjson")), recs)?;
    }
    Ok(per_year.len())
}

/// Read every `*.ndjson` file in a directory, in file-name order.
pub fn read_dir_records(dir: &Path) -> Result<Vec<(PathBuf, Vec<MessageRecord>)>, RecordsError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err(dir))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ndjson"))
        .collect();
    paths.sort();
    paths
        .into_iter()
        .map(|p| read_records(&p).map(|recs| (p, recs)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rec(id: &str, year: Option<i32>) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            thread_id: id.to_string(),
            subject: format!("subject {id}"),
            author: "frank".to_string(),
            timestamp: None,
            year,
            index_text: String::new(),
            full_text: "line one\nline \"two\"".to_string(),
        }
    }

    #[test]
    fn records_survive_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/messages.ndjson");
        let records = vec![rec("1", Some(2001)), rec("2", None)];
        write_records(&path, &records).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.ndjson");
        fs::write(&path, "\n{\"id\":\"1\",\"thread_id\":\"1\"}\nnot json\n").unwrap();

        match read_records(&path).unwrap_err() {
            RecordsError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn by_year_split_skips_unknown_years() {
        let dir = TempDir::new().unwrap();
        let records = vec![rec("1", Some(2001)), rec("2", Some(2002)), rec("3", Some(2001)), rec("4", None)];
        let years = write_by_year(dir.path(), &records).unwrap();
        assert_eq!(years, 2);

        let files = read_dir_records(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].0.ends_with("2001.ndjson"));
        let ids: Vec<_> = files[0].1.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }
}
