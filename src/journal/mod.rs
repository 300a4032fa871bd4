//! Append-only CSV journals
//!
//! Both the query log and the access-request list are CSV files that get a
//! header on first write and plain rows afterwards.

pub mod access;
pub mod pending;

pub use access::{AccessLog, LogEntry};
pub use pending::{AccessRequest, AccessRequests, SubmitError, PENDING_STATUS};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::OpenOptions;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A CSV file that only ever grows
pub struct CsvJournal<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _row: PhantomData<fn() -> T>,
}

impl<T> CsvJournal<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first when the file is new or empty
    pub fn append(&self, row: &T) -> Result<(), JournalError> {
        let _guard = self.write_lock.lock();

        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Read every row; a journal that was never written is empty
    pub fn read_all(&self) -> Result<Vec<T>, JournalError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::Reader::from_reader(file);
        let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
        Ok(rows)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        count: usize,
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.csv");
        let journal: CsvJournal<Row> = CsvJournal::new(&path);

        journal
            .append(&Row {
                name: "a".into(),
                count: 1,
            })
            .unwrap();
        journal
            .append(&Row {
                name: "b".into(),
                count: 2,
            })
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name,count\na,1\nb,2\n");

        let rows = journal.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "b");
    }

    #[test]
    fn test_missing_journal_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal: CsvJournal<Row> = CsvJournal::new(dir.path().join("missing.csv"));
        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let journal: CsvJournal<Row> = CsvJournal::new(dir.path().join("no/such/dir/j.csv"));
        let result = journal.append(&Row {
            name: "a".into(),
            count: 1,
        });
        assert!(matches!(result, Err(JournalError::Io(_))));
    }
}
