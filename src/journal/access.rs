use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{CsvJournal, JournalError};
use crate::query::FilterSpec;

/// One logged query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601
    pub timestamp: String,
    pub username: String,
    /// JSON of the filter spec
    pub filters: String,
    pub result_count: usize,
    /// Client address or "unknown"
    pub ip: String,
}

impl LogEntry {
    pub fn new(username: &str, filters: &FilterSpec, result_count: usize, ip: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            username: username.to_string(),
            filters: serde_json::to_string(filters).unwrap_or_default(),
            result_count,
            ip: ip.unwrap_or("unknown").to_string(),
        }
    }
}

/// Query history
pub struct AccessLog {
    journal: CsvJournal<LogEntry>,
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            journal: CsvJournal::new(path),
        }
    }

    pub fn append(&self, entry: &LogEntry) -> Result<(), JournalError> {
        self.journal.append(entry)
    }

    /// Append without failing the caller; errors are only logged
    pub fn record(&self, entry: &LogEntry) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(
                path = %self.journal.path().display(),
                username = %entry.username,
                "Failed to write query log: {}",
                e
            );
        }
    }

    pub fn read_all(&self) -> Result<Vec<LogEntry>, JournalError> {
        self.journal.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Utility;
    use crate::query::UtilityFilter;

    #[test]
    fn test_log_entry_fields() {
        let spec = FilterSpec::new()
            .with_category("Земли лесного фонда")
            .with_utility(Utility::Water, UtilityFilter::RequireTrue);
        let entry = LogEntry::new("alice", &spec, 3, None);

        assert_eq!(entry.ip, "unknown");
        assert_eq!(entry.result_count, 3);
        let filters: FilterSpec = serde_json::from_str(&entry.filters).unwrap();
        assert_eq!(filters, spec);
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn test_log_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = AccessLog::new(dir.path().join("requests_log.csv"));

        let entry = LogEntry::new("alice", &FilterSpec::new(), 10, Some("10.0.0.1"));
        log.append(&entry).unwrap();
        log.append(&LogEntry::new("bob", &FilterSpec::new(), 0, None))
            .unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entry);
        assert_eq!(entries[1].username, "bob");

        let text = std::fs::read_to_string(dir.path().join("requests_log.csv")).unwrap();
        assert!(text.starts_with("timestamp,username,filters,result_count,ip\n"));
    }

    #[test]
    fn test_record_swallows_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let log = AccessLog::new(dir.path().join("missing/dir/log.csv"));
        log.record(&LogEntry::new("alice", &FilterSpec::new(), 1, None));
        assert!(log.read_all().unwrap().is_empty());
    }
}
