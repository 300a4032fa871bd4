use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{CsvJournal, JournalError};

/// Status of a request nobody has handled yet
pub const PENDING_STATUS: &str = "ожидает";

/// A visitor asking for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub timestamp: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub status: String,
}

/// Pending access requests
pub struct AccessRequests {
    journal: CsvJournal<AccessRequest>,
}

impl AccessRequests {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            journal: CsvJournal::new(path),
        }
    }

    /// File a new request; username and email are mandatory
    pub fn submit(
        &self,
        username: &str,
        email: &str,
        phone: &str,
    ) -> Result<AccessRequest, SubmitError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(SubmitError::MissingField);
        }

        let request = AccessRequest {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            username: username.to_string(),
            email: email.to_string(),
            phone: phone.trim().to_string(),
            status: PENDING_STATUS.to_string(),
        };
        self.journal.append(&request)?;

        tracing::info!(username = %request.username, "Access request submitted");
        Ok(request)
    }

    pub fn read_all(&self) -> Result<Vec<AccessRequest>, JournalError> {
        self.journal.read_all()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Username and email are required")]
    MissingField,

    #[error(transparent)]
    Journal(#[from] JournalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let requests = AccessRequests::new(dir.path().join("pending_requests.csv"));

        let request = requests
            .submit("ivanov", " ivanov@example.ru ", "")
            .unwrap();
        assert_eq!(request.status, PENDING_STATUS);
        assert_eq!(request.email, "ivanov@example.ru");

        let all = requests.read_all().unwrap();
        assert_eq!(all, vec![request]);
    }

    #[test]
    fn test_missing_email_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let requests = AccessRequests::new(dir.path().join("pending_requests.csv"));

        assert!(matches!(
            requests.submit("ivanov", "  ", "+7 900"),
            Err(SubmitError::MissingField)
        ));
        assert!(requests.read_all().unwrap().is_empty());
    }
}
