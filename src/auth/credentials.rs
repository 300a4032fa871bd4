use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use super::AuthError;
use crate::data::value::parse_flag;

/// One row of the users table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    /// bcrypt hash including its salt
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
struct CredentialRow {
    username: String,
    hashed_password: String,
    #[serde(default)]
    is_admin: String,
}

/// Username to password-hash table loaded from `users.csv`
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: Vec<Credential>,
}

impl CredentialStore {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    /// Load the users table; a missing file is fatal for authentication
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let file = std::fs::File::open(path).map_err(|e| {
            AuthError::StoreUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let store = Self::from_reader(file)?;
        tracing::info!(users = store.len(), "Loaded credential store from {}", path.display());
        Ok(store)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AuthError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut credentials = Vec::new();
        for row in reader.deserialize::<CredentialRow>() {
            let row = row.map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;
            credentials.push(Credential {
                username: row.username,
                password_hash: row.hashed_password,
                is_admin: parse_flag(&row.is_admin).unwrap_or(false),
            });
        }

        Ok(Self { credentials })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The credential for `username` when exactly one row carries it
    pub fn lookup(&self, username: &str) -> Option<&Credential> {
        let mut matches = self.credentials.iter().filter(|c| c.username == username);
        match (matches.next(), matches.next()) {
            (Some(credential), None) => Some(credential),
            _ => None,
        }
    }

    /// Verify a password against the stored salted hash
    pub fn authenticate(&self, username: &str, password: &str) -> Result<&Credential, AuthError> {
        let credential = self
            .lookup(username)
            .ok_or_else(|| AuthError::UserNotFound(username.to_string()))?;

        match bcrypt::verify(password, &credential.password_hash) {
            Ok(true) => Ok(credential),
            Ok(false) => Err(AuthError::WrongPassword),
            Err(e) => {
                tracing::warn!(username = %username, "Stored password hash is unusable: {}", e);
                Err(AuthError::MalformedHash)
            }
        }
    }
}
