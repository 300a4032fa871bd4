//! Username/password authentication and sessions

pub mod credentials;
pub mod session;
pub mod sweeper;

pub use credentials::{Credential, CredentialStore};
pub use session::{Session, SessionStore};
pub use sweeper::SessionSweeper;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),
}
