//! Storage for the AI tutor's per-owner API keys.
//!
//! Keys are only reachable through an explicitly injected [`CredentialStore`]
//! with `get`/`set`/`clear`; there is no process-wide key.

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use rocket_db_pools::sqlx;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

const MAX_OWNER_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("owner must be 1-128 characters of letters, digits, '-', '_' or '.'")]
    InvalidOwner,
    #[error("API key must not be empty")]
    EmptyKey,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

#[rocket::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, owner: &str) -> CredentialResult<Option<String>>;

    /// Store `api_key` for `owner`, replacing any previous key.
    async fn set(&self, owner: &str, api_key: &str) -> CredentialResult<()>;

    /// Remove the key for `owner`. Returns whether one existed.
    async fn clear(&self, owner: &str) -> CredentialResult<bool>;
}

/// Store handle kept in Rocket state.
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialBackend {
    Memory,
    Postgres,
}

impl FromStr for CredentialBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CredentialBackend::Memory),
            "postgres" | "database" => Ok(CredentialBackend::Postgres),
            _ => Err(()),
        }
    }
}

pub(crate) fn validate_owner(owner: &str) -> CredentialResult<&str> {
    let owner = owner.trim();
    let valid = !owner.is_empty()
        && owner.len() <= MAX_OWNER_LEN
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(owner)
    } else {
        Err(CredentialError::InvalidOwner)
    }
}

pub(crate) fn validate_key(api_key: &str) -> CredentialResult<&str> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        Err(CredentialError::EmptyKey)
    } else {
        Ok(api_key)
    }
}

/// Short hint safe to show in a UI: the last four characters only.
pub fn mask_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
