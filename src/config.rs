use crate::credentials::CredentialBackend;
use crate::import::chunking::ChunkLimits;
use crate::import::coordinator::{AtomicityMode, ChunkFailurePolicy, WriterPolicy};
use crate::import::payload::ContentKind;
use crate::import::store::TransactionBudget;
use std::env;
use std::str::FromStr;
use std::time::Duration;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => match T::from_str(&value) {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("ignoring unrecognised value '{}' for {}", value, key);
                default
            }
        },
        Err(_) => default,
    }
}

/// Runtime configuration for bulk imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub quiz_chunk_size: usize,
    pub flashcard_chunk_size: usize,
    pub max_rows_per_chunk: usize,
    pub transaction_timeout: Duration,
    pub acquire_timeout: Duration,
    pub max_sets: usize,
    pub atomicity: AtomicityMode,
    pub quiz_on_failure: ChunkFailurePolicy,
    pub flashcard_on_failure: ChunkFailurePolicy,
    pub credential_backend: CredentialBackend,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            quiz_chunk_size: 3,
            flashcard_chunk_size: 1,
            max_rows_per_chunk: 5_000,
            transaction_timeout: Duration::from_secs(20),
            acquire_timeout: Duration::from_secs(5),
            max_sets: 200,
            atomicity: AtomicityMode::Partial,
            quiz_on_failure: ChunkFailurePolicy::Abort,
            flashcard_on_failure: ChunkFailurePolicy::Continue,
            credential_backend: CredentialBackend::Postgres,
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quiz_chunk_size: env_usize("IMPORT_QUIZ_CHUNK_SIZE", defaults.quiz_chunk_size),
            flashcard_chunk_size: env_usize(
                "IMPORT_FLASHCARD_CHUNK_SIZE",
                defaults.flashcard_chunk_size,
            ),
            max_rows_per_chunk: env_usize("IMPORT_MAX_ROWS_PER_CHUNK", defaults.max_rows_per_chunk),
            transaction_timeout: env_duration_millis(
                "IMPORT_TRANSACTION_TIMEOUT_MS",
                defaults.transaction_timeout,
            ),
            acquire_timeout: env_duration_millis("IMPORT_ACQUIRE_TIMEOUT_MS", defaults.acquire_timeout),
            max_sets: env_usize("IMPORT_MAX_SETS", defaults.max_sets),
            atomicity: env_parsed("IMPORT_ATOMICITY", defaults.atomicity),
            quiz_on_failure: env_parsed("IMPORT_QUIZ_ON_FAILURE", defaults.quiz_on_failure),
            flashcard_on_failure: env_parsed(
                "IMPORT_FLASHCARD_ON_FAILURE",
                defaults.flashcard_on_failure,
            ),
            credential_backend: env_parsed(
                "IMPORT_CREDENTIAL_BACKEND",
                defaults.credential_backend,
            ),
        }
    }

    pub fn budget(&self) -> TransactionBudget {
        TransactionBudget {
            acquire_timeout: self.acquire_timeout,
            transaction_timeout: self.transaction_timeout,
        }
    }

    pub fn writer_policy(&self, kind: ContentKind) -> WriterPolicy {
        let (chunk_size, on_failure) = match kind {
            ContentKind::Quiz => (self.quiz_chunk_size, self.quiz_on_failure),
            ContentKind::Flashcard => (self.flashcard_chunk_size, self.flashcard_on_failure),
        };

        WriterPolicy {
            limits: ChunkLimits::new(chunk_size, self.max_rows_per_chunk),
            on_failure,
            atomicity: self.atomicity,
        }
    }
}
