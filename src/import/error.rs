//! Error taxonomy for the import pipeline.
//!
//! Validation errors are raised before any database work and always abort the
//! whole batch. Preparation and chunk errors are scoped to individual sets and
//! end up in the per-set results. [`ImportError`] is reserved for failures that
//! leave no usable per-set report.

use rocket_db_pools::sqlx;
use std::time::Duration;
use thiserror::Error;

/// First structural or semantic violation found in an uploaded payload.
///
/// Set, question, option and card positions are 1-based to match what the
/// uploader sees in their file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Invalid format: expected an object with a \"{key}\" array")]
    MissingCollection { key: &'static str },
    #[error("No sets found in \"{key}\"")]
    EmptyBatch { key: &'static str },
    #[error("Too many sets in one import: {count} (maximum {max})")]
    TooManySets { count: usize, max: usize },
    #[error("Set {set}: expected an object")]
    SetNotObject { set: usize },
    #[error("Set {set}: \"{field}\" is required")]
    MissingField { set: usize, field: &'static str },
    #[error("Set {set}: \"{field}\" must be an array")]
    NotAnArray { set: usize, field: &'static str },
    #[error("Set {set}, question {question}: question text is required")]
    EmptyQuestionText { set: usize, question: usize },
    #[error("Set {set}, question {question}: \"options\" must be an array")]
    OptionsNotArray { set: usize, question: usize },
    #[error("Set {set}, question {question}: at least 2 options are required")]
    TooFewOptions { set: usize, question: usize },
    #[error("Set {set}, question {question}, option {option}: option text is required")]
    EmptyOptionText {
        set: usize,
        question: usize,
        option: usize,
    },
    #[error("Set {set}, question {question}: at least one option must be marked correct")]
    NoCorrectOption { set: usize, question: usize },
    #[error("Set {set}, card {card}: expected an object")]
    CardNotObject { set: usize, card: usize },
    #[error("Set {set}, card {card}: \"{side}\" must be text")]
    CardSideNotText {
        set: usize,
        card: usize,
        side: &'static str,
    },
    #[error("Set {set}, card {card}: \"{side}\" must not be empty")]
    EmptyCardSide {
        set: usize,
        card: usize,
        side: &'static str,
    },
    #[error("Invalid academic context: {0}")]
    InvalidContext(String),
    #[error("Payload does not match the expected shape: {0}")]
    Shape(String),
}

/// A set that cannot be turned into rows; the set fails, its siblings do not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    #[error("No valid flashcards found")]
    NoValidFlashcards,
    #[error("No valid questions found")]
    NoValidQuestions,
}

/// Failure of one chunk transaction. Every set in the chunk shares it.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("timed out after {0:?} waiting for a database connection")]
    AcquireTimeout(Duration),
    #[error("could not open a database connection: {0}")]
    Connect(sqlx::Error),
    #[error("chunk transaction exceeded its {0:?} budget")]
    TransactionTimeout(Duration),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Rejected(String),
}

impl ChunkError {
    /// No connection was obtained, so the chunk never started.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChunkError::AcquireTimeout(_) | ChunkError::Connect(_))
    }
}

/// Failures that abort an import without a per-set report.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The database could not be reached before anything was committed.
    #[error("database unavailable: {0}")]
    Unavailable(ChunkError),
    #[error("failed to roll back previously committed sets: {0}")]
    Compensation(ChunkError),
}
