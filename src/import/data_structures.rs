//! Data structures for chunked batch inserts.
//!
//! Child rows are held in parallel vectors (columnar format) so each table can
//! be written with a single `UNNEST` insert per set.

use crate::import::error::PrepareError;
use crate::import::payload::ContentKind;
use uuid::Uuid;

/// Parent row for a quiz or a flashcard set.
///
/// The academic context and publishing flags are batch-wide and are bound at
/// insert time rather than copied onto every row here.
#[derive(Debug, Clone)]
pub struct ParentRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub topic: String,
    pub unit_number: Option<i32>,
}

/// Prepared question rows for one quiz.
///
/// All vectors must have the same length. Each index represents one question.
#[derive(Debug, Clone, Default)]
pub struct QuestionsData {
    pub ids: Vec<Uuid>,
    pub quiz_ids: Vec<Uuid>,
    pub texts: Vec<String>,
    pub explanations: Vec<Option<String>>,
    pub orders: Vec<i32>,
}

/// Prepared option rows for every question of one quiz.
///
/// All vectors must have the same length. `orders` restart at 1 for each question.
#[derive(Debug, Clone, Default)]
pub struct OptionsData {
    pub ids: Vec<Uuid>,
    pub question_ids: Vec<Uuid>,
    pub texts: Vec<String>,
    pub is_correct: Vec<bool>,
    pub orders: Vec<i32>,
}

/// Prepared card rows for one flashcard set.
#[derive(Debug, Clone, Default)]
pub struct CardsData {
    pub ids: Vec<Uuid>,
    pub set_ids: Vec<Uuid>,
    pub fronts: Vec<String>,
    pub backs: Vec<String>,
    pub orders: Vec<i32>,
}

#[derive(Debug, Clone)]
pub enum PreparedChildren {
    Quiz {
        questions: QuestionsData,
        options: OptionsData,
    },
    Flashcard {
        cards: CardsData,
    },
}

/// Identifies a set in results, whether or not it was ever written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLabel {
    /// 0-based position in the submitted batch.
    pub index: usize,
    pub subject: String,
    pub topic: String,
    pub title: String,
}

/// One set ready to be written inside a chunk transaction.
#[derive(Debug, Clone)]
pub struct PreparedSet {
    pub label: SetLabel,
    pub parent: ParentRow,
    pub children: PreparedChildren,
}

impl PreparedSet {
    pub fn kind(&self) -> ContentKind {
        match self.children {
            PreparedChildren::Quiz { .. } => ContentKind::Quiz,
            PreparedChildren::Flashcard { .. } => ContentKind::Flashcard,
        }
    }

    pub fn question_count(&self) -> usize {
        match &self.children {
            PreparedChildren::Quiz { questions, .. } => questions.ids.len(),
            PreparedChildren::Flashcard { .. } => 0,
        }
    }

    pub fn option_count(&self) -> usize {
        match &self.children {
            PreparedChildren::Quiz { options, .. } => options.ids.len(),
            PreparedChildren::Flashcard { .. } => 0,
        }
    }

    pub fn card_count(&self) -> usize {
        match &self.children {
            PreparedChildren::Quiz { .. } => 0,
            PreparedChildren::Flashcard { cards } => cards.ids.len(),
        }
    }

    /// Child rows this set adds to a chunk transaction.
    pub fn row_count(&self) -> usize {
        self.question_count() + self.option_count() + self.card_count()
    }
}

/// A set that could not be prepared, kept so it still appears in the results.
#[derive(Debug, Clone)]
pub struct RejectedSet {
    pub label: SetLabel,
    pub error: PrepareError,
}

/// Output of the preparation step, in submission order within each list.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub kind: ContentKind,
    pub sets: Vec<PreparedSet>,
    pub rejected: Vec<RejectedSet>,
}

impl PreparedBatch {
    pub fn total(&self) -> usize {
        self.sets.len() + self.rejected.len()
    }
}
