//! Import result reporting.
//!
//! Folds a [`WriteReport`] into the summary returned to callers. Both content
//! kinds report per-set results; they differ only in what counts as success.

use crate::import::coordinator::{SetOutcome, SetStatus, WriteReport};
use crate::import::payload::ContentKind;
use crate::import::stats::ImportStats;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result for one submitted set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemResult {
    /// 1-based position of the set in the submitted file.
    pub position: usize,
    pub subject: String,
    pub topic: String,
    pub title: String,
    pub status: SetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportItemResult {
    fn from_outcome(kind: ContentKind, outcome: &SetOutcome) -> Self {
        let (question_count, option_count, card_count) = match (kind, outcome.stats) {
            (ContentKind::Quiz, Some(stats)) => (Some(stats.questions), Some(stats.options), None),
            (ContentKind::Flashcard, Some(stats)) => (None, None, Some(stats.cards)),
            (_, None) => (None, None, None),
        };

        Self {
            position: outcome.label.index + 1,
            subject: outcome.label.subject.clone(),
            topic: outcome.label.topic.clone(),
            title: outcome.label.title.clone(),
            status: outcome.status,
            created_id: outcome.created_id,
            question_count,
            option_count,
            card_count,
            error: outcome.error.clone(),
        }
    }
}

/// Rows created by an import, named after the tables they landed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportedCounts {
    pub quizzes: usize,
    pub flashcard_sets: usize,
    pub questions: usize,
    pub options: usize,
    pub cards: usize,
}

impl ImportedCounts {
    pub fn new(kind: ContentKind, stats: ImportStats) -> Self {
        let (quizzes, flashcard_sets) = match kind {
            ContentKind::Quiz => (stats.sets, 0),
            ContentKind::Flashcard => (0, stats.sets),
        };
        Self {
            quizzes,
            flashcard_sets,
            questions: stats.questions,
            options: stats.options,
            cards: stats.cards,
        }
    }
}

/// Summary returned for every import that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success: bool,
    pub kind: ContentKind,
    pub total_processed: usize,
    pub success_count: usize,
    /// Failed, skipped and rolled-back sets.
    pub error_count: usize,
    pub skipped_count: usize,
    pub imported: ImportedCounts,
    pub results: Vec<ImportItemResult>,
    /// Set when a single-set quiz import created its quiz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<Uuid>,
    /// Set when a single-set flashcard import created its set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flashcard_set_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// SHA-256 of the submitted text. Identical resubmissions share it but
    /// still create new rows.
    pub payload_digest: String,
}

impl ImportSummary {
    /// Build the caller-facing summary.
    ///
    /// Quiz imports succeed only when every set was created. Flashcard imports
    /// succeed when at least one set was created; individual failures are
    /// listed in `results`.
    pub fn from_report(report: &WriteReport, payload_digest: String) -> Self {
        let kind = report.kind;
        let results: Vec<ImportItemResult> = report
            .outcomes
            .iter()
            .map(|outcome| ImportItemResult::from_outcome(kind, outcome))
            .collect();

        let total_processed = results.len();
        let success_count = report.count(SetStatus::Created);
        let skipped_count = report.count(SetStatus::Skipped);
        let error_count = total_processed - success_count;

        let success = match kind {
            ContentKind::Quiz => total_processed > 0 && error_count == 0,
            ContentKind::Flashcard => success_count > 0,
        };

        let error = if success {
            None
        } else {
            report.first_error.clone().or_else(|| first_item_error(&results))
        };

        let single_id = report.single_created_id();
        let (quiz_id, flashcard_set_id) = match kind {
            ContentKind::Quiz => (single_id, None),
            ContentKind::Flashcard => (None, single_id),
        };

        Self {
            success,
            kind,
            total_processed,
            success_count,
            error_count,
            skipped_count,
            imported: ImportedCounts::new(kind, report.stats),
            results,
            quiz_id,
            flashcard_set_id,
            error,
            payload_digest,
        }
    }

    /// Results for sets that were not created.
    pub fn failures(&self) -> impl Iterator<Item = &ImportItemResult> {
        self.results
            .iter()
            .filter(|item| item.status != SetStatus::Created)
    }
}

fn first_item_error(results: &[ImportItemResult]) -> Option<String> {
    results.iter().find_map(|item| item.error.clone())
}
