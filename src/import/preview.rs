//! Import preview: validate an upload and show what an import would create,
//! without touching the database.

use crate::import::data_builder::prepare_batch;
use crate::import::payload::{ContentKind, ImportBatch, ImportOptions, parse_json_text, payload_digest};
use crate::import::validator::Validator;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPreview {
    pub position: usize,
    pub subject: String,
    pub topic: String,
    pub title: String,
    pub question_count: usize,
    pub option_count: usize,
    pub card_count: usize,
    /// Cards dropped because a side was empty.
    pub skipped_cards: usize,
    /// Why this set would fail on import, if it would.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub kind: ContentKind,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sets: Vec<SetPreview>,
    pub total_questions: usize,
    pub total_options: usize,
    pub total_cards: usize,
    pub payload_digest: String,
}

impl ImportPreview {
    fn invalid(kind: ContentKind, error: String, payload_digest: String) -> Self {
        Self {
            kind,
            valid: false,
            error: Some(error),
            sets: Vec::new(),
            total_questions: 0,
            total_options: 0,
            total_cards: 0,
            payload_digest,
        }
    }
}

/// Validate `text` with `validator` and, when it passes, describe every set.
pub fn preview(
    kind: ContentKind,
    text: &str,
    options: &ImportOptions,
    validator: &Validator,
) -> ImportPreview {
    let digest = payload_digest(text);

    let value = match parse_json_text(text) {
        Ok(value) => value,
        Err(err) => return ImportPreview::invalid(kind, err.to_string(), digest),
    };

    if let Err(err) = validator.validate(kind, &value) {
        return ImportPreview::invalid(kind, err.to_string(), digest);
    }

    let batch = match ImportBatch::from_value(kind, value) {
        Ok(batch) => batch,
        Err(err) => return ImportPreview::invalid(kind, err.to_string(), digest),
    };

    let submitted_cards: Vec<usize> = match &batch {
        ImportBatch::Quiz(sets) => vec![0; sets.len()],
        ImportBatch::Flashcard(sets) => sets.iter().map(|set| set.cards.len()).collect(),
    };

    let prepared = prepare_batch(&batch, options);
    let mut sets: Vec<SetPreview> = prepared
        .sets
        .iter()
        .map(|set| SetPreview {
            position: set.label.index + 1,
            subject: set.label.subject.clone(),
            topic: set.label.topic.clone(),
            title: set.label.title.clone(),
            question_count: set.question_count(),
            option_count: set.option_count(),
            card_count: set.card_count(),
            skipped_cards: submitted_cards[set.label.index] - set.card_count(),
            error: None,
        })
        .chain(prepared.rejected.iter().map(|rejected| SetPreview {
            position: rejected.label.index + 1,
            subject: rejected.label.subject.clone(),
            topic: rejected.label.topic.clone(),
            title: rejected.label.title.clone(),
            question_count: 0,
            option_count: 0,
            card_count: 0,
            skipped_cards: submitted_cards[rejected.label.index],
            error: Some(rejected.error.to_string()),
        }))
        .collect();
    sets.sort_by_key(|set| set.position);

    ImportPreview {
        kind,
        valid: true,
        error: None,
        total_questions: sets.iter().map(|set| set.question_count).sum(),
        total_options: sets.iter().map(|set| set.option_count).sum(),
        total_cards: sets.iter().map(|set| set.card_count).sum(),
        sets,
        payload_digest: digest,
    }
}
