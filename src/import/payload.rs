//! Typed view of an uploaded import payload.
//!
//! The uploader sends JSON text. It is parsed into an untyped [`Value`] first so
//! the validator can report the first violation in terms of the document the
//! user wrote, and only then deserialized into an [`ImportBatch`].

use crate::import::error::ValidationError;
use crate::models::AcademicContext;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which kind of content a batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Quiz,
    Flashcard,
}

impl ContentKind {
    /// Root key holding the array of sets.
    pub fn collection_key(&self) -> &'static str {
        match self {
            ContentKind::Quiz => "quizSets",
            ContentKind::Flashcard => "flashcardSets",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentKind::Quiz => "quiz",
            ContentKind::Flashcard => "flashcard",
        })
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiz" | "quizzes" => Ok(ContentKind::Quiz),
            "flashcard" | "flashcards" => Ok(ContentKind::Flashcard),
            other => Err(format!("unknown content kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub question: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub options: Vec<OptionInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSetInput {
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit_number: Option<i32>,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardInput {
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSetInput {
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit_number: Option<i32>,
    #[serde(alias = "flashcards")]
    pub cards: Vec<CardInput>,
}

#[derive(Debug, Deserialize)]
struct QuizEnvelope {
    #[serde(rename = "quizSets")]
    sets: Vec<QuizSetInput>,
}

#[derive(Debug, Deserialize)]
struct FlashcardEnvelope {
    #[serde(rename = "flashcardSets")]
    sets: Vec<FlashcardSetInput>,
}

/// The full uploaded payload, in submission order.
#[derive(Debug, Clone)]
pub enum ImportBatch {
    Quiz(Vec<QuizSetInput>),
    Flashcard(Vec<FlashcardSetInput>),
}

impl ImportBatch {
    /// Deserialize an already validated JSON document.
    pub fn from_value(kind: ContentKind, value: Value) -> Result<Self, ValidationError> {
        let shape = |err: serde_json::Error| ValidationError::Shape(err.to_string());
        match kind {
            ContentKind::Quiz => {
                let envelope: QuizEnvelope = serde_json::from_value(value).map_err(shape)?;
                Ok(ImportBatch::Quiz(envelope.sets))
            }
            ContentKind::Flashcard => {
                let envelope: FlashcardEnvelope = serde_json::from_value(value).map_err(shape)?;
                Ok(ImportBatch::Flashcard(envelope.sets))
            }
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ImportBatch::Quiz(_) => ContentKind::Quiz,
            ImportBatch::Flashcard(_) => ContentKind::Flashcard,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ImportBatch::Quiz(sets) => sets.len(),
            ImportBatch::Flashcard(sets) => sets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Batch-wide overrides and publishing metadata supplied next to the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub unit_number: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_premium: bool,
    pub required_tier: Option<String>,
    pub is_published: bool,
}

impl ImportOptions {
    /// Tier stored on created rows; only premium content carries one.
    pub fn effective_tier(&self) -> Option<String> {
        if !self.is_premium {
            return None;
        }
        self.required_tier
            .as_deref()
            .map(str::trim)
            .filter(|tier| !tier.is_empty())
            .map(|tier| tier.to_ascii_uppercase())
    }
}

/// Everything a single import invocation needs.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub json_data: String,
    pub context: AcademicContext,
    pub options: ImportOptions,
}

/// Parse uploaded JSON text into an untyped document.
pub fn parse_json_text(text: &str) -> Result<Value, ValidationError> {
    let trimmed = text.trim_start_matches('\u{feff}');
    serde_json::from_str(trimmed).map_err(|err| ValidationError::InvalidJson(err.to_string()))
}

/// Hex SHA-256 of the submitted text, reported back so callers can spot resubmissions.
pub fn payload_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{:x}", digest)
}

/// Read an import payload from disk as UTF-8 text.
pub fn read_payload_file(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = parse_json_text("{\"quizSets\": [").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON format"));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let value = parse_json_text("\u{feff}{\"quizSets\": []}").unwrap();
        assert!(value.get("quizSets").is_some());
    }

    #[test]
    fn flashcard_sets_accept_flashcards_alias() {
        let value = json!({
            "flashcardSets": [{
                "subject": "Biology",
                "topic": "Cells",
                "flashcards": [{"front": "Powerhouse?", "back": "Mitochondria"}]
            }]
        });
        let batch = ImportBatch::from_value(ContentKind::Flashcard, value).unwrap();
        match batch {
            ImportBatch::Flashcard(sets) => assert_eq!(sets[0].cards.len(), 1),
            ImportBatch::Quiz(_) => panic!("expected flashcard batch"),
        }
    }

    #[test]
    fn option_correctness_defaults_to_false() {
        let value = json!({
            "quizSets": [{
                "subject": "Physics",
                "topic": "Kinematics",
                "unitNumber": 2,
                "questions": [{
                    "question": "Unit of force?",
                    "options": [{"text": "Newton", "isCorrect": true}, {"text": "Joule"}]
                }]
            }]
        });
        let batch = ImportBatch::from_value(ContentKind::Quiz, value).unwrap();
        let ImportBatch::Quiz(sets) = batch else {
            panic!("expected quiz batch");
        };
        assert_eq!(sets[0].unit_number, Some(2));
        assert!(sets[0].questions[0].options[0].is_correct);
        assert!(!sets[0].questions[0].options[1].is_correct);
    }

    #[test]
    fn tier_is_dropped_for_free_content() {
        let options = ImportOptions {
            is_premium: false,
            required_tier: Some("gold".into()),
            ..Default::default()
        };
        assert_eq!(options.effective_tier(), None);

        let premium = ImportOptions {
            is_premium: true,
            required_tier: Some(" gold ".into()),
            ..Default::default()
        };
        assert_eq!(premium.effective_tier().as_deref(), Some("GOLD"));
    }

    #[test]
    fn digest_is_stable_for_identical_text() {
        let text = "{\"quizSets\": []}";
        assert_eq!(payload_digest(text), payload_digest(text));
        assert_ne!(payload_digest(text), payload_digest("{}"));
        assert_eq!(payload_digest(text).len(), 64);
    }

    #[test]
    fn payload_file_is_read_as_text() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{\"flashcardSets\": []}}").expect("write payload");
        let text = read_payload_file(file.path()).expect("read payload");
        assert_eq!(text, "{\"flashcardSets\": []}");
    }

    #[test]
    fn kind_parses_plural_forms() {
        assert_eq!("quizzes".parse::<ContentKind>().unwrap(), ContentKind::Quiz);
        assert_eq!(
            "Flashcards".parse::<ContentKind>().unwrap(),
            ContentKind::Flashcard
        );
        assert!("notes".parse::<ContentKind>().is_err());
    }
}
