//! Content validation shared by the preview endpoint and the import path.
//!
//! Validation is fail-fast: the first violation wins and is reported as a
//! single message. Nothing here touches the database.

use crate::import::error::ValidationError;
use crate::import::payload::ContentKind;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How much of a flashcard payload must be perfect before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Pre-submission check: any empty card side rejects the whole batch.
    Strict,
    /// Server-side check before writing: empty card sides are left to the
    /// writer, which drops them and reports sets that end up empty.
    Submission,
}

/// Outcome of a validation pass in the shape the upload UI consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), ValidationError>> for ValidationReport {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => ValidationReport {
                valid: true,
                error: None,
            },
            Err(err) => ValidationReport {
                valid: false,
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Validator {
    strictness: Strictness,
    max_sets: Option<usize>,
}

impl Validator {
    pub fn strict() -> Self {
        Self {
            strictness: Strictness::Strict,
            max_sets: None,
        }
    }

    pub fn submission() -> Self {
        Self {
            strictness: Strictness::Submission,
            max_sets: None,
        }
    }

    /// Reject batches with more than `max` sets.
    pub fn with_max_sets(mut self, max: usize) -> Self {
        self.max_sets = Some(max);
        self
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn report(&self, kind: ContentKind, value: &Value) -> ValidationReport {
        self.validate(kind, value).into()
    }

    pub fn validate(&self, kind: ContentKind, value: &Value) -> Result<(), ValidationError> {
        let key = kind.collection_key();
        let sets = value
            .as_object()
            .and_then(|root| root.get(key))
            .and_then(Value::as_array)
            .ok_or(ValidationError::MissingCollection { key })?;

        if sets.is_empty() {
            return Err(ValidationError::EmptyBatch { key });
        }

        if let Some(max) = self.max_sets {
            if sets.len() > max {
                return Err(ValidationError::TooManySets {
                    count: sets.len(),
                    max,
                });
            }
        }

        for (index, set) in sets.iter().enumerate() {
            let set_no = index + 1;
            let set = set
                .as_object()
                .ok_or(ValidationError::SetNotObject { set: set_no })?;

            for field in ["subject", "topic"] {
                if !has_text(set, field) {
                    return Err(ValidationError::MissingField { set: set_no, field });
                }
            }

            match kind {
                ContentKind::Quiz => self.validate_quiz_set(set_no, set)?,
                ContentKind::Flashcard => self.validate_flashcard_set(set_no, set)?,
            }
        }

        Ok(())
    }

    fn validate_quiz_set(&self, set_no: usize, set: &Map<String, Value>) -> Result<(), ValidationError> {
        let questions = set
            .get("questions")
            .and_then(Value::as_array)
            .ok_or(ValidationError::NotAnArray {
                set: set_no,
                field: "questions",
            })?;

        if questions.is_empty() && self.strictness == Strictness::Strict {
            return Err(ValidationError::MissingField {
                set: set_no,
                field: "questions",
            });
        }

        for (q_index, question) in questions.iter().enumerate() {
            let q_no = q_index + 1;
            let question = question.as_object();

            if !question.map(|q| has_text(q, "question")).unwrap_or(false) {
                return Err(ValidationError::EmptyQuestionText {
                    set: set_no,
                    question: q_no,
                });
            }

            let options = question
                .and_then(|q| q.get("options"))
                .and_then(Value::as_array)
                .ok_or(ValidationError::OptionsNotArray {
                    set: set_no,
                    question: q_no,
                })?;

            if options.len() < 2 {
                return Err(ValidationError::TooFewOptions {
                    set: set_no,
                    question: q_no,
                });
            }

            for (o_index, option) in options.iter().enumerate() {
                if !option.as_object().map(|o| has_text(o, "text")).unwrap_or(false) {
                    return Err(ValidationError::EmptyOptionText {
                        set: set_no,
                        question: q_no,
                        option: o_index + 1,
                    });
                }
            }

            // Only a literal `true` counts; "true" or 1 do not.
            let has_correct = options
                .iter()
                .any(|option| option.get("isCorrect") == Some(&Value::Bool(true)));
            if !has_correct {
                return Err(ValidationError::NoCorrectOption {
                    set: set_no,
                    question: q_no,
                });
            }
        }

        Ok(())
    }

    fn validate_flashcard_set(
        &self,
        set_no: usize,
        set: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        let cards = set
            .get("cards")
            .or_else(|| set.get("flashcards"))
            .and_then(Value::as_array)
            .ok_or(ValidationError::NotAnArray {
                set: set_no,
                field: "cards",
            })?;

        if cards.is_empty() && self.strictness == Strictness::Strict {
            return Err(ValidationError::MissingField {
                set: set_no,
                field: "cards",
            });
        }

        for (c_index, card) in cards.iter().enumerate() {
            let card_no = c_index + 1;
            let card = card.as_object().ok_or(ValidationError::CardNotObject {
                set: set_no,
                card: card_no,
            })?;

            for side in ["front", "back"] {
                if card.get(side).is_some_and(|value| !value.is_string()) {
                    return Err(ValidationError::CardSideNotText {
                        set: set_no,
                        card: card_no,
                        side,
                    });
                }
                if self.strictness == Strictness::Strict && !has_text(card, side) {
                    return Err(ValidationError::EmptyCardSide {
                        set: set_no,
                        card: card_no,
                        side,
                    });
                }
            }
        }

        Ok(())
    }
}

fn has_text(object: &Map<String, Value>, field: &str) -> bool {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn physics_quiz() -> Value {
        json!({
            "quizSets": [{
                "subject": "Physics",
                "topic": "Kinematics",
                "questions": [{
                    "question": "Unit of force?",
                    "options": [
                        {"text": "Newton", "isCorrect": true},
                        {"text": "Joule", "isCorrect": false}
                    ]
                }]
            }]
        })
    }

    #[test]
    fn accepts_well_formed_quiz() {
        let report = Validator::strict().report(ContentKind::Quiz, &physics_quiz());
        assert!(report.valid);
        assert!(report.error.is_none());
    }

    #[test]
    fn rejects_wrong_collection_key() {
        let err = Validator::strict()
            .validate(ContentKind::Flashcard, &physics_quiz())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingCollection {
                key: "flashcardSets"
            }
        );
    }

    #[test]
    fn rejects_non_object_root() {
        let err = Validator::strict()
            .validate(ContentKind::Quiz, &json!([1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingCollection { .. }));
    }

    #[test]
    fn rejects_blank_subject() {
        let mut value = physics_quiz();
        value["quizSets"][0]["subject"] = json!("   ");
        let err = Validator::strict()
            .validate(ContentKind::Quiz, &value)
            .unwrap_err();
        assert_eq!(err.to_string(), "Set 1: \"subject\" is required");
    }

    #[test]
    fn missing_correct_option_is_rejected_in_both_modes() {
        let mut value = physics_quiz();
        value["quizSets"][0]["questions"][0]["options"][0]["isCorrect"] = json!(false);

        for validator in [Validator::strict(), Validator::submission()] {
            let err = validator.validate(ContentKind::Quiz, &value).unwrap_err();
            assert_eq!(
                err,
                ValidationError::NoCorrectOption {
                    set: 1,
                    question: 1
                }
            );
        }
    }

    #[test]
    fn string_true_does_not_count_as_correct() {
        let mut value = physics_quiz();
        value["quizSets"][0]["questions"][0]["options"][0]["isCorrect"] = json!("true");
        let err = Validator::strict()
            .validate(ContentKind::Quiz, &value)
            .unwrap_err();
        assert!(matches!(err, ValidationError::NoCorrectOption { .. }));
    }

    #[test]
    fn single_option_question_is_rejected() {
        let mut value = physics_quiz();
        value["quizSets"][0]["questions"][0]["options"] =
            json!([{"text": "Newton", "isCorrect": true}]);
        let err = Validator::strict()
            .validate(ContentKind::Quiz, &value)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooFewOptions {
                set: 1,
                question: 1
            }
        );
    }

    #[test]
    fn first_violation_wins() {
        let value = json!({
            "quizSets": [
                {"subject": "Physics", "topic": "", "questions": []},
                {"subject": "", "topic": "Optics", "questions": []}
            ]
        });
        let err = Validator::strict()
            .validate(ContentKind::Quiz, &value)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                set: 1,
                field: "topic"
            }
        );
    }

    #[test]
    fn empty_card_side_depends_on_strictness() {
        let value = json!({
            "flashcardSets": [{
                "subject": "Biology",
                "topic": "Cells",
                "cards": [{"front": "Powerhouse?", "back": "  "}]
            }]
        });

        let err = Validator::strict()
            .validate(ContentKind::Flashcard, &value)
            .unwrap_err();
        assert_eq!(err.to_string(), "Set 1, card 1: \"back\" must not be empty");

        assert!(
            Validator::submission()
                .validate(ContentKind::Flashcard, &value)
                .is_ok()
        );
    }

    #[test]
    fn non_object_card_is_rejected_in_submission_mode() {
        let value = json!({
            "flashcardSets": [{"subject": "Biology", "topic": "Cells", "cards": ["loose"]}]
        });
        let err = Validator::submission()
            .validate(ContentKind::Flashcard, &value)
            .unwrap_err();
        assert_eq!(err, ValidationError::CardNotObject { set: 1, card: 1 });
    }

    #[test]
    fn non_text_card_side_is_rejected_in_both_modes() {
        let value = json!({
            "flashcardSets": [{
                "subject": "Biology",
                "topic": "Cells",
                "cards": [
                    {"front": "Powerhouse?", "back": "Mitochondria"},
                    {"front": 5, "back": "x"}
                ]
            }]
        });

        for validator in [Validator::strict(), Validator::submission()] {
            let err = validator
                .validate(ContentKind::Flashcard, &value)
                .unwrap_err();
            assert_eq!(
                err,
                ValidationError::CardSideNotText {
                    set: 1,
                    card: 2,
                    side: "front"
                }
            );
        }

        let null_back = json!({
            "flashcardSets": [{"subject": "Biology", "topic": "Cells", "cards": [{"front": "Q", "back": null}]}]
        });
        let err = Validator::submission()
            .validate(ContentKind::Flashcard, &null_back)
            .unwrap_err();
        assert_eq!(err.to_string(), "Set 1, card 1: \"back\" must be text");
    }

    #[test]
    fn set_limit_is_enforced() {
        let set = json!({"subject": "Biology", "topic": "Cells", "cards": [{"front": "a", "back": "b"}]});
        let value = json!({ "flashcardSets": [set.clone(), set.clone(), set] });
        let err = Validator::strict()
            .with_max_sets(2)
            .validate(ContentKind::Flashcard, &value)
            .unwrap_err();
        assert_eq!(err, ValidationError::TooManySets { count: 3, max: 2 });
    }

    #[test]
    fn empty_collection_is_rejected() {
        let err = Validator::submission()
            .validate(ContentKind::Quiz, &json!({"quizSets": []}))
            .unwrap_err();
        assert_eq!(err.to_string(), "No sets found in \"quizSets\"");
    }
}
