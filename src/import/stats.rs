//! Import statistics tracking.

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rows created by an import, summed over committed chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportStats {
    /// Quizzes or flashcard sets created.
    pub sets: usize,
    pub questions: usize,
    pub options: usize,
    pub cards: usize,
}

impl ImportStats {
    /// Merge another ImportStats into this one by summing all counts.
    ///
    /// Used to combine statistics from multiple committed chunks.
    pub fn merge(&mut self, other: ImportStats) {
        self.sets += other.sets;
        self.questions += other.questions;
        self.options += other.options;
        self.cards += other.cards;
    }

    /// Remove rows that were created and later discarded.
    pub fn subtract(&mut self, other: ImportStats) {
        self.sets = self.sets.saturating_sub(other.sets);
        self.questions = self.questions.saturating_sub(other.questions);
        self.options = self.options.saturating_sub(other.options);
        self.cards = self.cards.saturating_sub(other.cards);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_and_subtract() {
        let mut total = ImportStats::default();
        total.merge(ImportStats {
            sets: 3,
            questions: 10,
            options: 40,
            cards: 0,
        });
        total.merge(ImportStats {
            sets: 1,
            questions: 2,
            options: 8,
            cards: 0,
        });
        assert_eq!(total.sets, 4);
        assert_eq!(total.options, 48);

        total.subtract(ImportStats {
            sets: 5,
            questions: 2,
            options: 8,
            cards: 1,
        });
        assert_eq!(total.sets, 0);
        assert_eq!(total.questions, 10);
        assert_eq!(total.cards, 0);
    }
}
