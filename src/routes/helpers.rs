//! Shared helper functions for Rocket route handlers.

use crate::error::ApiError;
use crate::models::{
    FlashcardItem, FlashcardSet, FlashcardSetDetail, Question, QuestionOption,
    QuestionWithOptions, Quiz, QuizDetail,
};
use rocket_db_pools::sqlx::{self, PgConnection};
use std::collections::HashMap;
use uuid::Uuid;

/// Load a quiz with its questions and options in stored order.
///
/// Returns [`ApiError::NotFound`] when the quiz does not exist.
pub async fn load_quiz_detail(conn: &mut PgConnection, id: Uuid) -> Result<QuizDetail, ApiError> {
    let quiz: Quiz = sqlx::query_as(
        r#"SELECT id, title, description, subject, topic, unit_number,
                  university, degree, year, semester,
                  is_premium, required_tier, is_published, created_at
           FROM quizzes
           WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Quiz '{id}' not found")))?;

    let questions: Vec<Question> = sqlx::query_as(
        r#"SELECT id, quiz_id, question_text, explanation, question_order
           FROM questions
           WHERE quiz_id = $1
           ORDER BY question_order ASC"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let options: Vec<QuestionOption> = sqlx::query_as(
        r#"SELECT o.id, o.question_id, o.option_text, o.is_correct, o.option_order
           FROM question_options o
           JOIN questions q ON q.id = o.question_id
           WHERE q.quiz_id = $1
           ORDER BY q.question_order ASC, o.option_order ASC"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_question: HashMap<Uuid, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    let questions = questions
        .into_iter()
        .map(|question| QuestionWithOptions {
            options: by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect();

    Ok(QuizDetail { quiz, questions })
}

/// Load a flashcard set with its cards in stored order.
pub async fn load_flashcard_set_detail(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<FlashcardSetDetail, ApiError> {
    let set: FlashcardSet = sqlx::query_as(
        r#"SELECT id, title, description, subject, topic, unit_number,
                  university, degree, year, semester,
                  is_premium, required_tier, is_published, created_at
           FROM flashcard_sets
           WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Flashcard set '{id}' not found")))?;

    let cards: Vec<FlashcardItem> = sqlx::query_as(
        r#"SELECT id, set_id, front, back, card_order
           FROM flashcard_items
           WHERE set_id = $1
           ORDER BY card_order ASC"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(FlashcardSetDetail { set, cards })
}
