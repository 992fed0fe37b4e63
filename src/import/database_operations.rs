//! Batch database insert operations.
//!
//! Parent rows are inserted one at a time; child rows use PostgreSQL's UNNEST
//! so each table costs one round trip per set. Every function runs on the
//! connection of the caller's transaction.

use crate::import::data_structures::{CardsData, OptionsData, ParentRow, QuestionsData};
use crate::import::payload::ImportOptions;
use crate::models::AcademicContext;
use rocket_db_pools::sqlx::{self, PgConnection};
use uuid::Uuid;

/// Insert one quiz row carrying the batch's academic context and flags.
pub async fn insert_quiz(
    conn: &mut PgConnection,
    parent: &ParentRow,
    context: &AcademicContext,
    options: &ImportOptions,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO quizzes (
            id, title, description, subject, topic, unit_number,
            university, degree, year, semester,
            is_premium, required_tier, is_published
           )
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
    )
    .bind(parent.id)
    .bind(&parent.title)
    .bind(&parent.description)
    .bind(&parent.subject)
    .bind(&parent.topic)
    .bind(parent.unit_number)
    .bind(&context.university)
    .bind(&context.degree)
    .bind(context.year.as_str())
    .bind(context.semester.as_str())
    .bind(options.is_premium)
    .bind(options.effective_tier())
    .bind(options.is_published)
    .execute(&mut *conn)
    .await?;

    log::trace!("inserted quiz {} ({})", parent.id, parent.title);
    Ok(())
}

/// Insert one flashcard set row carrying the batch's academic context and flags.
pub async fn insert_flashcard_set(
    conn: &mut PgConnection,
    parent: &ParentRow,
    context: &AcademicContext,
    options: &ImportOptions,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO flashcard_sets (
            id, title, description, subject, topic, unit_number,
            university, degree, year, semester,
            is_premium, required_tier, is_published
           )
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
    )
    .bind(parent.id)
    .bind(&parent.title)
    .bind(&parent.description)
    .bind(&parent.subject)
    .bind(&parent.topic)
    .bind(parent.unit_number)
    .bind(&context.university)
    .bind(&context.degree)
    .bind(context.year.as_str())
    .bind(context.semester.as_str())
    .bind(options.is_premium)
    .bind(options.effective_tier())
    .bind(options.is_published)
    .execute(&mut *conn)
    .await?;

    log::trace!("inserted flashcard set {} ({})", parent.id, parent.title);
    Ok(())
}

/// Insert all questions of one quiz.
///
/// # Returns
/// Number of question rows inserted
pub async fn insert_questions_batch(
    conn: &mut PgConnection,
    data: &QuestionsData,
) -> Result<usize, sqlx::Error> {
    if data.ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO questions (id, quiz_id, question_text, explanation, question_order)
           SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::int[])"#,
    )
    .bind(&data.ids)
    .bind(&data.quiz_ids)
    .bind(&data.texts)
    .bind(&data.explanations)
    .bind(&data.orders)
    .execute(&mut *conn)
    .await?;

    let inserted = result.rows_affected() as usize;
    log::trace!("bulk inserted {} questions", inserted);
    Ok(inserted)
}

/// Insert all options of one quiz. Questions must already exist.
///
/// # Returns
/// Number of option rows inserted
pub async fn insert_options_batch(
    conn: &mut PgConnection,
    data: &OptionsData,
) -> Result<usize, sqlx::Error> {
    if data.ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO question_options (id, question_id, option_text, is_correct, option_order)
           SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::bool[], $5::int[])"#,
    )
    .bind(&data.ids)
    .bind(&data.question_ids)
    .bind(&data.texts)
    .bind(&data.is_correct)
    .bind(&data.orders)
    .execute(&mut *conn)
    .await?;

    let inserted = result.rows_affected() as usize;
    log::trace!("bulk inserted {} options", inserted);
    Ok(inserted)
}

/// Insert all cards of one flashcard set.
///
/// # Returns
/// Number of card rows inserted
pub async fn insert_cards_batch(
    conn: &mut PgConnection,
    data: &CardsData,
) -> Result<usize, sqlx::Error> {
    if data.ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"INSERT INTO flashcard_items (id, set_id, front, back, card_order)
           SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::int[])"#,
    )
    .bind(&data.ids)
    .bind(&data.set_ids)
    .bind(&data.fronts)
    .bind(&data.backs)
    .bind(&data.orders)
    .execute(&mut *conn)
    .await?;

    let inserted = result.rows_affected() as usize;
    log::trace!("bulk inserted {} flashcards", inserted);
    Ok(inserted)
}

/// Delete quizzes by id; questions and options cascade.
pub async fn delete_quizzes(conn: &mut PgConnection, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM quizzes WHERE id = ANY($1)")
        .bind(ids)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete flashcard sets by id; cards cascade.
pub async fn delete_flashcard_sets(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM flashcard_sets WHERE id = ANY($1)")
        .bind(ids)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
