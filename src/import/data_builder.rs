//! Row preparation for chunked imports.
//!
//! Turns typed content sets into parent rows plus columnar child data. Ids are
//! generated here so option rows can point at their question inside the same
//! batch insert, and order fields are assigned once, 1-based and contiguous.

use crate::import::data_structures::{
    CardsData, OptionsData, ParentRow, PreparedBatch, PreparedChildren, PreparedSet,
    QuestionsData, RejectedSet, SetLabel,
};
use crate::import::error::PrepareError;
use crate::import::payload::{
    FlashcardSetInput, ImportBatch, ImportOptions, QuestionInput, QuizSetInput,
};
use uuid::Uuid;

/// Build the display title for a set.
///
/// Precedence: the set's own title, then the batch title (single-set batches
/// only), then `Unit {n}: {subject}` when a unit number applies, then the subject.
pub fn derive_title(
    set_title: Option<&str>,
    subject: &str,
    unit_number: Option<i32>,
    options: &ImportOptions,
    batch_len: usize,
) -> String {
    if let Some(title) = non_blank(set_title) {
        return title;
    }

    if batch_len == 1 {
        if let Some(title) = non_blank(options.title.as_deref()) {
            return title;
        }
    }

    match unit_number {
        Some(unit) => format!("Unit {}: {}", unit, subject),
        None => subject.to_string(),
    }
}

/// Prepare every set of a batch. Sets that cannot be written are returned in
/// `rejected` instead of failing the batch.
pub fn prepare_batch(batch: &ImportBatch, options: &ImportOptions) -> PreparedBatch {
    let kind = batch.kind();
    let batch_len = batch.len();
    let mut sets = Vec::with_capacity(batch_len);
    let mut rejected = Vec::new();

    match batch {
        ImportBatch::Quiz(inputs) => {
            for (index, input) in inputs.iter().enumerate() {
                match prepare_quiz_set(index, input, options, batch_len) {
                    Ok(set) => sets.push(set),
                    Err(set) => rejected.push(set),
                }
            }
        }
        ImportBatch::Flashcard(inputs) => {
            for (index, input) in inputs.iter().enumerate() {
                match prepare_flashcard_set(index, input, options, batch_len) {
                    Ok(set) => sets.push(set),
                    Err(set) => rejected.push(set),
                }
            }
        }
    }

    log::debug!(
        "prepared {} {} sets ({} rejected before writing)",
        sets.len(),
        kind,
        rejected.len()
    );

    PreparedBatch {
        kind,
        sets,
        rejected,
    }
}

fn parent_row(
    subject: &str,
    topic: &str,
    title: Option<&str>,
    description: Option<&str>,
    set_unit: Option<i32>,
    options: &ImportOptions,
    batch_len: usize,
) -> ParentRow {
    let subject = subject.trim().to_string();
    let unit_number = set_unit.or(options.unit_number);
    let title = derive_title(title, &subject, unit_number, options, batch_len);
    let description = non_blank(description).or_else(|| non_blank(options.description.as_deref()));

    ParentRow {
        id: Uuid::new_v4(),
        title,
        description,
        subject,
        topic: topic.trim().to_string(),
        unit_number,
    }
}

fn prepare_quiz_set(
    index: usize,
    input: &QuizSetInput,
    options: &ImportOptions,
    batch_len: usize,
) -> Result<PreparedSet, RejectedSet> {
    let parent = parent_row(
        &input.subject,
        &input.topic,
        input.title.as_deref(),
        input.description.as_deref(),
        input.unit_number,
        options,
        batch_len,
    );
    let label = label_for(index, &parent);

    let valid: Vec<&QuestionInput> = input
        .questions
        .iter()
        .filter(|question| is_writable_question(question))
        .collect();

    if valid.is_empty() {
        return Err(RejectedSet {
            label,
            error: PrepareError::NoValidQuestions,
        });
    }

    let (questions, question_options) = build_question_data(parent.id, &valid);

    Ok(PreparedSet {
        label,
        parent,
        children: PreparedChildren::Quiz {
            questions,
            options: question_options,
        },
    })
}

/// Questions the database invariants allow: text, two or more options and a
/// correct one. Submission validation already enforces this; the filter keeps
/// the writer honest when called directly.
fn is_writable_question(question: &QuestionInput) -> bool {
    !question.question.trim().is_empty()
        && question.options.len() >= 2
        && question.options.iter().any(|option| option.is_correct)
}

fn build_question_data(quiz_id: Uuid, questions: &[&QuestionInput]) -> (QuestionsData, OptionsData) {
    let mut question_data = QuestionsData::default();
    let mut option_data = OptionsData::default();

    for (q_index, question) in questions.iter().enumerate() {
        let question_id = Uuid::new_v4();
        question_data.ids.push(question_id);
        question_data.quiz_ids.push(quiz_id);
        question_data.texts.push(question.question.trim().to_string());
        question_data
            .explanations
            .push(non_blank(question.explanation.as_deref()));
        question_data.orders.push(q_index as i32 + 1);

        for (o_index, option) in question.options.iter().enumerate() {
            option_data.ids.push(Uuid::new_v4());
            option_data.question_ids.push(question_id);
            option_data.texts.push(option.text.trim().to_string());
            option_data.is_correct.push(option.is_correct);
            option_data.orders.push(o_index as i32 + 1);
        }
    }

    (question_data, option_data)
}

fn prepare_flashcard_set(
    index: usize,
    input: &FlashcardSetInput,
    options: &ImportOptions,
    batch_len: usize,
) -> Result<PreparedSet, RejectedSet> {
    let parent = parent_row(
        &input.subject,
        &input.topic,
        input.title.as_deref(),
        input.description.as_deref(),
        input.unit_number,
        options,
        batch_len,
    );
    let label = label_for(index, &parent);

    let mut cards = CardsData::default();
    for card in &input.cards {
        let front = card.front.trim();
        let back = card.back.trim();
        if front.is_empty() || back.is_empty() {
            continue;
        }

        cards.ids.push(Uuid::new_v4());
        cards.set_ids.push(parent.id);
        cards.fronts.push(front.to_string());
        cards.backs.push(back.to_string());
        cards.orders.push(cards.orders.len() as i32 + 1);
    }

    let dropped = input.cards.len() - cards.ids.len();
    if dropped > 0 {
        log::debug!(
            "set {} ({}): dropped {} flashcards with an empty side",
            index + 1,
            parent.subject,
            dropped
        );
    }

    if cards.ids.is_empty() {
        return Err(RejectedSet {
            label,
            error: PrepareError::NoValidFlashcards,
        });
    }

    Ok(PreparedSet {
        label,
        parent,
        children: PreparedChildren::Flashcard { cards },
    })
}

fn label_for(index: usize, parent: &ParentRow) -> SetLabel {
    SetLabel {
        index,
        subject: parent.subject.clone(),
        topic: parent.topic.clone(),
        title: parent.title.clone(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
