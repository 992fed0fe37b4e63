use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ===== Response Envelopes =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

// ===== Academic Context =====

/// Study year an item of content is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcademicYear {
    FirstYear,
    SecondYear,
    ThirdYear,
    FourthYear,
}

impl AcademicYear {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicYear::FirstYear => "FIRST_YEAR",
            AcademicYear::SecondYear => "SECOND_YEAR",
            AcademicYear::ThirdYear => "THIRD_YEAR",
            AcademicYear::FourthYear => "FOURTH_YEAR",
        }
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcademicYear {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIRST_YEAR" => Ok(AcademicYear::FirstYear),
            "SECOND_YEAR" => Ok(AcademicYear::SecondYear),
            "THIRD_YEAR" => Ok(AcademicYear::ThirdYear),
            "FOURTH_YEAR" => Ok(AcademicYear::FourthYear),
            other => Err(format!("unknown academic year '{other}'")),
        }
    }
}

/// Semester an item of content is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Semester {
    FirstSemester,
    SecondSemester,
    ThirdSemester,
    FourthSemester,
    FifthSemester,
    SixthSemester,
    SeventhSemester,
    EighthSemester,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::FirstSemester => "FIRST_SEMESTER",
            Semester::SecondSemester => "SECOND_SEMESTER",
            Semester::ThirdSemester => "THIRD_SEMESTER",
            Semester::FourthSemester => "FOURTH_SEMESTER",
            Semester::FifthSemester => "FIFTH_SEMESTER",
            Semester::SixthSemester => "SIXTH_SEMESTER",
            Semester::SeventhSemester => "SEVENTH_SEMESTER",
            Semester::EighthSemester => "EIGHTH_SEMESTER",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIRST_SEMESTER" => Ok(Semester::FirstSemester),
            "SECOND_SEMESTER" => Ok(Semester::SecondSemester),
            "THIRD_SEMESTER" => Ok(Semester::ThirdSemester),
            "FOURTH_SEMESTER" => Ok(Semester::FourthSemester),
            "FIFTH_SEMESTER" => Ok(Semester::FifthSemester),
            "SIXTH_SEMESTER" => Ok(Semester::SixthSemester),
            "SEVENTH_SEMESTER" => Ok(Semester::SeventhSemester),
            "EIGHTH_SEMESTER" => Ok(Semester::EighthSemester),
            other => Err(format!("unknown semester '{other}'")),
        }
    }
}

/// The (university, degree, year, semester) tuple shared by every set in one import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AcademicContext {
    pub university: String,
    pub degree: String,
    pub year: AcademicYear,
    pub semester: Semester,
}

impl AcademicContext {
    /// Build a context from raw request fields, normalising the institution codes.
    pub fn new(
        university: &str,
        degree: &str,
        year: AcademicYear,
        semester: Semester,
    ) -> Result<Self, String> {
        let university = normalize_code(university)
            .ok_or_else(|| "University is required".to_string())?;
        let degree = normalize_code(degree).ok_or_else(|| "Degree is required".to_string())?;

        Ok(Self {
            university,
            degree,
            year,
            semester,
        })
    }
}

fn normalize_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}

// ===== Persisted Content =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub topic: String,
    pub unit_number: Option<i32>,
    pub university: String,
    pub degree: String,
    pub year: String,
    pub semester: String,
    pub is_premium: bool,
    pub required_tier: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
    pub option_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_text: String,
    pub explanation: Option<String>,
    pub question_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct FlashcardSet {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub topic: String,
    pub unit_number: Option<i32>,
    pub university: String,
    pub degree: String,
    pub year: String,
    pub semester: String,
    pub is_premium: bool,
    pub required_tier: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct FlashcardItem {
    pub id: Uuid,
    pub set_id: Uuid,
    pub front: String,
    pub back: String,
    pub card_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlashcardSetDetail {
    #[serde(flatten)]
    pub set: FlashcardSet,
    pub cards: Vec<FlashcardItem>,
}
