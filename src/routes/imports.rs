//! Bulk import endpoints.
//!
//! Uploads that pass validation always return 200 with an [`ImportSummary`],
//! even when some sets failed; callers read `success` and `results`. Uploads
//! that fail validation return 422 and write nothing.

use crate::error::ApiError;
use crate::import::payload::{ContentKind, ImportOptions, ImportRequest};
use crate::import::preview::ImportPreview;
use crate::import::report::ImportSummary;
use crate::import::service::ImportService;
use crate::import::store::PgContentStore;
use crate::models::{AcademicContext, AcademicYear, Semester};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Deserialize;

pub type PgImportService = ImportService<PgContentStore>;

/// Upload body shared by the quiz and flashcard endpoints.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportBody {
    /// The uploaded file's JSON text.
    pub json_data: String,
    pub university: String,
    pub degree: String,
    /// `FIRST_YEAR` through `FOURTH_YEAR`.
    pub year: String,
    /// `FIRST_SEMESTER` through `EIGHTH_SEMESTER`.
    pub semester: String,
    pub unit_number: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    pub required_tier: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl ImportBody {
    fn options(&self) -> ImportOptions {
        ImportOptions {
            unit_number: self.unit_number,
            title: non_blank(self.title.as_deref()),
            description: non_blank(self.description.as_deref()),
            is_premium: self.is_premium,
            required_tier: self.required_tier.clone(),
            is_published: self.is_published,
        }
    }

    fn into_request(self) -> Result<ImportRequest, ApiError> {
        let year: AcademicYear = self.year.parse().map_err(ApiError::Validation)?;
        let semester: Semester = self.semester.parse().map_err(ApiError::Validation)?;
        let context = AcademicContext::new(&self.university, &self.degree, year, semester)
            .map_err(ApiError::Validation)?;
        let options = self.options();

        Ok(ImportRequest {
            json_data: self.json_data,
            context,
            options,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

async fn run_import(
    service: &PgImportService,
    kind: ContentKind,
    body: ImportBody,
) -> Result<Json<ImportSummary>, ApiError> {
    let request = body.into_request()?;
    let summary = service.import(kind, &request).await?;
    Ok(Json(summary))
}

/// Import quiz sets from an uploaded JSON document
#[openapi(tag = "Imports")]
#[post("/imports/quizzes", data = "<body>")]
pub async fn import_quizzes(
    service: &State<PgImportService>,
    body: Json<ImportBody>,
) -> Result<Json<ImportSummary>, ApiError> {
    run_import(service, ContentKind::Quiz, body.into_inner()).await
}

/// Import flashcard sets from an uploaded JSON document
#[openapi(tag = "Imports")]
#[post("/imports/flashcards", data = "<body>")]
pub async fn import_flashcards(
    service: &State<PgImportService>,
    body: Json<ImportBody>,
) -> Result<Json<ImportSummary>, ApiError> {
    run_import(service, ContentKind::Flashcard, body.into_inner()).await
}

/// Preview request: the upload plus the batch overrides that affect titles.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBody {
    pub kind: ContentKind,
    pub json_data: String,
    /// Reject empty flashcard sides instead of skipping them. Defaults to true.
    pub strict: Option<bool>,
    pub unit_number: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Validate an upload and describe what it would create, without writing
#[openapi(tag = "Imports")]
#[post("/imports/preview", data = "<body>")]
pub fn preview_import(
    service: &State<PgImportService>,
    body: Json<PreviewBody>,
) -> Json<ImportPreview> {
    let body = body.into_inner();
    let options = ImportOptions {
        unit_number: body.unit_number,
        title: non_blank(body.title.as_deref()),
        description: non_blank(body.description.as_deref()),
        ..Default::default()
    };

    let preview = service.preview(
        body.kind,
        &body.json_data,
        &options,
        body.strict.unwrap_or(true),
    );
    Json(preview)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> ImportBody {
        ImportBody {
            json_data: "{}".into(),
            university: " medicaps ".into(),
            degree: "btech_cse".into(),
            year: "first_year".into(),
            semester: "FIRST_SEMESTER".into(),
            unit_number: Some(2),
            title: Some("   ".into()),
            description: None,
            is_premium: true,
            required_tier: Some("pro".into()),
            is_published: false,
        }
    }

    #[test]
    fn body_builds_a_normalised_request() {
        let request = body().into_request().unwrap();
        assert_eq!(request.context.university, "MEDICAPS");
        assert_eq!(request.context.year, AcademicYear::FirstYear);
        assert_eq!(request.options.title, None);
        assert_eq!(request.options.effective_tier().as_deref(), Some("PRO"));
    }

    #[test]
    fn unknown_semester_is_a_validation_error() {
        let mut body = body();
        body.semester = "NINTH_SEMESTER".into();
        assert!(matches!(body.into_request(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn body_accepts_camel_case_json() {
        let parsed: ImportBody = serde_json::from_str(
            r#"{"jsonData": "{}", "university": "U", "degree": "D",
                "year": "SECOND_YEAR", "semester": "THIRD_SEMESTER", "unitNumber": 3}"#,
        )
        .unwrap();
        assert_eq!(parsed.unit_number, Some(3));
        assert!(!parsed.is_premium);
        assert!(!parsed.is_published);
    }
}
