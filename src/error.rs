use crate::credentials::CredentialError;
use crate::import::error::{ChunkError, ImportError};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    BadRequest(String),
    /// The upload was rejected before any row was written.
    Validation(String),
    /// The database could not be reached in time.
    Unavailable(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    kind: &'static str,
    error: String,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                Status::InternalServerError
            }
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Validation(_) => Status::UnprocessableEntity,
            ApiError::Unavailable(_) => Status::ServiceUnavailable,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let (kind, message) = match self {
            ApiError::DatabaseError(e) => {
                log::error!("database error: {}", e);
                ("DatabaseError", e.to_string())
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                ("NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                ("BadRequest", msg)
            }
            ApiError::Validation(msg) => {
                log::info!("import rejected: {}", msg);
                ("ValidationError", msg)
            }
            ApiError::Unavailable(msg) => {
                log::error!("database unavailable: {}", msg);
                ("Unavailable", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                ("InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            success: false,
            kind,
            error: message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"success":false,"kind":"SerializationError","error":"Failed to serialize error"}"#
                .to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_generator: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Malformed request body or parameters."),
            ("404", "The requested resource does not exist."),
            ("422", "The upload failed validation; nothing was written."),
            ("500", "Unexpected server or database error."),
            ("503", "The database could not be reached in time."),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ApiError::Unavailable(err.to_string())
            }
            _ => ApiError::DatabaseError(err),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Validation(err) => ApiError::Validation(err.to_string()),
            ImportError::Unavailable(_) => ApiError::Unavailable(err.to_string()),
            ImportError::Compensation(ref cause) if cause.is_unavailable() => {
                ApiError::Unavailable(err.to_string())
            }
            ImportError::Compensation(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidOwner | CredentialError::EmptyKey => {
                ApiError::BadRequest(err.to_string())
            }
            CredentialError::Database(err) => err.into(),
        }
    }
}
