//! HTTP route handlers grouped by resource.
//!
//! Handlers are annotated with `#[openapi]` so `rocket_okapi` can derive
//! the OpenAPI document served next to the Swagger UI.

pub mod catchers;
pub mod credentials;
pub mod flashcards;
pub mod health;
pub(crate) mod helpers;
pub mod imports;
pub mod quizzes;
