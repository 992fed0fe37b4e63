//! JSON catchers so guard failures use the same error envelope as handlers.

use crate::error::ApiError;
use rocket::{Catcher, Request};

#[catch(400)]
fn bad_request(req: &Request<'_>) -> ApiError {
    ApiError::BadRequest(format!("Malformed request to {}", req.uri().path()))
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> ApiError {
    ApiError::NotFound(format!("No route for {} {}", req.method(), req.uri().path()))
}

// Rocket's JSON guard answers 422 when the body does not match the expected shape.
#[catch(422)]
fn unprocessable(_: &Request<'_>) -> ApiError {
    ApiError::Validation(
        "Request body is missing required fields or has fields of the wrong type".to_string(),
    )
}

pub fn all() -> Vec<Catcher> {
    catchers![bad_request, not_found, unprocessable]
}
