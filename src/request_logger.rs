use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Logs one line per request. Upload routes also report the declared body size.
pub struct RequestLogger;

struct RequestStart(Instant);

fn is_upload(request: &Request<'_>) -> bool {
    request.method() == rocket::http::Method::Post
        && request.uri().path().as_str().starts_with("/api/v1/imports")
}

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed_ms = request
            .local_cache(|| RequestStart(Instant::now()))
            .0
            .elapsed()
            .as_secs_f64()
            * 1000.0;

        if is_upload(request) {
            let body_bytes = request
                .headers()
                .get_one("Content-Length")
                .unwrap_or("?");
            log::info!(
                "{} {} [{} bytes] -> {} ({:.2}ms)",
                request.method(),
                request.uri(),
                body_bytes,
                response.status().code,
                elapsed_ms
            );
        } else {
            log::info!(
                "{} {} -> {} ({:.2}ms)",
                request.method(),
                request.uri(),
                response.status().code,
                elapsed_ms
            );
        }
    }
}
