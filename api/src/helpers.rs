//! Some helper functions for the API.

use evidence_common::EvidenceError;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::Response;
use rocket::response::status as rocket_status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::tokio::task::spawn_blocking;
use std::time::Instant;

/// When the request reached the server. Cached per request.
struct RequestStart(Instant);

/// Logs one line per request once the response is ready.
/// Server errors log at warn, metrics scrapes at debug.
#[derive(Clone, Copy)]
pub struct RequestTimingFairing;

#[rocket::async_trait]
impl Fairing for RequestTimingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request timing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _data: &mut rocket::Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let RequestStart(started) = request.local_cache(|| RequestStart(Instant::now()));
        let elapsed_ms = started.elapsed().as_millis();
        let status = response.status();
        let path = request.uri().path();

        if status.class().is_server_error() {
            tracing::warn!(
                method = %request.method(),
                %path,
                status = status.code,
                elapsed_ms,
                "Request failed"
            );
        } else if path.as_str().starts_with("/metrics") {
            tracing::debug!(status = status.code, elapsed_ms, "Metrics scraped");
        } else {
            tracing::info!(
                method = %request.method(),
                %path,
                status = status.code,
                elapsed_ms,
                "Request completed"
            );
        }
    }
}

/// Adds CORS headers for the review frontend.
/// `allow_origin` is `*` unless a single frontend origin is configured.
#[derive(Clone, Debug)]
pub struct CorsFairing {
    allow_origin: String,
}

impl CorsFairing {
    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
        }
    }

    pub fn any() -> Self {
        Self::new("*")
    }
}

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new(
            "Access-Control-Allow-Origin",
            self.allow_origin.clone(),
        ));
        if self.allow_origin != "*" {
            response.set_header(Header::new("Vary", "Origin"));
        }
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiErrorBody {
    pub error: ApiErrorKind,
    pub message: String,
}

impl ApiErrorBody {
    fn new(error: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

pub type ApiError = rocket_status::Custom<Json<ApiErrorBody>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;
pub type ApiCreatedResult<T> = Result<rocket_status::Custom<Json<T>>, ApiError>;

fn api_error(status: Status, kind: ApiErrorKind, message: impl Into<String>) -> ApiError {
    rocket_status::Custom(status, Json(ApiErrorBody::new(kind, message)))
}

pub fn not_found_error(message: impl Into<String>) -> ApiError {
    api_error(Status::NotFound, ApiErrorKind::NotFound, message)
}

pub fn bad_request_error(message: impl Into<String>) -> ApiError {
    api_error(Status::BadRequest, ApiErrorKind::BadRequest, message)
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    api_error(Status::InternalServerError, ApiErrorKind::Internal, message)
}

/// Map a service failure to a response. Store details are logged by the
/// service; the caller only sees `public_message`.
pub fn evidence_error(err: EvidenceError, public_message: &str) -> ApiError {
    match err {
        EvidenceError::Validation(message) => bad_request_error(message),
        EvidenceError::NotFound(id) => not_found_error(format!("Evidence {id} not found")),
        EvidenceError::Persistence(_) => internal_error(public_message),
    }
}

/// Run a blocking service call off the async workers.
pub async fn run_blocking<T, F>(public_message: &str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, EvidenceError> + Send + 'static,
    T: Send + 'static,
{
    match spawn_blocking(f).await {
        Ok(result) => result.map_err(|err| evidence_error(err, public_message)),
        Err(err) => {
            tracing::error!(error = %err, "Blocking task failed");
            Err(internal_error(public_message))
        }
    }
}
