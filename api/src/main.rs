//! An api for submitting team evidence and reviewing it.

#[macro_use]
extern crate rocket;

mod config;
mod helpers;

use clap::Parser;
use config::Cli;
use evidence_common::{CorrectEvidence, EvidenceRecord, EvidenceService, SubmitEvidence};
use helpers::{
    ApiCreatedResult, ApiError, ApiResult, CorsFairing, RequestTimingFairing, bad_request_error,
    internal_error, not_found_error, run_blocking,
};
use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::response::status::{Custom, NoContent};
use rocket::serde::json::{self, Json};
use rocket::{Build, Request, Rocket, State};
use rocket_prometheus::PrometheusMetrics;
use tracing_subscriber::EnvFilter;

type JsonBody<'r, T> = Result<Json<T>, json::Error<'r>>;

fn read_body<T>(body: JsonBody<'_, T>) -> Result<T, ApiError> {
    body.map(Json::into_inner)
        .map_err(|err| bad_request_error(format!("Invalid request body: {err}")))
}

#[get("/")]
fn index() -> &'static str {
    "Evidence backend running"
}

#[get("/evidence")]
async fn list_evidence(service: &State<EvidenceService>) -> ApiResult<Vec<EvidenceRecord>> {
    let service = service.inner().clone();
    run_blocking("Could not fetch evidence", move || service.list())
        .await
        .map(Json)
}

#[post("/evidence", data = "<body>")]
async fn submit_evidence(
    service: &State<EvidenceService>,
    body: JsonBody<'_, SubmitEvidence>,
) -> ApiCreatedResult<EvidenceRecord> {
    let submission = read_body(body)?;
    let service = service.inner().clone();
    let saved = run_blocking("Could not save evidence", move || {
        service.submit(submission)
    })
    .await?;
    Ok(Custom(Status::Created, Json(saved)))
}

#[put("/evidence/<id>/validate")]
async fn validate_evidence(
    service: &State<EvidenceService>,
    id: &str,
) -> ApiResult<EvidenceRecord> {
    let id = id.to_string();
    let service = service.inner().clone();
    run_blocking("Could not validate evidence", move || service.validate(&id))
        .await
        .map(Json)
}

#[put("/evidence/<id>/correct", data = "<body>")]
async fn correct_evidence(
    service: &State<EvidenceService>,
    id: &str,
    body: JsonBody<'_, CorrectEvidence>,
) -> ApiResult<EvidenceRecord> {
    let correction = read_body(body)?;
    let id = id.to_string();
    let service = service.inner().clone();
    run_blocking("Could not mark evidence for correction", move || {
        service.request_correction(&id, correction)
    })
    .await
    .map(Json)
}

/// CORS preflight. The headers themselves come from `CorsFairing`.
#[options("/<_..>")]
fn preflight() -> NoContent {
    NoContent
}

#[catch(404)]
fn not_found() -> ApiError {
    not_found_error("The requested resource could not be found.")
}

#[catch(default)]
fn default_catcher(status: Status, _request: &Request) -> ApiError {
    if status.code >= 500 {
        internal_error("Internal server error")
    } else {
        let mut err = bad_request_error(status.reason_lossy());
        err.0 = status;
        err
    }
}

/// Everything but the listener config and metrics, so tests can build it too.
fn build_rocket(
    rocket: Rocket<Build>,
    service: EvidenceService,
    cors: CorsFairing,
) -> Rocket<Build> {
    rocket
        .manage(service)
        .attach(RequestTimingFairing)
        .attach(cors)
        .attach(AdHoc::on_liftoff("Prepare evidence store", |rocket| {
            Box::pin(async move {
                let Some(service) = rocket.state::<EvidenceService>().cloned() else {
                    return;
                };
                match run_blocking("Could not prepare evidence store", move || {
                    service.prepare()
                })
                .await
                {
                    Ok(()) => tracing::info!("Evidence store ready"),
                    Err(_) => tracing::warn!(
                        "Evidence store unavailable, requests will fail until it is reachable"
                    ),
                }
            })
        }))
        .mount(
            "/",
            routes![
                index,
                list_evidence,
                submit_evidence,
                validate_evidence,
                correct_evidence,
                preflight
            ],
        )
        .register("/", catchers![not_found, default_catcher])
}

#[launch]
fn rocket() -> _ {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let figment = rocket::Config::figment()
        .merge(("port", cli.port))
        .merge(("address", cli.address));
    let service = EvidenceService::new(cli.build_store());
    let cors = CorsFairing::new(cli.cors_origin.clone());
    tracing::info!(port = cli.port, cors_origin = %cli.cors_origin, "Evidence backend starting");

    let prometheus = PrometheusMetrics::new();
    build_rocket(rocket::custom(figment), service, cors)
        .attach(prometheus.clone())
        .mount("/metrics", prometheus)
}
