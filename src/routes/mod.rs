use std::sync::Arc;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::storage::MediaStore;
use crate::notify::Notifier;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;

pub mod auth;
pub mod milestones;
pub mod parents;
pub mod volunteers;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::validation(format!("Invalid request body: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        ApiError::validation(format!("Invalid path parameter: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::validation(format!("Invalid query string: {err}")).into()
    }));

    cfg.service(
        web::scope("/api/auth")
            .service(web::resource("/register").route(web::post().to(auth::register)))
            .service(web::resource("/login").route(web::post().to(auth::login))),
    )
    .service(
        web::scope("/api/parents")
            .service(web::resource("/dashboard/{parent_id}").route(web::get().to(parents::dashboard)))
            .service(web::resource("/milestones/{child_id}").route(web::get().to(parents::child_milestones)))
            .service(web::resource("/milestone/submit").route(web::post().to(parents::submit)))
            .service(web::resource("/milestone/submit-with-file").route(web::post().to(parents::submit_with_file)))
            .service(
                web::resource("/tickets")
                    .route(web::get().to(parents::list_tickets))
                    .route(web::post().to(parents::open_ticket)),
            )
            .service(web::resource("/tickets/{parent_id}").route(web::get().to(parents::parent_tickets))),
    )
    .service(
        web::scope("/api/volunteers")
            .service(web::resource("/dashboard").route(web::get().to(volunteers::dashboard)))
            .service(web::resource("/submissions").route(web::get().to(volunteers::submissions)))
            .service(web::resource("/submission/{id}").route(web::get().to(volunteers::submission)))
            .service(web::resource("/submission/{id}/review").route(web::post().to(volunteers::review)))
            .service(web::resource("/review/{id}").route(web::post().to(volunteers::legacy_review)))
            .service(web::resource("/statistics").route(web::get().to(volunteers::statistics)))
            .service(web::resource("/tickets/{ticket_id}/reply").route(web::post().to(volunteers::reply_ticket))),
    )
    .service(
        web::scope("/api/milestones")
            .service(web::resource("").route(web::get().to(milestones::list_milestones)))
            .service(web::resource("/milestones").route(web::get().to(milestones::list_milestones)))
            .service(web::resource("/children").route(web::get().to(milestones::list_children)))
            .service(web::resource("/children/{parent_id}").route(web::get().to(milestones::children_of_parent)))
            .service(web::resource("/milestone-status").route(web::post().to(milestones::legacy_submit)))
            .service(web::resource("/milestone-status/{child_id}").route(web::get().to(milestones::child_statuses))),
    )
    .route("/api/health", web::get().to(health))
    // no /api prefix so stored media URLs can be used directly in <img>/<video>
    .route("/media/{folder}/{file}", web::get().to(get_media));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub media: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

/// Identifies the caller for rate limiting.
pub(crate) fn client_key(req: &HttpRequest) -> String {
    req.connection_info().realip_remote_addr().unwrap_or("unknown").to_string()
}

pub(crate) fn limit(allowed: bool) -> Result<(), ApiError> {
    if allowed { Ok(()) } else { Err(ApiError::TooManyRequests) }
}

/// Required, non-blank text field.
pub(crate) fn required(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { status: "OK".into(), message: "Server is running".into() })
}

/// Serves blobs kept by the media store under `/media/<folder>/<file>`.
pub async fn get_media(data: web::Data<AppState>, path: web::Path<(String, String)>) -> Result<HttpResponse, ApiError> {
    let (folder, file) = path.into_inner();
    let (bytes, mime) = data.media.load(&format!("{folder}/{file}")).await?;
    Ok(HttpResponse::Ok().insert_header(("Content-Type", mime)).body(bytes))
}

/// Fallback for unknown routes.
pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::not_found("Route not found"))
}
