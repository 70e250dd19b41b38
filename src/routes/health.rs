use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use utoipa::ToSchema;

use super::API_VERSION;
use crate::db::{Database, SessionFactory, SessionSource};

/// Reported in the `framework` field of `GET /`.
pub const FRAMEWORK: &str = "Stackpole Consulting AI Agent Best Practices";

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiInfo {
    #[schema(example = "Task Manager API")]
    pub message: &'static str,
    #[schema(example = "1.0.0")]
    pub version: &'static str,
    /// Path of the interactive API docs.
    pub docs: &'static str,
    pub framework: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    /// `healthy` or `degraded`.
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// `connected` or `disconnected`.
    #[schema(example = "connected")]
    pub database: &'static str,
}

/// API information
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service identity", body = ApiInfo))
)]
#[get("/")]
pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(ApiInfo {
        message: "Task Manager API",
        version: API_VERSION,
        docs: "/docs",
        framework: FRAMEWORK,
    })
}

/// Health check
///
/// Reports `healthy`/`connected` when the database answers, otherwise 503
/// with `degraded`/`disconnected`. Never fails itself.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = HealthStatus)
    )
)]
#[get("/health")]
pub async fn health(db: web::Data<Database>) -> HttpResponse {
    database_health(&db).await
}

pub async fn database_health<S: SessionSource>(db: &SessionFactory<S>) -> HttpResponse {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthStatus {
            status: "healthy",
            database: "connected",
        }),
        Err(e) => {
            log::warn!("health check: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthStatus {
                status: "degraded",
                database: "disconnected",
            })
        }
    }
}
