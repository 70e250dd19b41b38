//! Machine-readable API description plus Swagger UI and ReDoc pages that
//! render it.
//!
//! The document is derived from the `#[utoipa::path]` annotations on the
//! handlers. Paths are declared relative to the API prefix and moved under
//! the configured `API_V1_PREFIX` when the document is served.

use actix_web::{get, web, HttpResponse};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::tag::{Tag, TagBuilder};
use utoipa::{Modify, OpenApi};

use super::{auth, health, tasks, users, API_GROUPS, API_VERSION};
use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::config::Settings;
use crate::error::ErrorBody;
use crate::models::{Task, TaskInput, TaskPriority, TaskStatus, User};

/// Path of the OpenAPI document below the API prefix.
pub const OPENAPI_PATH: &str = "/openapi.json";

/// Paths served outside the API prefix.
const UNVERSIONED: &[&str] = &["/", "/health"];

#[derive(OpenApi)]
#[openapi(
    info(description = "Task manager API"),
    paths(
        health::root,
        health::health,
        auth::register,
        auth::login,
        users::me,
        tasks::get_tasks,
        tasks::create_task,
        tasks::get_task,
        tasks::update_task,
        tasks::delete_task,
    ),
    components(schemas(
        Task,
        TaskInput,
        TaskPriority,
        TaskStatus,
        User,
        LoginRequest,
        RegisterRequest,
        AuthResponse,
        ErrorBody,
        health::ApiInfo,
        health::HealthStatus,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn openapi_url(settings: &Settings) -> String {
    format!("{}{}", settings.api_v1_prefix, OPENAPI_PATH)
}

/// The OpenAPI document for the configured project name and prefix.
pub fn openapi_document(settings: &Settings) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = settings.project_name.clone();
    doc.info.version = API_VERSION.to_string();

    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| {
            if UNVERSIONED.contains(&path.as_str()) {
                (path, item)
            } else {
                (format!("{}{}", settings.api_v1_prefix, path), item)
            }
        })
        .collect();

    let mut tags = vec![tag("health", "Service identity and status")];
    tags.extend(API_GROUPS.iter().map(|group| tag(group.tag, group.description)));
    doc.tags = Some(tags);

    doc
}

fn tag(name: &str, description: &str) -> Tag {
    TagBuilder::new()
        .name(name)
        .description(Some(description))
        .build()
}

pub async fn openapi_json(settings: web::Data<Settings>) -> HttpResponse {
    HttpResponse::Ok().json(openapi_document(&settings))
}

#[get("/docs")]
pub async fn docs_page(settings: web::Data<Settings>) -> HttpResponse {
    let page = format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <title>{title} - Docs</title>
  <meta charset="utf-8">
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "{url}", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>"##,
        title = escape_html(&settings.project_name),
        url = openapi_url(&settings),
    );

    html(page)
}

#[get("/redoc")]
pub async fn redoc_page(settings: web::Data<Settings>) -> HttpResponse {
    let page = format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <title>{title} - ReDoc</title>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
</head>
<body>
  <redoc spec-url="{url}"></redoc>
  <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
</body>
</html>"##,
        title = escape_html(&settings.project_name),
        url = openapi_url(&settings),
    );

    html(page)
}

fn html(page: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
