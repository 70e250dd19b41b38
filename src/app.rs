//! Application assembly: shared state, middleware, route registration and the
//! startup/shutdown sequence.

use std::io;
use std::net::TcpListener;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use thiserror::Error;

use crate::auth::TokenService;
use crate::config::{ConfigError, Settings};
use crate::db::{schema, Database, DbError, PgSessionSource};
use crate::error::{json_error_handler, query_error_handler};
use crate::routes::{self, docs, health};

/// Anything that stops the server from starting. `main` returns it, so the
/// process exits non-zero.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Components shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub settings: web::Data<Settings>,
    pub db: web::Data<Database>,
    pub tokens: web::Data<TokenService>,
}

impl AppState {
    pub fn new(settings: Settings, db: Database) -> Self {
        let tokens = TokenService::from_settings(&settings);
        Self {
            settings: web::Data::new(settings),
            db: web::Data::new(db),
            tokens: web::Data::new(tokens),
        }
    }
}

/// Registers shared data, the unversioned endpoints and every API group.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let openapi_url = docs::openapi_url(&state.settings);

    cfg.app_data(state.settings.clone())
        .app_data(state.db.clone())
        .app_data(state.tokens.clone())
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health::root)
        .service(health::health)
        .service(docs::docs_page)
        .service(docs::redoc_page)
        .route(&openapi_url, web::get().to(docs::openapi_json));

    routes::configure_api(cfg, &state.settings.api_v1_prefix);
}

/// CORS policy: configured origins (`*` allows any), all methods and
/// headers, credentials allowed.
pub fn cors(settings: &Settings) -> Cors {
    let mut cors = Cors::default();
    for origin in &settings.allowed_origins {
        cors = if origin == "*" {
            cors.allow_any_origin()
        } else {
            cors.allowed_origin(origin)
        };
    }

    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

/// Builds the server on an already bound listener. The returned [`Server`]
/// does nothing until awaited.
pub fn build_server(listener: TcpListener, state: AppState) -> io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(&state.settings))
            .wrap(Logger::default())
            .configure(|cfg| configure(cfg, &state))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Creates the pool and runs the server until it is shut down. The pool is
/// disposed on every exit path once it exists.
pub async fn launch(settings: Settings) -> Result<(), StartupError> {
    let db = Database::new(PgSessionSource::from_settings(&settings)?);
    let state = AppState::new(settings, db.clone());

    let outcome = serve(state).await;

    db.dispose_pool().await;
    log::info!("database pool disposed");
    outcome
}

async fn serve(state: AppState) -> Result<(), StartupError> {
    if state.settings.auto_create_schema {
        schema::create_all(&state.db).await?;
        log::info!("database schema is up to date");
    }

    let address = state.settings.server_address();
    let listener = TcpListener::bind(&address)?;
    log::info!(
        "{} listening on http://{}",
        state.settings.project_name,
        address
    );

    build_server(listener, state)?.await?;
    log::info!("server stopped");
    Ok(())
}
