use actix_web::{post, web, HttpResponse, Responder};
use validator::Validate;

use super::RouteGroup;
use crate::{
    auth::{
        hash_password_blocking, verify_password_blocking, AuthResponse, LoginRequest,
        RegisterRequest, TokenService,
    },
    db::Database,
    error::{AppError, ErrorBody},
    models::Credentials,
};

pub const GROUP: RouteGroup = RouteGroup {
    prefix: "/auth",
    tag: "authentication",
    description: "Account registration and login",
    configure,
};

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login);
}

/// Register a new user
///
/// Creates the account and returns a token for it.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Email or username already in use", body = ErrorBody),
        (status = 422, description = "Invalid username, email or password", body = ErrorBody),
        (status = 503, description = "Database unavailable", body = ErrorBody)
    )
)]
#[post("/register")]
pub async fn register(
    db: web::Data<Database>,
    tokens: web::Data<TokenService>,
    payload: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    payload.validate()?;
    let RegisterRequest {
        username,
        email,
        password,
    } = payload.into_inner();

    let password_hash = hash_password_blocking(password).await?;

    let user_id = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let taken: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                    .bind(&email)
                    .fetch_optional(session.conn())
                    .await?;
                if taken.is_some() {
                    return Err(AppError::BadRequest("Email already registered".into()));
                }

                let (id,): (i32,) = sqlx::query_as(
                    "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(&username)
                .bind(&email)
                .bind(&password_hash)
                .fetch_one(session.conn())
                .await
                .map_err(|e| unique_violation_error(&e).unwrap_or_else(|| AppError::from(e)))?;

                Ok::<i32, AppError>(id)
            })
        })
        .await?;

    log::info!("registered user {}", user_id);
    let token = tokens.issue(user_id)?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user_id }))
}

/// Login user
///
/// Checks the password and returns a fresh token. Unknown email and wrong
/// password produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 422, description = "Malformed email or password", body = ErrorBody),
        (status = 503, description = "Database unavailable", body = ErrorBody)
    )
)]
#[post("/login")]
pub async fn login(
    db: web::Data<Database>,
    tokens: web::Data<TokenService>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    payload.validate()?;
    let LoginRequest { email, password } = payload.into_inner();

    let credentials = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let credentials: Option<Credentials> =
                    sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
                        .bind(&email)
                        .fetch_optional(session.conn())
                        .await?;
                Ok::<_, AppError>(credentials)
            })
        })
        .await?;

    let Some(credentials) = credentials else {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };
    if !verify_password_blocking(password, credentials.password_hash).await? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = tokens.issue(credentials.id)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user_id: credentials.id,
    }))
}

// Two registrations can race past the email check. The violated constraint
// says which field collided.
fn unique_violation_error(err: &sqlx::Error) -> Option<AppError> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }

    let message = match db_err.constraint() {
        Some(constraint) if constraint.contains("email") => "Email already registered",
        Some(constraint) if constraint.contains("username") => "Username already taken",
        _ => "Account already exists",
    };
    Some(AppError::BadRequest(message.into()))
}
