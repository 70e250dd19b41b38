use actix_web::{get, web, HttpResponse, Responder};

use super::RouteGroup;
use crate::{
    auth::AuthenticatedUser,
    db::Database,
    error::{AppError, ErrorBody},
    models::User,
};

pub const GROUP: RouteGroup = RouteGroup {
    prefix: "/users",
    tag: "users",
    description: "User accounts",
    configure,
};

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(me);
}

/// Returns the caller's profile.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "The authenticated user", body = User),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "The account no longer exists", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
#[get("/me")]
pub async fn me(
    db: web::Data<Database>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let AuthenticatedUser(user_id) = user;

    let profile = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let profile: Option<User> = sqlx::query_as(
                    "SELECT id, username, email, created_at FROM users WHERE id = $1",
                )
                .bind(user_id)
                .fetch_optional(session.conn())
                .await?;
                Ok::<_, AppError>(profile)
            })
        })
        .await?;

    profile
        .map(|profile| HttpResponse::Ok().json(profile))
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
