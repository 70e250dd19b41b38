use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Public view of an account; the password hash never leaves the database
/// layer.
#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Eq, ToSchema)]
pub struct User {
    pub id: i32,
    /// Unique login name.
    pub username: String,
    /// Unique address the account logs in with.
    pub email: String,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// Row used to check a login attempt.
#[derive(Debug, FromRow)]
pub struct Credentials {
    pub id: i32,
    pub password_hash: String,
}
