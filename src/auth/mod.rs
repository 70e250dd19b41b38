//! Authentication: password hashing, access tokens and the extractor that
//! guards protected routes.

pub mod extractors;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub use extractors::AuthenticatedUser;
pub use password::{hash_password, hash_password_blocking, verify_password, verify_password_blocking};
pub use token::{Claims, TokenService};

lazy_static! {
    // Letters, digits, underscores and hyphens.
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Address the account was registered with.
    #[validate(email)]
    pub email: String,
    /// Plain-text password, checked against the stored bcrypt hash.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// 3 to 32 characters from `[a-zA-Z0-9_-]`.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Must be a valid address not used by another account.
    #[validate(email)]
    pub email: String,
    /// 6 to 128 characters. Only its bcrypt hash is stored.
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Returned by login and registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// Id of the account the token was issued for.
    pub user_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let valid = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = LoginRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = LoginRequest {
            email: "test@example.com".to_string(),
            password: "123".to_string(),
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let register = |username: &str, password: &str| RegisterRequest {
            username: username.to_string(),
            email: "test@example.com".to_string(),
            password: password.to_string(),
        };

        assert!(register("test_user-123", "password123").validate().is_ok());
        assert!(register("test user!", "password123").validate().is_err());
        assert!(register("tu", "password123").validate().is_err());
        assert!(register(&"u".repeat(33), "password123").validate().is_err());
        assert!(register("test_user", &"p".repeat(129)).validate().is_err());
    }
}
