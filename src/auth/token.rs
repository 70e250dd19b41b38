use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::AppError;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies access tokens with the key, algorithm and lifetime
/// from [`Settings`].
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, algorithm: Algorithm, expire_hours: i64) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(expire_hours),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.secret_key,
            settings.algorithm,
            settings.access_token_expire_hours,
        )
    }

    /// Creates a signed token for `user_id`, valid for the configured number
    /// of hours.
    pub fn issue(&self, user_id: i32) -> Result<String, AppError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::InternalServerError("Token expiry out of range".into()))?;

        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks signature, algorithm and expiry, returning the claims.
    ///
    /// Any failure is reported as `AppError::Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(self.algorithm))
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test_secret_for_tokens", Algorithm::HS256, 24)
    }

    #[test]
    fn test_token_generation_and_verification() {
        let tokens = service();
        let token = tokens.issue(7).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_token_expiration() {
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: 2,
            iat: (past - Duration::hours(1)).timestamp(),
            exp: past.timestamp(),
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret_for_tokens"),
        )
        .unwrap();

        match service().verify(&expired) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("ExpiredSignature"), "{}", msg),
            other => panic!("expired token accepted: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let foreign = TokenService::new("a_completely_different_secret", Algorithm::HS256, 24)
            .issue(1)
            .unwrap();

        assert!(matches!(
            service().verify(&foreign),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_algorithm_mismatch_is_rejected() {
        let hs512 = TokenService::new("test_secret_for_tokens", Algorithm::HS512, 24)
            .issue(1)
            .unwrap();

        assert!(matches!(
            service().verify(&hs512),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            service().verify("not.a.token"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
