//! Bearer token issue and validation (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret, at least 32 bytes.
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

/// Claims carried in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token generation failed: {0}")]
    Generation(String),
}

impl From<JwtError> for crate::error::AppError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => crate::error::AppError::TokenExpired,
            JwtError::Invalid(m) => crate::error::AppError::InvalidToken(m),
            JwtError::Generation(m) => crate::error::AppError::Internal(m),
        }
    }
}

#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("expiration_hours", &self.config.expiration_hours)
            .finish()
    }
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn expires_in_seconds(&self) -> i64 {
        self.config.expiration_hours * 3600
    }

    pub fn generate_token(&self, user_id: &str, email: &str, role: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        self.sign(Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: (now + Duration::hours(self.config.expiration_hours)).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        })
    }

    fn sign(&self, claims: Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Generation(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }

    /// Token from an `Authorization` header value.
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".into(),
            expiration_hours: 24,
            issuer: "storefront".into(),
        })
    }

    #[test]
    fn issues_and_validates_tokens() {
        let svc = service();
        let token = svc.generate_token("u-1", "owner@example.com", "store_owner").unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email, "owner@example.com");
        assert_eq!(claims.role, "store_owner");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_tokens_are_distinguished() {
        let svc = service();
        let past = Utc::now() - Duration::hours(3);
        let token = svc
            .sign(Claims {
                sub: "u-1".into(),
                email: "a@b.co".into(),
                role: "admin".into(),
                exp: (past + Duration::hours(1)).timestamp(),
                iat: past.timestamp(),
                iss: "storefront".into(),
            })
            .unwrap();
        assert!(matches!(svc.validate_token(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn foreign_signatures_are_invalid() {
        let other = JwtService::new(JwtConfig {
            secret: "another-secret-that-is-long-enough-for-it".into(),
            expiration_hours: 24,
            issuer: "storefront".into(),
        });
        let token = other.generate_token("u-1", "a@b.co", "admin").unwrap();
        assert!(matches!(service().validate_token(&token), Err(JwtError::Invalid(_))));
        assert!(matches!(service().validate_token("garbage"), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
    }
}
