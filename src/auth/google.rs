//! Federated sign-in: verify a Google ID token and return the identity it asserts.

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, AppError>;
}

/// Fields of Google's tokeninfo response that we check.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl TokenInfo {
    fn into_identity(self, client_id: &str) -> Result<FederatedIdentity, AppError> {
        if self.aud != client_id {
            return Err(AppError::InvalidToken("token audience mismatch".into()));
        }
        if self.email_verified.as_deref() != Some("true") {
            return Err(AppError::InvalidToken("email not verified".into()));
        }
        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::InvalidToken("token has no email".into()))?;
        Ok(FederatedIdentity {
            subject: self.sub,
            email,
            name: self.name,
            picture: self.picture,
        })
    }
}

pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: Option<String>,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, AppError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Google sign-in is not configured".into()))?;
        let resp = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("google tokeninfo: {}", e)))?;
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "google rejected id token");
            return Err(AppError::InvalidToken("Google token rejected".into()));
        }
        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| AppError::InvalidToken(format!("unreadable tokeninfo: {}", e)))?;
        info.into_identity(client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: Option<&str>, email: Option<&str>) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            sub: "1234".into(),
            email: email.map(String::from),
            email_verified: verified.map(String::from),
            name: Some("Ann".into()),
            picture: None,
        }
    }

    #[test]
    fn accepts_verified_token_for_our_client() {
        let id = info("client-1", Some("true"), Some("Ann@Example.com")).into_identity("client-1").unwrap();
        assert_eq!(id.email, "ann@example.com");
        assert_eq!(id.subject, "1234");
    }

    #[test]
    fn rejects_other_audience_or_unverified_email() {
        assert!(info("client-2", Some("true"), Some("a@b.co")).into_identity("client-1").is_err());
        assert!(info("client-1", Some("false"), Some("a@b.co")).into_identity("client-1").is_err());
        assert!(info("client-1", Some("true"), None).into_identity("client-1").is_err());
    }
}
