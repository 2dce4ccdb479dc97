//! Google sign-in: ID tokens are verified against the tokeninfo endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ServiceError;

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, ServiceError>;
}

/// Tokeninfo reports booleans as strings ("true") for some token kinds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_true(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<Flag>,
    name: Option<String>,
}

/// Audience and verified-email checks on a tokeninfo payload.
pub fn check_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, ServiceError> {
    if info.aud != client_id {
        return Err(ServiceError::Unauthorized("google token issued for another client".into()));
    }
    if !info.email_verified.as_ref().map(Flag::is_true).unwrap_or(false) {
        return Err(ServiceError::Unauthorized("google email not verified".into()));
    }
    let email = info.email.filter(|e| !e.is_empty()).ok_or_else(|| ServiceError::Unauthorized("google token has no email".into()))?;
    Ok(GoogleIdentity { email: email.to_lowercase(), name: info.name.unwrap_or_default() })
}

pub struct GoogleTokenInfoClient {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: String,
}

impl GoogleTokenInfoClient {
    pub fn new(cfg: &configs::GoogleConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Self { client, tokeninfo_url: cfg.tokeninfo_url.clone(), client_id: cfg.client_id.clone() })
    }
}

#[async_trait]
impl GoogleVerifier for GoogleTokenInfoClient {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, ServiceError> {
        if self.client_id.is_empty() {
            return Err(ServiceError::Validation("google sign-in is not configured".into()));
        }
        let resp = self.client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(format!("google tokeninfo: {e}")))?;
        if resp.status().is_client_error() {
            debug!(status = %resp.status(), "google rejected id token");
            return Err(ServiceError::Unauthorized("invalid google token".into()));
        }
        if !resp.status().is_success() {
            return Err(ServiceError::Upstream(format!("google tokeninfo returned {}", resp.status())));
        }
        let info: TokenInfo = resp.json().await.map_err(|e| ServiceError::Upstream(format!("google tokeninfo: {e}")))?;
        check_token_info(info, &self.client_id)
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;

    /// Maps fixed token strings to identities; any other token is rejected.
    #[derive(Default)]
    pub struct StaticGoogleVerifier {
        pub tokens: HashMap<String, GoogleIdentity>,
    }

    impl StaticGoogleVerifier {
        pub fn with(token: &str, email: &str, name: &str) -> Self {
            let mut tokens = HashMap::new();
            tokens.insert(token.to_string(), GoogleIdentity { email: email.into(), name: name.into() });
            Self { tokens }
        }
    }

    #[async_trait]
    impl GoogleVerifier for StaticGoogleVerifier {
        async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, ServiceError> {
            self.tokens.get(id_token).cloned().ok_or_else(|| ServiceError::Unauthorized("invalid google token".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(json: &str) -> TokenInfo { serde_json::from_str(json).unwrap() }

    #[test]
    fn accepts_matching_audience_with_verified_email() {
        let id = check_token_info(info(r#"{"aud":"cid","email":"Ann@Gmail.com","email_verified":"true","name":"Ann"}"#), "cid").unwrap();
        assert_eq!(id.email, "ann@gmail.com");
        assert_eq!(id.name, "Ann");
    }

    #[test]
    fn rejects_other_audience_or_unverified() {
        assert!(check_token_info(info(r#"{"aud":"other","email":"a@b.c","email_verified":true}"#), "cid").is_err());
        assert!(check_token_info(info(r#"{"aud":"cid","email":"a@b.c","email_verified":"false"}"#), "cid").is_err());
        assert!(check_token_info(info(r#"{"aud":"cid","email_verified":true}"#), "cid").is_err());
    }
}
