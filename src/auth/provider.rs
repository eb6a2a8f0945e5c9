use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A user as vouched for by the external identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug)]
pub enum AuthError {
    Http(reqwest::Error),
    Status(u16),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Http(e) => write!(f, "HTTP error: {e}"),
            AuthError::Status(code) => write!(f, "unexpected status {code}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Http(e)
    }
}

/// Verifies access tokens. `Ok(None)` means the token was rejected.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Option<ProviderUser>, AuthError>;
}

#[derive(Deserialize)]
struct ProviderUserResponse {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<serde_json::Value>,
}

impl From<ProviderUserResponse> for ProviderUser {
    fn from(resp: ProviderUserResponse) -> Self {
        let username = resp
            .user_metadata
            .as_ref()
            .and_then(|m| m.get("username"))
            .and_then(|v| v.as_str())
            .map(String::from);
        ProviderUser { id: resp.id, email: resp.email, username }
    }
}

/// Hosted auth service exposing `GET /auth/v1/user` for bearer tokens.
pub struct HttpAuthProvider {
    client: reqwest::Client,
    user_endpoint: String,
    api_key: String,
}

impl HttpAuthProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_endpoint: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn verify(&self, token: &str) -> Result<Option<ProviderUser>, AuthError> {
        let response = self
            .client
            .get(&self.user_endpoint)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let user: ProviderUserResponse = response.json().await?;
            return Ok(Some(user.into()));
        }
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(None),
            other => Err(AuthError::Status(other.as_u16())),
        }
    }
}

/// Fixed token table, for tests and local runs.
#[derive(Default, Clone)]
pub struct StaticAuthProvider {
    users: HashMap<String, ProviderUser>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: ProviderUser) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn verify(&self, token: &str) -> Result<Option<ProviderUser>, AuthError> {
        Ok(self.users.get(token).cloned())
    }
}
