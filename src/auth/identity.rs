use actix_session::SessionExt;
use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::provider::AuthProvider;
use crate::auth::session;
use crate::errors::AppError;
use crate::store::Store;

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Raw credentials carried by a request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub bearer: Option<String>,
    pub session: Option<Identity>,
}

impl Credentials {
    pub fn from_request(req: &HttpRequest) -> Self {
        Credentials {
            bearer: bearer_token(req),
            session: session::get_identity(&req.get_session()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bearer.is_none() && self.session.is_none()
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Turns request credentials into an `Identity`, registering first-time users.
pub struct IdentityResolver {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn Store>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn Store>) -> Self {
        Self { provider, store }
    }

    /// Resolve the caller. Never fails: rejected or unverifiable credentials
    /// come back as `None`, which the boundary reports as 401.
    pub async fn resolve(&self, credentials: &Credentials) -> Option<Identity> {
        if let Some(token) = credentials.bearer.as_deref() {
            return match self.verify_and_register(token).await {
                Ok(identity) => identity,
                Err(e) => {
                    log::warn!("Bearer token could not be verified: {e}");
                    None
                }
            };
        }

        let identity = credentials.session.clone()?;
        Some(self.with_username(identity).await)
    }

    /// Verify a provider token for session sign-in.
    pub async fn establish(&self, token: &str) -> Result<Identity, AppError> {
        self.verify_and_register(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    async fn verify_and_register(&self, token: &str) -> Result<Option<Identity>, AppError> {
        let Some(user) = self.provider.verify(token).await? else {
            return Ok(None);
        };

        let (record, created) = self
            .store
            .ensure_user(user.id, user.email.as_deref(), user.username.as_deref())
            .await?;
        if created {
            log::info!("user.registered id={}", record.id);
        }

        Ok(Some(Identity {
            id: record.id,
            email: user.email.or(record.email),
            username: record.username.or(user.username),
        }))
    }

    async fn with_username(&self, mut identity: Identity) -> Identity {
        match self.store.find_user(identity.id).await {
            Ok(Some(user)) if user.username.is_some() => identity.username = user.username,
            Ok(_) => {}
            Err(e) => log::warn!("Username lookup failed for {}: {e}", identity.id),
        }
        identity
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let resolver = req.app_data::<web::Data<IdentityResolver>>().cloned();
        let credentials = Credentials::from_request(req);

        Box::pin(async move {
            let Some(resolver) = resolver else {
                log::error!("IdentityResolver is not registered as app data");
                return Err(AppError::Unauthorized);
            };
            resolver
                .resolve(&credentials)
                .await
                .ok_or(AppError::Unauthorized)
        })
    }
}
