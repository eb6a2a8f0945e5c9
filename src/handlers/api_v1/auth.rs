use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::identity::{Identity, IdentityResolver};
use crate::auth::session;
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub access_token: String,
}

/// POST /api/v1/auth/session - Exchange a provider access token for a cookie
/// session. Registers the user on first sign-in.
pub async fn sign_in(
    resolver: web::Data<IdentityResolver>,
    session: Session,
    body: web::Json<SignInRequest>,
) -> Result<HttpResponse, AppError> {
    let token = body.access_token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("access_token is required".to_string()));
    }

    let identity = resolver.establish(token).await?;
    session::store_identity(&session, &identity)?;

    log::info!("session.established user={}", identity.id);
    Ok(HttpResponse::Ok().json(identity))
}

/// DELETE /api/v1/auth/session
pub async fn sign_out(session: Session) -> HttpResponse {
    if let Some(user_id) = session::get_user_id(&session) {
        log::info!("session.ended user={user_id}");
    }
    session::clear(&session);
    HttpResponse::NoContent().finish()
}

/// GET /api/v1/auth/me
pub async fn me(caller: Identity) -> HttpResponse {
    HttpResponse::Ok().json(caller)
}
