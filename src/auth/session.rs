use actix_session::Session;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::errors::AppError;

const USER_ID: &str = "user_id";
const EMAIL: &str = "email";
const USERNAME: &str = "username";

pub fn get_user_id(session: &Session) -> Option<Uuid> {
    session.get::<Uuid>(USER_ID).unwrap_or(None)
}

/// Identity recorded when the session was established, if any.
pub fn get_identity(session: &Session) -> Option<Identity> {
    let id = get_user_id(session)?;
    Some(Identity {
        id,
        email: session.get::<String>(EMAIL).unwrap_or(None),
        username: session.get::<String>(USERNAME).unwrap_or(None),
    })
}

pub fn store_identity(session: &Session, identity: &Identity) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USER_ID, identity.id)
        .map_err(|e| AppError::Session(format!("Failed to store user id: {e}")))?;
    if let Some(email) = &identity.email {
        session
            .insert(EMAIL, email)
            .map_err(|e| AppError::Session(format!("Failed to store email: {e}")))?;
    }
    if let Some(username) = &identity.username {
        session
            .insert(USERNAME, username)
            .map_err(|e| AppError::Session(format!("Failed to store username: {e}")))?;
    }
    Ok(())
}

pub fn clear(session: &Session) {
    session.purge();
}
