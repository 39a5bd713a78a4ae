//! Session configuration for the web layer.
//!
//! In-memory sessions via tower-sessions. The only thing kept in a session
//! is the lowercased name of the signed-in user.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use tower_sessions::session::Error as SessionError;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "stockroom_session";

const CURRENT_USER_KEY: &str = "user";

/// Create the session layer, expiring after `session_hours` of inactivity.
pub fn create_session_layer(session_hours: i64, secure: bool) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::hours(session_hours),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// The signed-in user, if any
pub async fn current_user(session: &Session) -> Result<Option<String>, SessionError> {
    session.get::<String>(CURRENT_USER_KEY).await
}

/// Record a sign-in under a fresh session id; the previous id stops working.
pub async fn set_current_user(session: &Session, username: &str) -> Result<(), SessionError> {
    session.cycle_id().await?;
    session.insert(CURRENT_USER_KEY, username).await
}

/// Drop the whole session, returning who was signed in.
pub async fn clear_current_user(session: &Session) -> Result<Option<String>, SessionError> {
    let user = current_user(session).await?;
    session.flush().await?;
    Ok(user)
}
