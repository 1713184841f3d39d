use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// An authenticated session. This is a single-user gate, so a session
/// carries nothing but its expiry.
#[derive(Debug, Clone)]
pub struct Session {
    pub expires_at: SystemTime,
}

/// Global sessions storage
///
/// Stores all active sessions in a thread-safe map. Sessions live in
/// memory only; restarting the server logs everyone out.
lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

/// Hash a password using Argon2
///
/// Creates a cryptographically secure hash of a password using Argon2id.
/// Used by the `hashpw` helper to provision `MOVIELOG_PASSWORD_HASH`.
///
/// # Arguments
/// * `password` - The plaintext password to hash
///
/// # Returns
/// * `Result<String, String>` - The password hash or an error
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

/// Verify a password against a stored hash
///
/// Checks if a plaintext password matches a stored Argon2 hash.
///
/// # Arguments
/// * `password` - The plaintext password to verify
/// * `hash` - The stored password hash to check against
///
/// # Returns
/// * `Result<bool, String>` - True if the password matches, false if not, or an error
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Create a new session and return its id.
pub fn create_session() -> String {
    let session_id = Uuid::new_v4().to_string();
    let session = Session {
        expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
    };

    let mut sessions = SESSIONS.write().unwrap();
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Check whether a session id is known and not expired.
pub fn validate_session(session_id: &str) -> bool {
    let sessions = SESSIONS.read().unwrap();

    match sessions.get(session_id) {
        Some(session) => session.expires_at > SystemTime::now(),
        None => false,
    }
}

/// Drop a session on logout.
pub fn destroy_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap();
    sessions.remove(session_id);
}

/// Whether the request's cookie jar carries a live session.
pub fn session_from_jar(jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE)
        .map(|cookie| validate_session(cookie.value()))
        .unwrap_or(false)
}

/// Authentication middleware
///
/// Requests with a live session pass through. Without one, API calls get
/// 401 and page requests are redirected to the login screen.
pub async fn require_auth(
    jar: CookieJar,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if session_from_jar(&jar) {
        return next.run(request).await;
    }

    if request.uri().path().starts_with("/api/") {
        (StatusCode::UNAUTHORIZED, "Not logged in").into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}
