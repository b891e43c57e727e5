use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::error::{ExplorerError, Result};

pub const SESSION_COOKIE: &str = "session";

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

/// Session id of the authenticated caller, put in request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Hash a password using Argon2
///
/// Creates the PHC string stored as `password_hash` in the configuration.
///
/// # Arguments
/// * `password` - The plaintext password to hash
///
/// # Returns
/// * `Result<String>` - The password hash or an error
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ExplorerError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash
///
/// # Arguments
/// * `password` - The plaintext password to verify
/// * `hash` - The stored password hash to check against
///
/// # Returns
/// * `Result<bool>` - True if the password matches, false if not, or an error for a malformed hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| ExplorerError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Serve the login page, showing the error passed back by a failed attempt.
pub async fn serve_login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let data = serde_json::json!({ "error": query.error });
    match state.templates.render("login", &data) {
        Ok(page) => Html(page).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handle login requests
///
/// Checks the submitted password against the configured hash and, when it
/// matches, opens a session and sets the session cookie.
///
/// # Arguments
/// * `state` - Application state holding the configuration and session store
/// * `jar` - Cookie jar for storing the session cookie
/// * `form` - Form data containing the password
///
/// # Returns
/// * `Response` - Redirect to the explorer on success, back to the login page otherwise
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(hash) = state.config.password_hash.as_deref() else {
        warn!("login attempted but no password hash is configured");
        return (StatusCode::SERVICE_UNAVAILABLE, "Login is not configured").into_response();
    };

    match verify_password(&form.password, hash) {
        Ok(true) => {
            let session_id = state.sessions.create().await;
            info!("operator logged in");
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .build();
            (jar.add(cookie), Redirect::to("/explore")).into_response()
        }
        Ok(false) => {
            warn!("rejected login attempt");
            Redirect::to(&format!(
                "/login?error={}",
                urlencoding::encode("Invalid password")
            ))
            .into_response()
        }
        Err(e) => {
            warn!("password check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
        }
    }
}

/// Handle logout
///
/// Ends the session server-side and clears the cookie.
pub async fn handle_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value()).await;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login")).into_response()
}

/// Authentication middleware
///
/// Lets the request through when it carries a live session cookie. API calls
/// without one get `401`, page requests are redirected to the login page.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.get(cookie.value()).await.is_some() {
            request
                .extensions_mut()
                .insert(SessionId(cookie.value().to_string()));
            return next.run(request).await;
        }
    }

    if request.uri().path().starts_with("/api/") {
        (StatusCode::UNAUTHORIZED, "Not logged in").into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}
