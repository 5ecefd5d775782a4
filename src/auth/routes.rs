//! Authentication endpoints
//!
//! Both login paths end the same way: resolve an account, mint a signed
//! session token, and hand it to the browser in an HTTP-only cookie.
//!
//! Routes:
//! - GET  /login - Login page
//! - GET  /dashboard - Authenticated entry point
//! - GET  /auth/google - Redirect to Google
//! - GET  /auth/google/callback - OAuth callback
//! - POST /auth/login - Password login
//! - POST /auth/register - Account registration
//! - GET  /auth/logout - Clear session cookie
//! - GET  /auth/whoami - Current session identity

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::google::GoogleOAuthClient;
use super::middleware::{CurrentUser, MaybeUser};
use super::password::verify_password;
use super::session::{SESSION_COOKIE, issue_session};
use crate::AppState;
use crate::error::AppError;

/// Create authentication router
///
/// The /auth/* routes do NOT require authentication (they provide it);
/// /dashboard is protected by the session gate.
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/dashboard", get(dashboard_page))
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/login", post(password_login))
        .route("/auth/register", post(register))
        .route("/auth/logout", get(logout))
        .route("/auth/whoami", get(whoami))
}

// =============================================================================
// Request / Response types
// =============================================================================

/// Request body for POST /auth/login
#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Request body for POST /auth/register
#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

/// Identity returned after login/registration and from whoami
#[derive(Debug, Serialize)]
struct SessionIdentity {
    account_id: String,
    email: String,
    name: Option<String>,
}

/// Query parameters from the Google callback
#[derive(Debug, Deserialize)]
struct GoogleCallbackQuery {
    /// Authorization code; absent when the user denied consent
    code: Option<String>,
    /// Error code from Google, if consent failed
    error: Option<String>,
}

// =============================================================================
// Pages
// =============================================================================

/// GET /login
///
/// Renders a simple login page with Google sign-in link. A visitor who
/// already carries a valid session goes straight to the dashboard.
async fn login_page(MaybeUser(session): MaybeUser) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - TuneDeck</title></head>
        <body>
            <h1>TuneDeck</h1>
            <p>Sign in to your library</p>
            <a href="/auth/google">Sign in with Google</a>
        </body>
        </html>
    "#,
    )
    .into_response()
}

/// GET /dashboard
///
/// Authenticated entry point. The session gate has already verified the
/// cookie before this handler runs.
async fn dashboard_page(CurrentUser(session): CurrentUser) -> impl IntoResponse {
    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Dashboard - TuneDeck</title></head>
        <body>
            <h1>Your library</h1>
            <p>Signed in as {}</p>
            <a href="/auth/logout">Sign out</a>
        </body>
        </html>
    "#,
        session.email
    ))
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /auth/google
///
/// Redirects the user to Google's authorization page.
async fn google_redirect(State(state): State<AppState>) -> impl IntoResponse {
    let client = GoogleOAuthClient::new(
        state.config.auth.google.clone(),
        state.http_client.clone(),
    );
    Redirect::to(&client.authorization_url())
}

/// GET /auth/google/callback
///
/// Handles the OAuth callback from Google.
///
/// # Steps
/// 1. Exchange the authorization code for tokens (fails before any
///    account mutation)
/// 2. Fetch the profile from the userinfo endpoint
/// 3. Resolve the profile to a local account (find/create/link)
/// 4. Issue a session cookie and redirect to the dashboard
///
/// Failures never surface provider detail: the browser is redirected to
/// the login page with a short error code, and the detail is logged.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    jar: CookieJar,
) -> Response {
    match run_google_callback(&state, query).await {
        Ok(token) => {
            crate::metrics::LOGINS_TOTAL
                .with_label_values(&["google", "success"])
                .inc();
            let jar = jar.add(session_cookie(&state, token));
            (jar, Redirect::to("/dashboard")).into_response()
        }
        Err(error) => {
            crate::metrics::LOGINS_TOTAL
                .with_label_values(&["google", "failure"])
                .inc();
            tracing::warn!(code = error.code(), "Google login failed");
            Redirect::to(&format!("/login?error={}", error.code())).into_response()
        }
    }
}

async fn run_google_callback(
    state: &AppState,
    query: GoogleCallbackQuery,
) -> Result<String, AppError> {
    if let Some(provider_error) = query.error {
        return Err(AppError::Exchange(format!(
            "provider returned error: {provider_error}"
        )));
    }

    let code = query.code.unwrap_or_default();

    let client = GoogleOAuthClient::new(
        state.config.auth.google.clone(),
        state.http_client.clone(),
    );

    // Token bundle lives only for this call; the access token is used
    // once for the profile fetch and then dropped.
    let bundle = client.exchange_code(&code).await?;
    let profile = client.fetch_profile(&bundle.access_token).await?;

    let account = state
        .accounts
        .resolve_provider_login(&profile.email, &profile.subject_id, &profile.name)
        .await?;

    let (_, token) = issue_session(
        &account,
        &state.config.auth.session_secret,
        state.config.auth.session_max_age,
    )?;

    Ok(token)
}

// =============================================================================
// Password login / registration
// =============================================================================

/// POST /auth/login
///
/// Email/password authentication. Unknown email and wrong password are
/// deliberately indistinguishable to the caller.
async fn password_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = match state.accounts.find_by_email(&request.email).await? {
        Some(account) if verify_password(&request.password, &account.password_hash) => account,
        _ => {
            crate::metrics::LOGINS_TOTAL
                .with_label_values(&["password", "failure"])
                .inc();
            return Err(AppError::InvalidCredentials);
        }
    };

    let (_, token) = issue_session(
        &account,
        &state.config.auth.session_secret,
        state.config.auth.session_max_age,
    )?;

    crate::metrics::LOGINS_TOTAL
        .with_label_values(&["password", "success"])
        .inc();

    let jar = jar.add(session_cookie(&state, token));
    Ok((
        jar,
        Json(SessionIdentity {
            account_id: account.id,
            email: account.email,
            name: Some(account.name),
        }),
    ))
}

/// POST /auth/register
///
/// Creates a password-authenticated account and signs the caller in.
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .accounts
        .register(&request.name, &request.email, &request.password)
        .await?;

    let (_, token) = issue_session(
        &account,
        &state.config.auth.session_secret,
        state.config.auth.session_max_age,
    )?;

    let jar = jar.add(session_cookie(&state, token));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionIdentity {
            account_id: account.id,
            email: account.email,
            name: Some(account.name),
        }),
    ))
}

// =============================================================================
// Session endpoints
// =============================================================================

/// GET /auth/whoami
///
/// Returns the identity carried by the session cookie, or 401.
async fn whoami(CurrentUser(session): CurrentUser) -> impl IntoResponse {
    Json(SessionIdentity {
        account_id: session.account_id,
        email: session.email,
        name: None,
    })
}

/// GET /auth/logout
///
/// Expires the session cookie and redirects to the login page. The
/// token itself stays valid until its expiry (no revocation list);
/// clearing the cookie is the only client-side invalidation.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(clear_session_cookie());
    (jar, Redirect::to("/login"))
}

// =============================================================================
// Cookie helpers
// =============================================================================

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(state.config.auth.session_max_age))
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
