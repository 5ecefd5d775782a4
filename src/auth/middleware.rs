//! Session gate
//!
//! Classifies every inbound request and verifies the session cookie on
//! restricted paths. This is the only place session fields are trusted;
//! downstream handlers read the verified [`Session`] from request
//! extensions and never accept an account id from headers or bodies.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

/// Path roots that require a verified session.
///
/// Exact match or prefix-with-slash; everything else passes through
/// untouched so the login and callback endpoints stay reachable.
const RESTRICTED_PATH_ROOTS: [&str; 4] = ["/dashboard", "/profile", "/settings", "/api/library"];

/// Decide whether a path requires a verified session.
pub fn is_restricted_path(path: &str) -> bool {
    RESTRICTED_PATH_ROOTS
        .iter()
        .any(|root| path == *root || path.starts_with(&format!("{root}/")))
}

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

/// Reject a restricted request.
///
/// Browser navigation is redirected to the entry point with a short
/// machine-readable error code; API calls get the JSON error response.
fn reject(path: &str, error: AppError) -> Response {
    if path.starts_with("/api/") {
        return error.into_response();
    }

    Redirect::to(&format!("/login?error={}", error.code())).into_response()
}

/// Middleware gating every inbound request
///
/// Unrestricted paths pass through unconditionally, without token
/// inspection. Restricted paths require a session cookie that verifies
/// against the signing secret and has not expired; the decoded session
/// is then injected into request extensions for downstream handlers.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route(...)
///     .layer(middleware::from_fn_with_state(state, session_gate));
/// ```
pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    if !is_restricted_path(&path) {
        return next.run(request).await;
    }

    let Some(token) = extract_token_from_headers(request.headers()) else {
        crate::metrics::SESSION_VERIFICATIONS_TOTAL
            .with_label_values(&["missing"])
            .inc();
        tracing::debug!(%path, "No session cookie on restricted path");
        return reject(&path, AppError::TokenMissing);
    };

    match verify_session_token(&token, &state.config.auth.session_secret) {
        Ok(session) => {
            crate::metrics::SESSION_VERIFICATIONS_TOTAL
                .with_label_values(&["verified"])
                .inc();
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(error) => {
            crate::metrics::SESSION_VERIFICATIONS_TOTAL
                .with_label_values(&["invalid"])
                .inc();
            if let AppError::TokenInvalid(reason) = &error {
                tracing::debug!(%path, %reason, "Session token rejected at gate");
            }
            reject(&path, error)
        }
    }
}

/// Extractor for the current authenticated user
///
/// Use in handlers to get the verified session.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(session): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", session.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Extract current user from request
    ///
    /// Prefers the session the gate already verified; verifies the
    /// cookie itself on routes outside the restricted set (e.g. whoami).
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let app_state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::TokenMissing)?;
        let session = verify_session_token(&token, &app_state.config.auth.session_secret)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let session = match extract_token_from_headers(&parts.headers) {
            Some(token) => {
                verify_session_token(&token, &app_state.config.auth.session_secret).ok()
            }
            None => None,
        };

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_matches_exact_and_prefix() {
        assert!(is_restricted_path("/dashboard"));
        assert!(is_restricted_path("/dashboard/library"));
        assert!(is_restricted_path("/profile"));
        assert!(is_restricted_path("/settings/player"));
        assert!(is_restricted_path("/api/library"));
        assert!(is_restricted_path("/api/library/tracks"));
    }

    #[test]
    fn classifier_passes_unrestricted_paths() {
        assert!(!is_restricted_path("/"));
        assert!(!is_restricted_path("/login"));
        assert!(!is_restricted_path("/auth/google"));
        assert!(!is_restricted_path("/auth/google/callback"));
        assert!(!is_restricted_path("/health"));
        // Prefix must end at a path segment boundary
        assert!(!is_restricted_path("/dashboards"));
        assert!(!is_restricted_path("/profiles/other"));
    }
}
