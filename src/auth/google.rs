//! Google OAuth2 authorization code flow
//!
//! Server side of the flow:
//! 1. Build the authorization URL (user redirects to Google)
//! 2. Exchange the authorization code for an access token
//! 3. Fetch the profile from Google's userinfo endpoint

use serde::Deserialize;
use std::sync::Arc;

use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

/// Tokens returned by the token endpoint.
///
/// Transient: held in memory for the duration of one callback, used for
/// the userinfo fetch, then dropped. Never persisted.
#[derive(Debug, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Profile retrieved from Google after a successful exchange.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    /// Google's stable user identifier (the "sub" claim)
    pub subject_id: String,
    pub email: String,
    pub name: String,
}

/// Raw userinfo response; email and name are optional on the wire.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Google OAuth2 client for the authorization code flow
pub struct GoogleOAuthClient {
    config: GoogleOAuthConfig,
    http_client: Arc<reqwest::Client>,
}

impl GoogleOAuthClient {
    /// Create a client from configuration and the shared HTTP client.
    pub fn new(config: GoogleOAuthConfig, http_client: Arc<reqwest::Client>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Build the authorization URL the user is redirected to.
    ///
    /// `access_type=offline` and `prompt=consent` force a fresh consent
    /// screen so refresh behavior is deterministic across re-logins. The
    /// redirect URI must byte-for-byte match the one registered with
    /// Google and the one sent during the code exchange.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode("openid email profile"),
        )
    }

    /// Exchange an authorization code for a token bundle.
    ///
    /// An empty code fails with [`AppError::NoCodeProvided`] before any
    /// network traffic; this is checked before any account mutation.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenBundle, AppError> {
        if code.is_empty() {
            return Err(AppError::NoCodeProvided);
        }

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            // Body goes to the log only; clients get the generic variant.
            return Err(AppError::Exchange(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let bundle: TokenBundle = response
            .json()
            .await
            .map_err(|e| AppError::Exchange(format!("invalid token response: {}", e)))?;

        Ok(bundle)
    }

    /// Fetch the user profile with an access token.
    ///
    /// Downstream account resolution requires an email; a profile without
    /// one fails with [`AppError::MissingEmail`] instead of creating an
    /// account with no natural key.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, AppError> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(AppError::ProfileFetch(format!(
                "userinfo endpoint returned {}: {}",
                status, body
            )));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProfileFetch(format!("invalid userinfo response: {}", e)))?;

        let email = info.email.ok_or(AppError::MissingEmail)?;
        let name = info.name.unwrap_or_else(|| email.clone());

        Ok(GoogleProfile {
            subject_id: info.sub,
            email,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_google_config() -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: "123456.apps.googleusercontent.com".to_string(),
            client_secret: "secret123".to_string(),
            redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
        }
    }

    fn test_client() -> GoogleOAuthClient {
        GoogleOAuthClient::new(test_google_config(), Arc::new(reqwest::Client::new()))
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let url = test_client().authorization_url();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(url.contains("client_id=123456.apps.googleusercontent.com"));
        assert!(
            url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgoogle%2Fcallback")
        );
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[tokio::test]
    async fn empty_code_fails_before_any_network_call() {
        // token_url points at the real endpoint; if this test hits the
        // network it is already wrong. An empty code must short-circuit.
        let error = test_client()
            .exchange_code("")
            .await
            .expect_err("empty code must fail");
        assert!(matches!(error, AppError::NoCodeProvided));
    }

    #[test]
    fn userinfo_response_deserializes() {
        let json = r#"{
            "sub": "1234567890",
            "email": "alice@x.com",
            "name": "Alice Dupont"
        }"#;

        let info: UserInfoResponse = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(info.sub, "1234567890");
        assert_eq!(info.email.as_deref(), Some("alice@x.com"));
        assert_eq!(info.name.as_deref(), Some("Alice Dupont"));
    }

    #[test]
    fn userinfo_response_without_email_deserializes() {
        let json = r#"{"sub": "1234567890"}"#;

        let info: UserInfoResponse = serde_json::from_str(json).expect("should deserialize");
        assert!(info.email.is_none());
        assert!(info.name.is_none());
    }
}
