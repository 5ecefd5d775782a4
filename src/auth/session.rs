//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Account;
use crate::error::AppError;

/// Name of the session cookie, the token's only transport.
pub const SESSION_COOKIE: &str = "session";

/// User session data
///
/// Stored in a signed cookie. Carries everything downstream handlers
/// need, so verification never touches the account store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Account identifier
    pub account_id: String,
    /// Account email at issuance time
    pub email: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Build a session for an account and mint its signed token.
///
/// Deterministic given the same secret and clock; the only state it
/// carries is what the account record says right now.
pub fn issue_session(
    account: &Account,
    secret: &str,
    max_age_seconds: i64,
) -> Result<(Session, String), AppError> {
    let now = Utc::now();
    let session = Session {
        account_id: account.id.clone(),
        email: account.email.clone(),
        created_at: now,
        expires_at: now + Duration::seconds(max_age_seconds),
    };
    let token = create_session_token(&session, secret)?;

    crate::metrics::SESSIONS_ISSUED_TOTAL.inc();

    Ok((session, token))
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns [`AppError::TokenInvalid`] with a short reason usable for
/// logging; the reason is never sent to the client.
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(AppError::TokenInvalid("malformed token".to_string()));
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    // 2. Verify HMAC signature before trusting the payload
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::TokenInvalid("malformed signature encoding".to_string()))?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::TokenInvalid("bad signature".to_string()))?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::TokenInvalid("malformed payload encoding".to_string()))?;

    let payload_str = String::from_utf8(payload_bytes)
        .map_err(|_| AppError::TokenInvalid("payload not utf-8".to_string()))?;

    let session: Session = serde_json::from_str(&payload_str)
        .map_err(|_| AppError::TokenInvalid("payload shape mismatch".to_string()))?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(AppError::TokenInvalid("expired".to_string()));
    }

    Ok(session)
}
