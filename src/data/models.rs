//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account
// =============================================================================

/// A registered user
///
/// One row exists per email regardless of which auth path created it.
/// Accounts created through Google OAuth still carry a password hash
/// (a hashed random password), so the row shape is uniform.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    /// Display name
    pub name: String,
    /// Unique, stored trimmed and lowercased
    pub email: String,
    /// bcrypt hash; never serialized into responses
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Google subject id ("sub" claim); set once on first OAuth login
    pub google_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reference to an account on a related record
///
/// Library rows store the uploader either as a bare identifier or as an
/// embedded account object, depending on whether the query populated it.
/// Collapsed to the identifier before any auth decision is made.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountRef {
    /// Identifier only
    Id(String),
    /// Populated reference
    Resolved { id: String, name: String },
}

impl AccountRef {
    /// The referenced account identifier, whichever shape was stored.
    pub fn id(&self) -> &str {
        match self {
            AccountRef::Id(id) => id,
            AccountRef::Resolved { id, .. } => id,
        }
    }
}

/// Normalize an email address for lookup and storage.
///
/// Email is the join key between the password and OAuth paths; every
/// comparison goes through this so uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_is_26_chars() {
        let id = EntityId::new();
        assert_eq!(id.0.len(), 26);
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@X.COM "), "alice@x.com");
        assert_eq!(normalize_email("bob@x.com"), "bob@x.com");
    }

    #[test]
    fn account_ref_accepts_bare_id() {
        let reference: AccountRef = serde_json::from_str(r#""01ARZ3NDEKTSV4RRFFQ69G5FAV""#)
            .expect("bare id should deserialize");
        assert_eq!(reference.id(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
    }

    #[test]
    fn account_ref_accepts_resolved_object() {
        let reference: AccountRef =
            serde_json::from_str(r#"{"id": "01ARZ3NDEKTSV4RRFFQ69G5FAV", "name": "Alice"}"#)
                .expect("resolved reference should deserialize");
        assert_eq!(reference.id(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let account = Account {
            id: EntityId::new().0,
            name: "Alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            google_id: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&account).expect("account serializes");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "alice@x.com");
    }
}
