//! Account service
//!
//! Account resolution for both auth paths: explicit registration and
//! password lookup, plus find-or-create-or-link for OAuth logins.

use std::sync::Arc;

use crate::auth::password::{generate_password, hash_password};
use crate::data::{Account, Database, EntityId, normalize_email};
use crate::error::AppError;

/// Account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Look up an account for a password login.
    ///
    /// Pure lookup; never creates. Registration is the explicit
    /// [`AccountService::register`] call.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        self.db.find_account_by_email(&normalize_email(email)).await
    }

    /// Get an account by identifier.
    pub async fn get(&self, id: &str) -> Result<Account, AppError> {
        self.db.get_account(id).await?.ok_or(AppError::NotFound)
    }

    /// Register a new password-authenticated account.
    ///
    /// # Errors
    /// [`AppError::DuplicateEmail`] if an account with this email already
    /// exists. Detected through the unique index, not a pre-read, so two
    /// concurrent registrations cannot both succeed.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }

        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            return Err(AppError::Validation("invalid email format".to_string()));
        }

        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }

        let account = Account {
            id: EntityId::new().0,
            name: name.to_string(),
            email,
            password_hash: hash_password(password)?,
            google_id: None,
            created_at: chrono::Utc::now(),
        };

        self.db.insert_account(&account).await?;

        crate::metrics::ACCOUNTS_CREATED_TOTAL
            .with_label_values(&["password"])
            .inc();
        tracing::info!(account_id = %account.id, "Account registered");

        Ok(account)
    }

    /// Resolve an OAuth login to a local account.
    ///
    /// Find-or-create-or-link, idempotent:
    /// - unseen email: create an account with a generated, hashed random
    ///   password and the provider subject id
    /// - known email without a provider id: attach the subject id once
    /// - known email with a provider id: return the account unchanged
    ///
    /// Never overwrites an existing password hash and never changes the
    /// email; the email is the join key and is immutable post-creation.
    ///
    /// Two concurrent first-time logins for the same address race on the
    /// unique email index; the loser's insert is rejected and resolved by
    /// retrying as a lookup.
    pub async fn resolve_provider_login(
        &self,
        email: &str,
        subject_id: &str,
        display_name: &str,
    ) -> Result<Account, AppError> {
        let email = normalize_email(email);

        let existing = match self.db.find_account_by_email(&email).await? {
            Some(account) => account,
            None => match self.create_provider_account(&email, subject_id, display_name).await {
                Ok(account) => return Ok(account),
                // Lost the creation race; the row exists now.
                Err(AppError::DuplicateEmail) => self
                    .db
                    .find_account_by_email(&email)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!(
                            "account vanished after duplicate-email insert"
                        ))
                    })?,
                Err(e) => return Err(e),
            },
        };

        if existing.google_id.is_none() {
            // One-time link of a password-created account to its Google
            // identity; the SQL guard keeps this idempotent under races.
            let attached = self.db.attach_google_id(&existing.id, subject_id).await?;
            if attached {
                tracing::info!(account_id = %existing.id, "Linked Google identity to account");
            }
            return self.get(&existing.id).await;
        }

        Ok(existing)
    }

    async fn create_provider_account(
        &self,
        email: &str,
        subject_id: &str,
        display_name: &str,
    ) -> Result<Account, AppError> {
        // Same hashing path as manual registration, so every row carries
        // a hash. The plaintext is dropped here and never surfaced.
        let password_hash = hash_password(&generate_password())?;

        let account = Account {
            id: EntityId::new().0,
            name: display_name.to_string(),
            email: email.to_string(),
            password_hash,
            google_id: Some(subject_id.to_string()),
            created_at: chrono::Utc::now(),
        };

        self.db.insert_account(&account).await?;

        crate::metrics::ACCOUNTS_CREATED_TOTAL
            .with_label_values(&["google"])
            .inc();
        tracing::info!(account_id = %account.id, "Account created from Google profile");

        Ok(account)
    }
}

fn is_plausible_email(email: &str) -> bool {
    email.contains('@')
        && email
            .split('@')
            .nth(1)
            .is_some_and(|domain| domain.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use tempfile::TempDir;

    async fn test_service() -> (AccountService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (AccountService::new(Arc::new(db)), temp_dir)
    }

    #[tokio::test]
    async fn register_then_find_by_email() {
        let (service, _temp_dir) = test_service().await;

        let created = service
            .register("Alice", "Alice@X.com", "password1")
            .await
            .unwrap();
        assert_eq!(created.email, "alice@x.com");

        let found = service
            .find_by_email("  ALICE@x.COM ")
            .await
            .unwrap()
            .expect("normalized lookup should find the account");
        assert_eq!(found.id, created.id);
        assert!(verify_password("password1", &found.password_hash));
    }

    #[tokio::test]
    async fn register_duplicate_email_fails() {
        let (service, _temp_dir) = test_service().await;

        service
            .register("Alice", "alice@x.com", "password1")
            .await
            .unwrap();

        let error = service
            .register("Alice Again", "ALICE@x.com", "password2")
            .await
            .expect_err("duplicate email must fail");
        assert!(matches!(error, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn register_rejects_invalid_input() {
        let (service, _temp_dir) = test_service().await;

        let err = service.register("  ", "a@x.com", "password1").await;
        assert!(matches!(err, Err(AppError::Validation(_))));

        let err = service.register("Alice", "not-an-email", "password1").await;
        assert!(matches!(err, Err(AppError::Validation(_))));

        let err = service.register("Alice", "a@x.com", "").await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn provider_login_creates_account_with_hash() {
        let (service, _temp_dir) = test_service().await;

        let account = service
            .resolve_provider_login("carol@x.com", "sub-carol", "Carol")
            .await
            .unwrap();

        assert_eq!(account.email, "carol@x.com");
        assert_eq!(account.google_id.as_deref(), Some("sub-carol"));
        // Row shape is uniform: even provider-created accounts carry a hash
        assert!(!account.password_hash.is_empty());
    }

    #[tokio::test]
    async fn provider_login_is_idempotent() {
        let (service, _temp_dir) = test_service().await;

        let first = service
            .resolve_provider_login("dave@x.com", "sub-dave", "Dave")
            .await
            .unwrap();
        let second = service
            .resolve_provider_login("dave@x.com", "sub-dave", "Dave")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.password_hash, second.password_hash);
        assert_eq!(second.google_id.as_deref(), Some("sub-dave"));
    }

    #[tokio::test]
    async fn provider_login_links_password_account_and_preserves_hash() {
        let (service, _temp_dir) = test_service().await;

        let registered = service
            .register("Alice", "a@x.com", "pw1-long-enough")
            .await
            .unwrap();
        assert!(registered.google_id.is_none());

        let resolved = service
            .resolve_provider_login("a@x.com", "sub123", "Alice")
            .await
            .unwrap();

        assert_eq!(resolved.id, registered.id);
        assert_eq!(resolved.google_id.as_deref(), Some("sub123"));
        // The original credential still works after the merge
        assert_eq!(resolved.password_hash, registered.password_hash);
        assert!(verify_password("pw1-long-enough", &resolved.password_hash));
    }

    #[tokio::test]
    async fn provider_login_never_overwrites_existing_link() {
        let (service, _temp_dir) = test_service().await;

        service
            .resolve_provider_login("eve@x.com", "sub-first", "Eve")
            .await
            .unwrap();
        let resolved = service
            .resolve_provider_login("eve@x.com", "sub-other", "Eve")
            .await
            .unwrap();

        assert_eq!(resolved.google_id.as_deref(), Some("sub-first"));
    }
}
