//! Password hashing and verification
//!
//! bcrypt for both manually registered and provider-created accounts.
//! Provider-created accounts get a generated random password through the
//! same hashing path, so every account row carries a hash.

use crate::error::AppError;

#[cfg(test)]
const BCRYPT_COST: u32 = 4;
#[cfg(not(test))]
const BCRYPT_COST: u32 = 12;

/// Length of generated passwords for provider-created accounts
const GENERATED_PASSWORD_LEN: usize = 16;

const GENERATED_PASSWORD_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_-+=<>?";

/// Hash a plaintext password with bcrypt.
pub fn hash_password(plaintext: &str) -> Result<String, AppError> {
    bcrypt::hash(plaintext, BCRYPT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

/// Verify a plaintext password against a stored bcrypt hash.
///
/// Fails closed: a malformed stored hash is a non-match, never an error
/// that could bypass the check.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    bcrypt::verify(plaintext, stored_hash).unwrap_or(false)
}

/// Generate a random password for an account created via the identity
/// provider.
///
/// The value exists only to keep the account row shape uniform. It is
/// hashed immediately and never returned, logged, or shown to anyone.
pub fn generate_password() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    (0..GENERATED_PASSWORD_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..GENERATED_PASSWORD_CHARS.len());
            GENERATED_PASSWORD_CHARS[idx] as char
        })
        .collect()
}
