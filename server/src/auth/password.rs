//! Password Hashing
//!
//! Argon2id with a random per-hash salt, stored as a PHC string.

use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, Rng};

/// Length of the placeholder secret given to federated accounts.
const RANDOM_PASSWORD_LEN: usize = 48;

/// Hash checked when a login names no account, so that path costs the same
/// Argon2 run as a wrong password.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password(&random_password()).expect("hash dummy password"));

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored hash.
///
/// A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Random secret for accounts that never log in with a password.
pub fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Hash on the blocking pool so request tasks are not stalled by Argon2.
pub async fn hash_password_async(password: String) -> Result<String, super::AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| super::AuthError::Internal(format!("Hashing task failed: {e}")))?
        .map_err(|_| super::AuthError::PasswordHash)
}

/// Run a verification against [`DUMMY_HASH`] on the blocking pool. Never matches.
pub async fn verify_dummy_async(password: String) {
    let _ = tokio::task::spawn_blocking(move || verify_password(&password, &DUMMY_HASH)).await;
}

/// Verify on the blocking pool.
pub async fn verify_password_async(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}
