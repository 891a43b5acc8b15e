use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use crate::error::CoreError;
use crate::model::AdminCredential;
use crate::storage::CredentialStore;

/// Administrator credential handling: argon2 hashing over a durable store.
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Seed the credential record from the configured default password.
    /// No-op when a record already exists. Returns whether seeding happened.
    pub async fn seed_if_absent(&self, default_password: &str) -> Result<bool, CoreError> {
        if self.store.load().await?.is_some() {
            return Ok(false);
        }
        self.rotate(default_password).await?;
        Ok(true)
    }

    /// Slow, salted comparison of `password` against the stored hash.
    /// `Ok(false)` when no credential exists yet — absence is not an error.
    pub async fn verify(&self, password: &str) -> Result<bool, CoreError> {
        let Some(credential) = self.store.load().await? else {
            return Ok(false);
        };
        let parsed = match PasswordHash::new(&credential.password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("stored password hash is unparseable: {e}");
                return Ok(false);
            }
        };
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hash `new_password` with a fresh salt and durably overwrite the
    /// singleton record. The old hash is gone once this returns.
    pub async fn rotate(&self, new_password: &str) -> Result<(), CoreError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(new_password.as_bytes(), &salt)
            .map_err(|e| CoreError::Storage(format!("password hashing failed: {e}")))?
            .to_string();
        self.store
            .store(&AdminCredential {
                password_hash,
                updated_at: Utc::now(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;

    fn make_credentials() -> Credentials {
        Credentials::new(Arc::new(MemoryCredentialStore::new()))
    }

    #[tokio::test]
    async fn verify_without_credential_is_false() {
        let credentials = make_credentials();
        assert!(!credentials.verify("anything").await.unwrap());
    }

    #[tokio::test]
    async fn seed_then_verify() {
        let credentials = make_credentials();
        assert!(credentials.seed_if_absent("garden-admin").await.unwrap());
        assert!(credentials.verify("garden-admin").await.unwrap());
        assert!(!credentials.verify("garden-admim").await.unwrap());
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let credentials = make_credentials();
        assert!(credentials.seed_if_absent("first").await.unwrap());
        assert!(!credentials.seed_if_absent("second").await.unwrap());
        // The original seed still stands.
        assert!(credentials.verify("first").await.unwrap());
        assert!(!credentials.verify("second").await.unwrap());
    }

    #[tokio::test]
    async fn rotate_replaces_the_hash() {
        let credentials = make_credentials();
        credentials.seed_if_absent("old-password").await.unwrap();
        credentials.rotate("new-password").await.unwrap();
        assert!(!credentials.verify("old-password").await.unwrap());
        assert!(credentials.verify("new-password").await.unwrap());
    }
}
