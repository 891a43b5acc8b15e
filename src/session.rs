use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::auth::Credentials;
use crate::error::CoreError;

/// Fixed session validity window.
pub const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Minimum accepted length for a new admin password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// An authenticated admin session. Carries no identity beyond the capability
/// itself — it is not a user profile.
struct Session {
    created_at: Instant,
}

impl Session {
    fn expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Issues and validates session tokens against the admin credential.
///
/// Sessions live only in memory: a process restart logs the administrator
/// out. Expired entries read as anonymous immediately; the background reaper
/// merely reclaims their map slots.
pub struct SessionAuthority {
    credentials: Arc<Credentials>,
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionAuthority {
    pub fn new(credentials: Arc<Credentials>, ttl: Duration) -> Self {
        Self {
            credentials,
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verify the password and mint a fresh session token.
    pub async fn login(&self, password: &str) -> Result<String, CoreError> {
        if password.trim().is_empty() {
            return Err(CoreError::Validation("password is required"));
        }
        if !self.credentials.verify(password).await? {
            metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
            return Err(CoreError::InvalidCredentials);
        }
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                created_at: Instant::now(),
            },
        );
        metrics::gauge!(crate::observability::SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        Ok(token)
    }

    /// Authenticated or Anonymous. A token past its validity window reads as
    /// Anonymous without waiting for the reaper.
    pub fn is_authenticated(&self, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        let expired = match self.sessions.get(token) {
            None => return false,
            Some(session) => session.expired(self.ttl),
        };
        if expired {
            self.sessions.remove(token);
        }
        !expired
    }

    /// Invalidate the session. Idempotent — an unknown or absent token is
    /// already anonymous.
    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            self.sessions.remove(token);
        }
        metrics::gauge!(crate::observability::SESSIONS_ACTIVE).set(self.sessions.len() as f64);
    }

    /// Rotate the admin password. Requires an authenticated session, a
    /// matching current password, and a sufficiently long new password.
    /// Rotation invalidates every other live session; the caller keeps theirs.
    pub async fn change_password(
        &self,
        token: Option<&str>,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), CoreError> {
        let Some(token) = token.filter(|t| self.is_authenticated(Some(t))) else {
            return Err(CoreError::Unauthorized);
        };
        if new_password.trim().len() < MIN_PASSWORD_LEN {
            return Err(CoreError::Validation(
                "new password must be at least 8 characters long",
            ));
        }
        if !self.credentials.verify(current_password).await? {
            metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
            return Err(CoreError::InvalidCredentials);
        }
        self.credentials.rotate(new_password.trim()).await?;
        self.sessions.retain(|t, _| t == token);
        metrics::gauge!(crate::observability::SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        Ok(())
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, session| !session.expired(ttl));
        let removed = before.saturating_sub(self.sessions.len());
        metrics::gauge!(crate::observability::SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;

    async fn make_authority(ttl: Duration) -> SessionAuthority {
        let credentials = Credentials::new(Arc::new(MemoryCredentialStore::new()));
        credentials.seed_if_absent("garden-admin").await.unwrap();
        SessionAuthority::new(Arc::new(credentials), ttl)
    }

    #[tokio::test]
    async fn login_issues_a_valid_session() {
        let authority = make_authority(SESSION_TTL).await;
        let token = authority.login("garden-admin").await.unwrap();
        assert!(authority.is_authenticated(Some(&token)));
    }

    #[tokio::test]
    async fn login_rejects_blank_password() {
        let authority = make_authority(SESSION_TTL).await;
        assert!(matches!(
            authority.login("   ").await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_without_a_session() {
        let authority = make_authority(SESSION_TTL).await;
        assert!(matches!(
            authority.login("wrong-password").await,
            Err(CoreError::InvalidCredentials)
        ));
        assert!(!authority.is_authenticated(None));
    }

    #[tokio::test]
    async fn unknown_token_is_anonymous() {
        let authority = make_authority(SESSION_TTL).await;
        assert!(!authority.is_authenticated(Some("not-a-token")));
    }

    #[tokio::test]
    async fn expired_session_reads_as_anonymous() {
        let authority = make_authority(Duration::from_millis(10)).await;
        let token = authority.login("garden-admin").await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(!authority.is_authenticated(Some(&token)));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let authority = make_authority(SESSION_TTL).await;
        let token = authority.login("garden-admin").await.unwrap();
        authority.logout(Some(&token));
        assert!(!authority.is_authenticated(Some(&token)));
        // Logging out again, or with no token at all, is fine.
        authority.logout(Some(&token));
        authority.logout(None);
    }

    #[tokio::test]
    async fn change_password_requires_authentication() {
        let authority = make_authority(SESSION_TTL).await;
        let result = authority
            .change_password(None, "garden-admin", "new-password")
            .await;
        assert!(matches!(result, Err(CoreError::Unauthorized)));
        let result = authority
            .change_password(Some("stale"), "garden-admin", "new-password")
            .await;
        assert!(matches!(result, Err(CoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn change_password_enforces_minimum_length() {
        let authority = make_authority(SESSION_TTL).await;
        let token = authority.login("garden-admin").await.unwrap();
        let result = authority
            .change_password(Some(&token), "garden-admin", "short")
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
        // Old password untouched.
        authority.login("garden-admin").await.unwrap();
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let authority = make_authority(SESSION_TTL).await;
        let token = authority.login("garden-admin").await.unwrap();
        let result = authority
            .change_password(Some(&token), "wrong-current", "new-password")
            .await;
        assert!(matches!(result, Err(CoreError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn change_password_rotates_and_keeps_only_the_caller() {
        let authority = make_authority(SESSION_TTL).await;
        let keeper = authority.login("garden-admin").await.unwrap();
        let other = authority.login("garden-admin").await.unwrap();

        authority
            .change_password(Some(&keeper), "garden-admin", "brand-new-password")
            .await
            .unwrap();

        assert!(authority.is_authenticated(Some(&keeper)));
        assert!(!authority.is_authenticated(Some(&other)));

        assert!(matches!(
            authority.login("garden-admin").await,
            Err(CoreError::InvalidCredentials)
        ));
        authority.login("brand-new-password").await.unwrap();
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_sessions() {
        let authority = make_authority(Duration::from_millis(40)).await;
        let stale = authority.login("garden-admin").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let fresh = authority.login("garden-admin").await.unwrap();

        assert_eq!(authority.sweep_expired(), 1);
        assert!(!authority.is_authenticated(Some(&stale)));
        assert!(authority.is_authenticated(Some(&fresh)));
        assert_eq!(authority.sweep_expired(), 0);
    }
}
