use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::session::SessionAuthority;

/// Background task that periodically drops expired admin sessions.
/// Expiry is already enforced on every status check; this just keeps the
/// session map from accumulating dead entries.
pub async fn run_session_reaper(sessions: Arc<SessionAuthority>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let removed = sessions.sweep_expired();
        if removed > 0 {
            debug!("reaped {removed} expired session(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::storage::MemoryCredentialStore;

    #[tokio::test]
    async fn sweep_reclaims_expired_sessions() {
        let credentials = Credentials::new(Arc::new(MemoryCredentialStore::new()));
        credentials.seed_if_absent("garden-admin").await.unwrap();
        let authority = SessionAuthority::new(Arc::new(credentials), Duration::from_millis(5));

        authority.login("garden-admin").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(authority.sweep_expired(), 1);
        assert_eq!(authority.sweep_expired(), 0);
    }
}
