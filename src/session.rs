use std::collections::HashMap;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::Identity;

/// Who is signed in on one client. Created at login or registration and
/// dropped at logout or once `expires_at` passes; tokens carry its id.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub id: Uuid,
    pub identity: Identity,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl SessionContext {
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// Live sessions keyed by id. A session lasts `ttl` past its last refresh.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    /// Opens a session for `identity`, dropping any that have expired.
    pub async fn open(&self, identity: Identity) -> SessionContext {
        let now = OffsetDateTime::now_utc();
        let ctx = SessionContext {
            id: Uuid::new_v4(),
            identity,
            created_at: now,
            expires_at: now + self.ttl,
        };
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, c| c.is_live(now));
        let pruned = before - map.len();
        map.insert(ctx.id, ctx.clone());
        debug!(session_id = %ctx.id, user_id = %ctx.identity.id, pruned, "session opened");
        ctx
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionContext> {
        let now = OffsetDateTime::now_utc();
        self.inner
            .read()
            .await
            .get(&id)
            .filter(|c| c.is_live(now))
            .cloned()
    }

    /// Pushes a live session's expiry `ttl` into the future.
    pub async fn touch(&self, id: Uuid) -> Option<SessionContext> {
        let now = OffsetDateTime::now_utc();
        let mut map = self.inner.write().await;
        let ctx = map.get_mut(&id).filter(|c| c.is_live(now))?;
        ctx.expires_at = now + self.ttl;
        Some(ctx.clone())
    }

    /// Removes the session; returns it together with the number of sessions
    /// its identity still has open.
    pub async fn close(&self, id: Uuid) -> Option<(SessionContext, usize)> {
        let mut map = self.inner.write().await;
        let ctx = map.remove(&id)?;
        let now = OffsetDateTime::now_utc();
        let remaining = map
            .values()
            .filter(|c| c.identity.id == ctx.identity.id && c.is_live(now))
            .count();
        debug!(session_id = %id, remaining, "session closed");
        Some((ctx, remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Duration::hours(1))
    }

    #[tokio::test]
    async fn open_get_close() {
        let reg = registry();
        let ctx = reg.open(alice()).await;
        assert_eq!(reg.get(ctx.id).await, Some(ctx.clone()));

        let (closed, remaining) = reg.close(ctx.id).await.unwrap();
        assert_eq!(closed.id, ctx.id);
        assert_eq!(remaining, 0);
        assert!(reg.get(ctx.id).await.is_none());
        assert!(reg.close(ctx.id).await.is_none());
    }

    #[tokio::test]
    async fn close_counts_other_sessions_of_same_identity() {
        let reg = registry();
        let who = alice();
        let phone = reg.open(who.clone()).await;
        let laptop = reg.open(who).await;
        reg.open(alice()).await;

        let (_, remaining) = reg.close(phone.id).await.unwrap();
        assert_eq!(remaining, 1);
        assert!(reg.get(laptop.id).await.is_some());
    }

    #[tokio::test]
    async fn expired_sessions_are_missing_and_pruned() {
        let reg = SessionRegistry::new(Duration::ZERO);
        let stale = reg.open(alice()).await;
        assert!(reg.get(stale.id).await.is_none());
        assert!(reg.touch(stale.id).await.is_none());

        for _ in 0..100 {
            reg.open(alice()).await;
        }
        assert_eq!(reg.inner.read().await.len(), 1);
    }

    #[tokio::test]
    async fn touch_extends_expiry() {
        let reg = registry();
        let ctx = reg.open(alice()).await;
        let touched = reg.touch(ctx.id).await.unwrap();
        assert!(touched.expires_at >= ctx.expires_at);
        assert_eq!(reg.get(ctx.id).await, Some(touched));
    }

    #[tokio::test]
    async fn expired_sessions_do_not_count_as_remaining() {
        let reg = SessionRegistry::new(Duration::ZERO);
        let who = alice();
        let first = reg.open(who.clone()).await;
        let second = reg.open(who).await;
        assert!(!first.is_live(OffsetDateTime::now_utc()));

        let (_, remaining) = reg.close(second.id).await.unwrap();
        assert_eq!(remaining, 0);
    }
}
