use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::ats::orchestrator::{SessionDeps, SessionHandle};

/// Live checker sessions, keyed by the id handed to the SPA.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    deps: SessionDeps,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
            ttl,
        }
    }

    /// Spawns a new idle session, pruning stale ones first.
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        self.prune_expired().await;

        let id = Uuid::new_v4();
        let handle = SessionHandle::spawn(self.deps.clone());
        self.sessions.write().await.insert(id, handle.clone());
        debug!(%id, "session created");
        (id, handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than the TTL that are not mid-analysis.
    /// Idle time counts from the last submit, reset or session transition.
    /// Dropping the last handle stops the session task.
    pub async fn prune_expired(&self) {
        self.prune_at(Utc::now()).await;
    }

    async fn prune_at(&self, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            handle.snapshot().state.is_active() || now - handle.last_activity() < ttl
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, "pruned expired sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::analysis::AnalysisBackend;
    use crate::ats::errors::{AnalysisError, UploadError};
    use crate::ats::models::{AtsReport, PendingFile};
    use crate::ats::steps::Pacing;
    use crate::ats::store::{DocumentStore, UploadProgress};
    use crate::auth::BearerToken;
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl DocumentStore for Unused {
        async fn upload(
            &self,
            _file: &PendingFile,
            _destination: &str,
            _progress: UploadProgress,
        ) -> Result<String, UploadError> {
            Err(UploadError::Transport("unused".to_string()))
        }
    }

    #[async_trait]
    impl AnalysisBackend for Unused {
        async fn analyze(
            &self,
            _document_url: &str,
            _token: &BearerToken,
        ) -> Result<AtsReport, AnalysisError> {
            Err(AnalysisError::Empty)
        }
    }

    fn registry(ttl: Duration) -> SessionRegistry {
        let deps = SessionDeps {
            store: Arc::new(Unused),
            analysis: Arc::new(Unused),
            destination: "ats".to_string(),
            pacing: Pacing::default(),
        };
        SessionRegistry::new(deps, ttl)
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let registry = registry(Duration::from_secs(60));
        let (id, _) = registry.create().await;
        assert!(registry.get(id).await.is_some());
        assert!(registry.remove(id).await.is_some());
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_counts_from_last_activity() {
        let ttl = Duration::from_secs(60);
        let registry = registry(ttl);
        let (id, handle) = registry.create().await;
        let created = handle.last_activity();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let pdf = PendingFile::new("cv.pdf", Some("application/pdf"), b"%PDF-1.4".to_vec());
        handle
            .submit(Some(pdf), BearerToken("tok".to_string()))
            .await
            .unwrap();
        handle.reset().await;
        let touched = handle.last_activity();
        assert!(touched > created);

        let ttl = chrono::Duration::from_std(ttl).unwrap();
        // a full TTL after creation, but not after the resubmit
        registry.prune_at(created + ttl).await;
        assert!(registry.get(id).await.is_some());

        registry.prune_at(touched + ttl).await;
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let registry = registry(Duration::ZERO);
        let (first, _) = registry.create().await;
        let (second, _) = registry.create().await;
        // creating `second` pruned `first`
        assert!(registry.get(first).await.is_none());
        assert!(registry.get(second).await.is_some());
        assert_eq!(registry.len().await, 1);
    }
}
