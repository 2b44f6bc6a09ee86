//! User directory synchronization
//!
//! Keeps the ledger's key set a superset of the directory's: any user the
//! directory knows about but the ledger doesn't gets an entry at the default
//! quota. Existing entries are never reset.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::error::{QuotaError, Result};
use crate::ledger::LedgerStore;

/// Timing of the sync loop
#[derive(Debug, Clone, Copy)]
pub struct SyncSchedule {
    /// Pause between successful passes
    pub poll_interval: Duration,
    /// Pause before retrying after the directory failed to answer
    pub retry_delay: Duration,
}

/// Background task reconciling the ledger with the user directory
pub struct UserSync {
    store: LedgerStore,
    directory: Arc<dyn Directory>,
    default_quota: i64,
    schedule: SyncSchedule,
}

impl UserSync {
    pub fn new(
        store: LedgerStore,
        directory: Arc<dyn Directory>,
        default_quota: i64,
        schedule: SyncSchedule,
    ) -> Self {
        Self {
            store,
            directory,
            default_quota,
            schedule,
        }
    }

    /// One reconciliation pass
    ///
    /// Fails only when the directory can't be listed. Per-user store errors
    /// are logged and the pass moves on. Returns how many entries were created.
    pub async fn reconcile_once(&self) -> Result<u64> {
        let ids = self.directory.all_ids().await?;
        let mut created = 0;

        for id in ids {
            match self.store.get(id).await {
                Ok(_) => {}
                Err(QuotaError::UnknownUser(_)) => {
                    match self.store.initialize(&[id], self.default_quota).await {
                        Ok(n) => {
                            if n > 0 {
                                info!("New user {} initialized with quota {}", id, self.default_quota);
                            }
                            created += n;
                        }
                        Err(e) => warn!("Failed to initialize quota for user {}: {}", id, e),
                    }
                }
                Err(e) => warn!("Failed to probe quota for user {}: {}", id, e),
            }
        }

        Ok(created)
    }

    /// Poll the directory until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!("Syncing users from directory every {:?}", self.schedule.poll_interval);

        while !shutdown.is_cancelled() {
            let pause = match self.reconcile_once().await {
                Ok(created) => {
                    debug!("User sync pass done, {} new entries", created);
                    self.schedule.poll_interval
                }
                Err(e) => {
                    warn!("User directory unavailable: {}", e);
                    self.schedule.retry_delay
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("User sync stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UserId;
    use std::sync::Mutex;

    /// In-memory directory whose contents tests can change
    struct FakeDirectory {
        ids: Mutex<Option<Vec<UserId>>>,
    }

    impl FakeDirectory {
        fn new(ids: &[i64]) -> Self {
            Self {
                ids: Mutex::new(Some(ids.iter().copied().map(UserId).collect())),
            }
        }

        fn set(&self, ids: Option<&[i64]>) {
            *self.ids.lock().unwrap() = ids.map(|ids| ids.iter().copied().map(UserId).collect());
        }
    }

    #[async_trait::async_trait]
    impl Directory for FakeDirectory {
        async fn all_ids(&self) -> Result<Vec<UserId>> {
            self.ids
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| QuotaError::Directory("offline".to_string()))
        }
    }

    fn schedule() -> SyncSchedule {
        SyncSchedule {
            poll_interval: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_reconcile_creates_missing_entries() {
        let store = LedgerStore::open("sqlite::memory:").await.unwrap();
        let directory = Arc::new(FakeDirectory::new(&[1, 2, 3]));
        let sync = UserSync::new(store.clone(), directory, 5, schedule());

        assert_eq!(sync.reconcile_once().await.unwrap(), 3);
        assert_eq!(store.scan_all().await.unwrap().len(), 3);
        assert_eq!(store.get(UserId(3)).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = LedgerStore::open("sqlite::memory:").await.unwrap();
        let directory = Arc::new(FakeDirectory::new(&[1, 2]));
        let sync = UserSync::new(store.clone(), directory, 5, schedule());

        sync.reconcile_once().await.unwrap();
        store.try_consume(UserId(1)).await.unwrap();
        let before = store.scan_all().await.unwrap();

        assert_eq!(sync.reconcile_once().await.unwrap(), 0);
        assert_eq!(store.scan_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_reconcile_picks_up_new_users() {
        let store = LedgerStore::open("sqlite::memory:").await.unwrap();
        let directory = Arc::new(FakeDirectory::new(&[1]));
        let sync = UserSync::new(store.clone(), directory.clone(), 5, schedule());

        sync.reconcile_once().await.unwrap();
        directory.set(Some(&[1, 2]));

        assert_eq!(sync.reconcile_once().await.unwrap(), 1);
        assert_eq!(store.get(UserId(2)).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_reconcile_directory_down() {
        let store = LedgerStore::open("sqlite::memory:").await.unwrap();
        let directory = Arc::new(FakeDirectory::new(&[]));
        directory.set(None);
        let sync = UserSync::new(store, directory, 5, schedule());

        assert!(matches!(
            sync.reconcile_once().await,
            Err(QuotaError::Directory(_))
        ));
    }

    #[tokio::test]
    async fn test_run_survives_directory_outage() {
        let store = LedgerStore::open("sqlite::memory:").await.unwrap();
        let directory = Arc::new(FakeDirectory::new(&[]));
        directory.set(None);

        let shutdown = CancellationToken::new();
        let sync = UserSync::new(store.clone(), directory.clone(), 5, schedule());
        let handle = tokio::spawn(sync.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        directory.set(Some(&[4]));
        tokio::time::sleep(Duration::from_millis(200)).await;

        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(store.get(UserId(4)).await.unwrap(), 5);
    }
}
