//! Supervision of long-lived tasks
//!
//! Every background loop and the HTTP server run as named tasks sharing one
//! cancellation token. When any of them ends (cleanly or not) before shutdown
//! was requested, the token is cancelled so the others wind down too. The
//! supervisor then waits for all of them and reports the first failure.

use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{QuotaError, Result};

pub struct Supervisor {
    shutdown: CancellationToken,
    tasks: JoinSet<(&'static str, Result<()>)>,
}

impl Supervisor {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            tasks: JoinSet::new(),
        }
    }

    /// Token handed to supervised tasks
    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a supervised task
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        info!("Starting {}", name);
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Wait for every task to finish
    pub async fn wait(mut self) -> Result<()> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let failure = match joined {
                Ok((name, Ok(()))) => {
                    if self.shutdown.is_cancelled() {
                        info!("{} stopped", name);
                        None
                    } else {
                        Some(QuotaError::TaskFailed(format!("{} exited unexpectedly", name)))
                    }
                }
                Ok((name, Err(e))) => {
                    error!("{} failed: {}", name, e);
                    Some(e)
                }
                Err(e) => {
                    error!("Supervised task panicked: {}", e);
                    Some(QuotaError::TaskFailed(e.to_string()))
                }
            };

            if let Some(e) = failure {
                if !self.shutdown.is_cancelled() {
                    info!("Shutting down remaining tasks");
                    self.shutdown.cancel();
                }
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_clean_shutdown() {
        let shutdown = CancellationToken::new();
        let mut supervisor = Supervisor::new(shutdown.clone());

        for name in ["a", "b"] {
            let token = supervisor.token();
            supervisor.spawn(name, async move {
                token.cancelled().await;
                Ok(())
            });
        }

        shutdown.cancel();
        supervisor.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_cancels_siblings() {
        let shutdown = CancellationToken::new();
        let mut supervisor = Supervisor::new(shutdown.clone());

        let token = supervisor.token();
        supervisor.spawn("waiter", async move {
            token.cancelled().await;
            Ok(())
        });
        supervisor.spawn("failing", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(QuotaError::Config("boom".to_string()))
        });

        let result = supervisor.wait().await;

        assert!(matches!(result, Err(QuotaError::Config(_))));
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_early_exit_is_a_failure() {
        let shutdown = CancellationToken::new();
        let mut supervisor = Supervisor::new(shutdown.clone());

        supervisor.spawn("quitter", async { Ok(()) });

        let result = supervisor.wait().await;

        assert!(matches!(result, Err(QuotaError::TaskFailed(_))));
        assert!(shutdown.is_cancelled());
    }
}
