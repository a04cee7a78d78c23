use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

/// Create a linked cancel handle and token
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Requests cooperative cancellation of a run
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace never fails, even with every token dropped
        self.tx.send_replace(true);
    }
}

/// Observed by the orchestrator and executor before dispatching new work
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Token that never fires
    pub fn never() -> Self {
        let (_handle, token) = cancellation();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle
    /// is dropped without cancelling
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Cancels a run on CTRL+C, SIGTERM or an optional deadline.
///
/// Cancellation is cooperative: the pipeline stops dispatching new
/// provider, row and fetch work and returns what it has collected.
pub struct ShutdownCoordinator {
    handle: CancelHandle,
    deadline: Option<Duration>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(handle: CancelHandle, deadline: Option<Duration>) -> Self {
        Self { handle, deadline }
    }

    /// Wait for a shutdown signal or the deadline, then cancel the run
    pub async fn wait_for_shutdown(self) {
        // Setup signal handlers
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, cancelling scrape...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, cancelling scrape...");
            }
            _ = deadline => {
                info!("Run deadline reached, cancelling scrape...");
            }
        }

        self.handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_waiting_tokens() {
        let (handle, token) = cancellation();
        let waiter = token.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        assert!(!token.is_cancelled());
        handle.cancel();
        task.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_the_run() {
        let (handle, token) = cancellation();
        let coordinator = ShutdownCoordinator::new(handle, Some(Duration::from_secs(30)));
        let shutdown = tokio::spawn(coordinator.wait_for_shutdown());

        token.cancelled().await;
        assert!(token.is_cancelled());
        shutdown.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn never_token_stays_quiet() {
        let token = CancelToken::never();
        let fired = tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await;
        assert!(fired.is_err());
        assert!(!token.is_cancelled());
    }
}
