//! Request cancellation for store I/O.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::DomainError;

/// Cancellation signal shared by everything serving one request.
///
/// Clones observe the same signal. Cancelling is permanent.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state: Arc::new(state) }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut updates = self.state.subscribe();
        // The sender lives in `self`, so this only returns once the flag is set.
        let _ = updates.wait_for(|cancelled| *cancelled).await;
    }
}

/// Races `fut` against `token`. A cancelled request fails with
/// [`DomainError::Cancelled`]; the store discards whatever the unfinished
/// transaction wrote.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DomainError::Cancelled),
        result = fut => result,
    }
}
