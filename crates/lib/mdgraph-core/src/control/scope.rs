//! Deadlines and cancellation for control-plane calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::ControlError;

/// Cooperative cancellation signal shared between a caller and its calls.
///
/// Clones observe the same state; once cancelled a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Returns a token that is cancelled when `signal` completes.
    ///
    /// The signal is watched on a spawned task, which ends once the signal
    /// fires, the token is cancelled some other way, or every clone of the
    /// token is dropped. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn linked<S>(signal: S) -> Self
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let token = Self::new();
        let state = Arc::downgrade(&token.state);
        let mut changes = token.state.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                () = signal => {
                    if let Some(state) = state.upgrade() {
                        state.send_replace(true);
                    }
                }
                // Errors once the last token clone drops the sender.
                _ = changes.changed() => {}
            }
        });
        token
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Bounds a control-plane call by an optional deadline and cancel token.
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl CallScope {
    /// A scope with no deadline and no cancellation.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Builds a scope from an optional timeout; `None` means unbounded.
    #[must_use]
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::unbounded, Self::with_timeout)
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `operation`, aborting it when the deadline passes or the token is
    /// cancelled. Cancellation takes priority over completion.
    ///
    /// # Errors
    /// Returns `ControlError::Canceled` or `ControlError::DeadlineExceeded`
    /// when the scope ends first, otherwise the operation's own result.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, ControlError>
    where
        F: Future<Output = Result<T, ControlError>>,
    {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ControlError::Canceled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, operation).await {
                    Ok(result) => result,
                    Err(_) => Err(ControlError::DeadlineExceeded),
                },
                None => operation.await,
            }
        };

        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(ControlError::Canceled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}
