/// Caller-supplied cancellation and deadline for a build
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Why a build context is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    Cancelled,
    DeadlineExceeded,
}

impl DoneReason {
    /// The error reported when a build of `cluster` stops for this reason
    pub fn into_error(self, cluster: &str) -> Error {
        match self {
            DoneReason::Cancelled => Error::Cancelled {
                cluster: cluster.to_string(),
            },
            DoneReason::DeadlineExceeded => Error::DeadlineExceeded {
                cluster: cluster.to_string(),
            },
        }
    }
}

/// Cancellation signal plus optional deadline, checked at every suspension point
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl BuildContext {
    /// A context that is only done when cancelled
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Use an existing token, e.g. one tied to Ctrl-C handling
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check. Cancellation wins over an elapsed deadline.
    pub fn done(&self) -> Option<DoneReason> {
        if self.cancel.is_cancelled() {
            return Some(DoneReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DoneReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn finished(&self) -> DoneReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => DoneReason::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => DoneReason::DeadlineExceeded,
                }
            }
            None => {
                self.cancel.cancelled().await;
                DoneReason::Cancelled
            }
        }
    }

    /// Run `fut` unless the context finishes first
    pub async fn run<T, F>(&self, cluster: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(reason) = self.done() {
            return Err(reason.into_error(cluster));
        }
        tokio::select! {
            biased;
            reason = self.finished() => Err(reason.into_error(cluster)),
            result = fut => result,
        }
    }
}
