use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::transport::TransportError;

/// Cancellation and deadline for a single check.
///
/// Cancelling the token or reaching the deadline aborts the in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CheckContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drives `fut` until it completes, the context is done, or `budget`
    /// runs out, whichever comes first.
    pub(crate) async fn run<F, T>(&self, budget: Budget, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TransportError::Cancelled),
            _ = deadline => Err(TransportError::DeadlineExceeded),
            outcome = timeout_at(budget.until, fut) => {
                outcome.unwrap_or(Err(TransportError::Timeout(budget.timeout)))
            }
        }
    }
}

/// Overall time allowed for one check, shared by all its phases.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    pub until: Instant,
    pub timeout: Duration,
}

impl Budget {
    pub fn starting_now(timeout: Duration) -> Self {
        Self {
            until: Instant::now() + timeout,
            timeout,
        }
    }
}
