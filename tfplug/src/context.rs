//! Request-scoped cancellation and deadlines
//!
//! The gRPC server owns a root Context that StopProvider cancels. Every
//! request receives a clone, so long-running provider work (polling remote
//! tasks, waiting on backoff) can stop early.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries cancellation and an optional deadline across async calls
/// Pass this as the first parameter to provider trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done,
            }),
        }
    }

    /// Derives a context that is cancelled when this one is, or when the
    /// timeout elapses, whichever comes first
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let (done, _) = watch::channel(self.is_cancelled());
        let child = Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done,
            }),
        };

        let parent = self.clone();
        let signal = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent.cancelled() => {}
                _ = signal.cancelled() => return,
            }
            signal.cancel();
        });

        child
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.inner.done.subscribe();
        if rx.wait_for(|done| *done).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub fn cancel(&self) {
        self.inner.done.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
