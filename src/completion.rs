//! One-shot delivery of a request's outcome.
//!
//! Several event sources (stderr data, process exit, validation) may try to
//! report a result for the same request. `Settle` lets the first one through
//! and drops the rest; `Completion` is the receiving end handed to callers.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Result, SayError};

/// Sending half. Cheap to clone; every clone shares the same slot.
#[derive(Clone)]
pub(crate) struct Settle {
    slot: Arc<Mutex<Option<oneshot::Sender<Result<()>>>>>,
}

impl Settle {
    /// Deliver `result` unless something was already delivered.
    /// Returns true if this call won.
    pub(crate) fn settle(&self, result: Result<()>) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => {
                // The receiver may be gone; the request still counts as settled.
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }
}

/// Outcome of a speak/export/stop/pause/resume request.
///
/// Await it for the `Result`, or pass a callback to [`Completion::then`].
#[must_use = "a Completion does nothing unless awaited or given a callback"]
pub struct Completion {
    rx: oneshot::Receiver<Result<()>>,
}

impl Completion {
    pub(crate) fn channel() -> (Settle, Completion) {
        let (tx, rx) = oneshot::channel();
        let settle = Settle {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (settle, Completion { rx })
    }

    /// A completion that already holds its result. Callers still only see it
    /// once they poll, never inline.
    pub(crate) fn ready(result: Result<()>) -> Completion {
        let (settle, completion) = Self::channel();
        settle.settle(result);
        completion
    }

    /// Invoke `callback` exactly once with the outcome, from a spawned task.
    /// Must be called within a Tokio runtime.
    pub fn then<F>(self, callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        tokio::spawn(async move {
            callback(self.await);
        })
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SayError::Cancelled)))
    }
}
