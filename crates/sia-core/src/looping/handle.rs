use std::fmt;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::LoopError;
use crate::looping::Exit;

pub(crate) type Outcome<T> = Result<Exit<T>, LoopError>;

/// Write side of the completion cell.
///
/// `resolve` consumes the resolver, so an outcome is published at most once.
/// Dropping it unresolved closes the channel and waiters observe [`LoopError::Abandoned`].
pub(crate) struct Resolver<T> {
    tx: watch::Sender<Option<Outcome<T>>>,
}

impl<T> Resolver<T> {
    pub(crate) fn resolve(self, outcome: Outcome<T>) {
        self.tx.send_replace(Some(outcome));
    }
}

/// Caller-side view of a started looping call.
///
/// Handles are cheap to clone; every clone observes the same outcome.
pub struct LoopingCallHandle<T> {
    rx: watch::Receiver<Option<Outcome<T>>>,
    running: CancellationToken,
}

pub(crate) fn completion<T>(running: CancellationToken) -> (Resolver<T>, LoopingCallHandle<T>) {
    let (tx, rx) = watch::channel(None);
    (Resolver { tx }, LoopingCallHandle { rx, running })
}

impl<T> fmt::Debug for LoopingCallHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopingCallHandle")
            .field("finished", &self.is_finished())
            .field("stop_requested", &self.running.is_cancelled())
            .finish()
    }
}

impl<T> Clone for LoopingCallHandle<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            running: self.running.clone(),
        }
    }
}

impl<T: Clone> LoopingCallHandle<T> {
    /// Wait until the loop terminates and return its outcome.
    ///
    /// Suspends only the calling task.
    pub async fn wait(&self) -> Result<Exit<T>, LoopError> {
        let mut rx = self.rx.clone();
        let resolved = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        resolved.unwrap_or(Err(LoopError::Abandoned))
    }
}

impl<T> LoopingCallHandle<T> {
    /// Request a cooperative stop. Same semantics as [`LoopingCall::stop`](crate::LoopingCall::stop).
    pub fn stop(&self) {
        self.running.cancel();
    }

    /// Returns `true` once an outcome is available (or can never become available).
    pub fn is_finished(&self) -> bool {
        self.rx.borrow().is_some() || self.rx.has_changed().is_err()
    }
}
