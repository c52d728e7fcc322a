use std::{io, path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;

/// Error type accepted from work functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failure of a looping call, shared by every waiter.
#[derive(Error, Debug, Clone)]
pub enum LoopError {
    #[error("looping call failed: {0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),
    #[error("invocation exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
    #[error("looping call ended without reporting an outcome")]
    Abandoned,
    #[error("looping call already started")]
    AlreadyStarted,
    #[error("looping call has not been started")]
    NotStarted,
    #[error("no tokio runtime available to drive the looping call")]
    NoRuntime,
}

impl LoopError {
    pub(crate) fn failed(err: BoxError) -> Self {
        LoopError::Failed(Arc::from(err))
    }

    /// Borrow the work function's error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            LoopError::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to read lock directory {}: {source}", .path.display())]
    LockDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid lock pattern: {0}")]
    Pattern(#[from] regex::Error),
}
