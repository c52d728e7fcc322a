use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    InvalidFormat(String),
    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnavailable,
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("invalid log directive {directive:?}: {reason}")]
    InvalidLevel { directive: String, reason: String },
    #[error("failed to install logger: {0}")]
    Install(String),
}
