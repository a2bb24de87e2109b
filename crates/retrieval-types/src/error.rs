use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace.
///
/// Variant choice drives propagation policy: `InvalidArgument` rejects a
/// request before any I/O; `Unavailable` and `Degenerate` are recovered
/// locally by callers that can degrade gracefully (see the orchestrator and
/// the personalizer); `Cancelled` surfaces a deadline expiry; `Internal`
/// denotes an invariant violation and should never be matched on by callers
/// trying to recover.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("degenerate result: {0}")]
    Degenerate(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RetrievalError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::Degenerate(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors a caller can recover from by proceeding without the
    /// failed component (unpersonalized search, one empty source list).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Degenerate(_))
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
