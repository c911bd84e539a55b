use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::events::{Notice, Reply, Request};

/// Why a remote request produced no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    /// The deadline elapsed without a reply.
    Timeout,
    /// The participant's session is gone; no reply will ever come.
    Closed,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Timeout => f.write_str("request timed out"),
            CallError::Closed => f.write_str("connection closed"),
        }
    }
}

impl std::error::Error for CallError {}

/// The engine's only window to a participant: ask one question and await
/// one answer within a deadline, or push a one-way notice. The engine never
/// manages the session behind the handle.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn call(&self, request: Request, timeout: Duration) -> Result<Reply, CallError>;

    fn notify(&self, notice: &Notice);
}
