//! Error taxonomy for handle retrieval
//!
//! Every failure surfaces through a handle's `get` call as a [`ParError`].
//! Callers can tell "still running" (a timeout) apart from "failed" (an
//! execution error) and from "cancelled".

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result alias for handle retrieval
pub type ParResult<T> = std::result::Result<T, ParError>;

#[derive(Debug, Clone, Error)]
pub enum ParError {
    /// A bounded `get` ran out of budget before the value was available
    #[error("timed out waiting {0:?} for result")]
    Timeout(Duration),

    /// The supplier, forked task or combining function failed
    #[error("computation failed: {0:#}")]
    Execution(Arc<anyhow::Error>),

    /// The task behind the handle was cancelled
    #[error("computation was cancelled")]
    Cancelled,
}

impl ParError {
    pub fn execution(error: anyhow::Error) -> Self {
        ParError::Execution(Arc::new(error))
    }

    /// Convert a caught panic payload, keeping its message when it has one
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ParError::execution(anyhow::anyhow!("panicked: {message}"))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ParError::Timeout(_))
    }

    /// The underlying failure for execution errors
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            ParError::Execution(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}
