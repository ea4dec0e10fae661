use std::time::Duration;

use thiserror::Error;

use crate::wire::WireError;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Outbound send exceeded its deadline; the message was not delivered.
    #[error("send timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("transport closed")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),
}

pub type TransportResult<T> = Result<T, TransportError>;
