use serde::Serialize;
use std::time::Duration;

use crate::model::VerifierPhase;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Fetch service returned HTTP {status}")]
    NonSuccessStatus { status: u16 },

    #[error("Body read failed after {bytes_received} bytes: {message}")]
    StreamRead { bytes_received: u64, message: String },

    #[error("Deadline of {:.3}s exceeded while {phase}", .after.as_secs_f64())]
    Timeout { phase: VerifierPhase, after: Duration },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Serializable category of a failed run.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    NonSuccessStatus,
    StreamRead,
    Timeout,
    InvalidRequest,
}

impl VerifyError {
    pub fn kind(&self) -> FailureKind {
        match self {
            VerifyError::Connection(_) => FailureKind::Connection,
            VerifyError::NonSuccessStatus { .. } => FailureKind::NonSuccessStatus,
            VerifyError::StreamRead { .. } => FailureKind::StreamRead,
            VerifyError::Timeout { .. } => FailureKind::Timeout,
            VerifyError::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }
}

impl From<reqwest::Error> for VerifyError {
    fn from(e: reqwest::Error) -> Self {
        VerifyError::Connection(error_chain(&e))
    }
}

/// `Display` of an error followed by each of its causes, joined with `: `.
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
