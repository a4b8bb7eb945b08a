use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::config::{SERVICE_FINAL_URL_HEADER, SERVICE_STATUS_HEADER, SERVICE_TIMESTAMP_HEADER};
use crate::error::{FailureKind, VerifyError};

// ============================================================================
// Request
// ============================================================================

/// Inputs to one verification run. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationRequest {
    pub endpoint: String,
    pub target_url: String,
    /// Forwarded to the fetch service; not enforced locally.
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl VerificationRequest {
    pub fn new(
        endpoint: impl Into<String>,
        target_url: impl Into<String>,
        timeout_ms: u64,
        user_agent: impl Into<String>,
    ) -> Result<Self, VerifyError> {
        if timeout_ms == 0 {
            return Err(VerifyError::InvalidRequest(
                "timeout_ms must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            endpoint: endpoint.into(),
            target_url: target_url.into(),
            timeout_ms,
            user_agent: user_agent.into(),
        })
    }

    pub fn payload(&self) -> FetchPayload<'_> {
        FetchPayload {
            url: &self.target_url,
            timeout_ms: self.timeout_ms,
        }
    }
}

/// JSON body POSTed to the fetch service.
#[derive(Debug, Serialize)]
pub struct FetchPayload<'a> {
    pub url: &'a str,
    pub timeout_ms: u64,
}

// ============================================================================
// Samples
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ByteArrivalSample {
    /// 1-based, increases by exactly one per read that returned data.
    pub sequence_number: u64,
    /// Seconds since dispatch, taken when the read completed.
    pub elapsed_seconds: f64,
    #[serde(serialize_with = "serialize_payload")]
    pub payload: Bytes,
}

fn serialize_payload<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&escape_payload(payload))
}

/// Render raw bytes as printable ASCII, escaping everything else (`\n`, `\x00`, ...).
pub fn escape_payload(payload: &[u8]) -> String {
    payload
        .iter()
        .flat_map(|b| std::ascii::escape_default(*b))
        .map(char::from)
        .collect()
}

// ============================================================================
// Run state
// ============================================================================

/// Where a run is in its lifecycle. A failure can end the run from any phase
/// before `Done`; nothing ever returns to `Sending`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifierPhase {
    Idle,
    Sending,
    AwaitingHeaders,
    ReadingBody,
    Done,
}

impl fmt::Display for VerifierPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VerifierPhase::Idle => "idle",
            VerifierPhase::Sending => "sending request",
            VerifierPhase::AwaitingHeaders => "awaiting response headers",
            VerifierPhase::ReadingBody => "reading response body",
            VerifierPhase::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Streamed,
    Buffered,
    Failed,
}

impl Classification {
    /// Process exit status for a finished run.
    pub fn exit_code(&self) -> u8 {
        match self {
            Classification::Streamed => 0,
            Classification::Buffered => 1,
            Classification::Failed => 2,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Streamed => "STREAMED",
            Classification::Buffered => "BUFFERED",
            Classification::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Result
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&VerifyError> for FailureDetail {
    fn from(e: &VerifyError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Metadata the fetch service reports about its own upstream fetch.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ServiceMetadata {
    pub upstream_status: Option<u16>,
    pub final_url: Option<String>,
    pub fetched_at: Option<String>,
}

impl ServiceMetadata {
    /// Pick the fetch service's metadata out of the response headers.
    pub fn from_headers(headers: &[(String, String)]) -> Self {
        let find = |wanted: &str| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
                .map(|(_, value)| value.trim().to_string())
        };

        Self {
            upstream_status: find(SERVICE_STATUS_HEADER).and_then(|v| v.parse().ok()),
            final_url: find(SERVICE_FINAL_URL_HEADER),
            fetched_at: find(SERVICE_TIMESTAMP_HEADER),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upstream_status.is_none() && self.final_url.is_none() && self.fetched_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub endpoint: String,
    pub target_url: String,
    pub http_status: Option<u16>,
    /// Header arrival. Diagnostic only, never used as TTFB.
    pub headers_elapsed_seconds: Option<f64>,
    /// First body byte. Absent when no body byte arrived.
    pub time_to_first_byte_seconds: Option<f64>,
    pub total_elapsed_seconds: f64,
    pub total_bytes: u64,
    pub sample_count: u64,
    pub classification: Classification,
    pub threshold_seconds: f64,
    pub margin_seconds: Option<f64>,
    pub first_samples: Vec<ByteArrivalSample>,
    pub headers: Vec<(String, String)>,
    pub service: ServiceMetadata,
    pub failure: Option<FailureDetail>,
}
