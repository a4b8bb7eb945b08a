use clap::Parser;
use std::time::Duration;

use crate::error::VerifyError;
use crate::model::VerificationRequest;

/// Stream verifier: checks whether a fetch service delivers response bodies incrementally.
#[derive(Parser, Debug, Clone)]
#[command(name = "stream-verifier")]
pub struct CliArgs {
    /// Fetch service endpoint to POST the probe to
    #[arg(short = 'e', long = "endpoint", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// URL the fetch service is asked to retrieve
    #[arg(short = 't', long = "target-url", default_value = DEFAULT_TARGET_URL)]
    pub target_url: String,

    /// Timeout forwarded to the fetch service in the request body
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// User-Agent header sent with the probe
    #[arg(long = "user-agent", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Minimum gap between TTFB and completion for a transfer to count as streamed
    #[arg(long = "threshold-secs", default_value_t = DEFAULT_STREAMING_THRESHOLD_SECS)]
    pub threshold_secs: f64,

    /// Number of leading samples kept for the report
    #[arg(short = 'n', long = "samples", default_value_t = DEFAULT_SAMPLE_RETENTION)]
    pub samples: usize,

    /// Local deadline for the whole run (defaults to timeout-ms plus a grace period)
    #[arg(long = "deadline-secs")]
    pub deadline_secs: Option<f64>,

    /// Print the result as JSON instead of the text report
    #[arg(long = "json")]
    pub json: bool,
}

pub struct VerifierConfig {
    pub request: VerificationRequest,
    pub settings: VerifierSettings,
    pub json_output: bool,
}

/// Knobs for a verification run that are not part of the request itself.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierSettings {
    pub threshold: Duration,
    pub sample_retention: usize,
    /// Explicit local deadline. `None` derives one from the request timeout.
    pub deadline: Option<Duration>,
}

// Request defaults
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/v1/fetch";
pub const DEFAULT_TARGET_URL: &str =
    "https://httpbin.org/drip?duration=2&numbytes=10&code=200&delay=0";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_USER_AGENT: &str = "SCAPI-Verifier";

// Classification defaults
pub const DEFAULT_STREAMING_THRESHOLD_SECS: f64 = 0.5;
pub const DEFAULT_SAMPLE_RETENTION: usize = 5;

// Deadline constants
pub const DEADLINE_GRACE_SECS: u64 = 5;

// Metadata headers set by the fetch service
pub const SERVICE_STATUS_HEADER: &str = "x-scapi-status-code";
pub const SERVICE_FINAL_URL_HEADER: &str = "x-scapi-final-url";
pub const SERVICE_TIMESTAMP_HEADER: &str = "x-scapi-timestamp";

impl VerifierConfig {
    pub fn from_args(args: CliArgs) -> Result<Self, VerifyError> {
        let threshold = secs_to_duration(args.threshold_secs, "threshold-secs")?;
        let deadline = args
            .deadline_secs
            .map(|secs| secs_to_duration(secs, "deadline-secs"))
            .transpose()?;

        let request = VerificationRequest::new(
            args.endpoint,
            args.target_url,
            args.timeout_ms,
            args.user_agent,
        )?;

        Ok(VerifierConfig {
            request,
            settings: VerifierSettings {
                threshold,
                sample_retention: args.samples,
                deadline,
            },
            json_output: args.json,
        })
    }
}

impl VerifierSettings {
    /// The local deadline for a run: the explicit one if set, otherwise the
    /// service-side timeout plus [`DEADLINE_GRACE_SECS`].
    pub fn effective_deadline(&self, request: &VerificationRequest) -> Duration {
        self.deadline.unwrap_or_else(|| {
            Duration::from_millis(request.timeout_ms) + Duration::from_secs(DEADLINE_GRACE_SECS)
        })
    }
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            threshold: Duration::from_secs_f64(DEFAULT_STREAMING_THRESHOLD_SECS),
            sample_retention: DEFAULT_SAMPLE_RETENTION,
            deadline: None,
        }
    }
}

fn secs_to_duration(secs: f64, flag: &str) -> Result<Duration, VerifyError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        VerifyError::InvalidRequest(format!(
            "--{} must be a non-negative number, got {}",
            flag, secs
        ))
    })
}
