use chrono::Utc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::VerifierSettings;
use crate::error::VerifyError;
use crate::model::{
    Classification, FailureDetail, ServiceMetadata, VerificationRequest, VerificationResult,
    VerifierPhase,
};
use crate::recorder::SampleRecorder;
use crate::transport::{BodyReader, Transport};

/// Roughly 30 years; deadlines past this are treated as unbounded.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Probes a fetch service once and classifies how it delivered the body.
pub struct StreamingVerifier<T> {
    transport: T,
    settings: VerifierSettings,
}

/// Mutable bookkeeping for a single run.
struct Run {
    phase: VerifierPhase,
    started: Instant,
    deadline: Instant,
    recorder: SampleRecorder,
    http_status: Option<u16>,
    headers_elapsed_seconds: Option<f64>,
    headers: Vec<(String, String)>,
}

impl Run {
    fn enter(&mut self, phase: VerifierPhase) {
        debug!("Verifier phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn timed_out(&self) -> VerifyError {
        VerifyError::Timeout {
            phase: self.phase,
            after: self.deadline.duration_since(self.started),
        }
    }
}

impl<T: Transport> StreamingVerifier<T> {
    pub fn new(transport: T, settings: VerifierSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Run one probe. Never fails: transport faults, bad statuses and
    /// deadline expiry all come back as a `Failed` result.
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            "Sending request to {} targeting {} (run {})",
            request.endpoint, request.target_url, run_id
        );

        let started = Instant::now();
        let mut run = Run {
            phase: VerifierPhase::Idle,
            started,
            deadline: deadline_from(started, self.settings.effective_deadline(request)),
            recorder: SampleRecorder::new(self.settings.sample_retention),
            http_status: None,
            headers_elapsed_seconds: None,
            headers: Vec::new(),
        };

        let outcome = self.drive(request, &mut run).await;
        // Dropping the transport response inside `drive` has already released the connection.
        let total_elapsed_seconds = run
            .elapsed_seconds()
            .max(run.recorder.last_elapsed_seconds());
        let ttfb = run.recorder.first_byte_seconds();
        let threshold = self.settings.threshold;

        let (classification, margin_seconds, failure) = match outcome {
            Ok(()) => {
                let verdict = classify(ttfb, total_elapsed_seconds, threshold);
                info!(
                    "Run {} classified {} (ttfb={}, total={:.4}s, bytes={})",
                    run_id,
                    verdict.classification,
                    format_secs(ttfb),
                    total_elapsed_seconds,
                    run.recorder.total_bytes()
                );
                (verdict.classification, verdict.margin_seconds, None)
            }
            Err(e) => {
                warn!("Run {} failed: {}", run_id, e);
                (
                    Classification::Failed,
                    ttfb.map(|t| total_elapsed_seconds - t),
                    Some(FailureDetail::from(&e)),
                )
            }
        };

        let service = ServiceMetadata::from_headers(&run.headers);
        VerificationResult {
            run_id,
            started_at,
            endpoint: request.endpoint.clone(),
            target_url: request.target_url.clone(),
            http_status: run.http_status,
            headers_elapsed_seconds: run.headers_elapsed_seconds,
            time_to_first_byte_seconds: ttfb,
            total_elapsed_seconds,
            total_bytes: run.recorder.total_bytes(),
            sample_count: run.recorder.sample_count(),
            classification,
            threshold_seconds: threshold.as_secs_f64(),
            margin_seconds,
            first_samples: run.recorder.into_samples(),
            headers: run.headers,
            service,
            failure,
        }
    }

    async fn drive(
        &self,
        request: &VerificationRequest,
        run: &mut Run,
    ) -> Result<(), VerifyError> {
        run.enter(VerifierPhase::Sending);
        let pending = self.transport.send(request);

        run.enter(VerifierPhase::AwaitingHeaders);
        let response = match timeout_at(run.deadline, pending).await {
            Ok(response) => response?,
            Err(_) => return Err(run.timed_out()),
        };

        run.headers_elapsed_seconds = Some(run.elapsed_seconds());
        run.http_status = Some(response.status);
        run.headers = response.headers;
        debug!(
            "Headers received after {:.4}s: HTTP {}",
            run.elapsed_seconds(),
            response.status
        );

        if response.status != 200 {
            return Err(VerifyError::NonSuccessStatus {
                status: response.status,
            });
        }

        run.enter(VerifierPhase::ReadingBody);
        let mut body = response.body;
        loop {
            let chunk = match timeout_at(run.deadline, body.read_chunk()).await {
                Err(_) => return Err(run.timed_out()),
                Ok(Err(fault)) if run.recorder.sample_count() == 0 => {
                    return Err(VerifyError::Connection(format!(
                        "connection closed before the first body byte: {}",
                        fault
                    )));
                }
                Ok(Err(fault)) => {
                    return Err(VerifyError::StreamRead {
                        bytes_received: run.recorder.total_bytes(),
                        message: fault.to_string(),
                    });
                }
                Ok(Ok(None)) => break,
                Ok(Ok(Some(chunk))) => chunk,
            };
            let elapsed = run.elapsed_seconds();
            run.recorder.record(chunk, elapsed);
        }

        run.enter(VerifierPhase::Done);
        Ok(())
    }
}

/// `started + limit`, capped at [`FAR_FUTURE`] so huge limits cannot overflow the instant.
fn deadline_from(started: Instant, limit: Duration) -> Instant {
    started
        .checked_add(limit.min(FAR_FUTURE))
        .unwrap_or_else(|| started + FAR_FUTURE)
}

fn format_secs(secs: Option<f64>) -> String {
    match secs {
        Some(s) => format!("{:.4}s", s),
        None => "n/a".to_string(),
    }
}
