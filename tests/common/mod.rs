#![allow(dead_code)]

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stream_verifier::error::VerifyError;
use stream_verifier::model::VerificationRequest;
use stream_verifier::transport::{BodyReader, ReadFault, Transport, TransportResponse};

/// One scripted body event. Delays are measured from the previous event.
#[derive(Debug, Clone)]
pub enum BodyEvent {
    Chunk(Duration, Bytes),
    Fault(Duration, String),
    /// Never resolves.
    Stall,
}

/// In-memory fetch service double driven by a fixed script.
#[derive(Clone)]
pub struct ScriptedTransport {
    header_delay: Duration,
    connect_error: Option<String>,
    status: u16,
    headers: Vec<(String, String)>,
    events: Vec<BodyEvent>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn ok(header_delay: Duration, events: Vec<BodyEvent>) -> Self {
        Self {
            header_delay,
            connect_error: None,
            status: 200,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            events,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn status(status: u16) -> Self {
        let mut transport = Self::ok(Duration::ZERO, vec![chunk_at_ms(0, b"never read")]);
        transport.status = status;
        transport
    }

    pub fn refused(message: &str) -> Self {
        let mut transport = Self::ok(Duration::ZERO, vec![]);
        transport.connect_error = Some(message.to_string());
        transport
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Number of body reads attempted so far, shared across clones.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

pub struct ScriptedBody {
    events: VecDeque<BodyEvent>,
    reads: Arc<AtomicUsize>,
}

impl Transport for ScriptedTransport {
    type Body = ScriptedBody;

    async fn send(
        &self,
        _request: &VerificationRequest,
    ) -> Result<TransportResponse<ScriptedBody>, VerifyError> {
        tokio::time::sleep(self.header_delay).await;

        if let Some(message) = &self.connect_error {
            return Err(VerifyError::Connection(message.clone()));
        }

        Ok(TransportResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: ScriptedBody {
                events: self.events.iter().cloned().collect(),
                reads: self.reads.clone(),
            },
        })
    }
}

impl BodyReader for ScriptedBody {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ReadFault> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.events.pop_front() {
            None => Ok(None),
            Some(BodyEvent::Chunk(delay, bytes)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(bytes))
            }
            Some(BodyEvent::Fault(delay, message)) => {
                tokio::time::sleep(delay).await;
                Err(ReadFault(message))
            }
            Some(BodyEvent::Stall) => std::future::pending().await,
        }
    }
}

pub fn chunk_at_ms(delay_ms: u64, bytes: &'static [u8]) -> BodyEvent {
    BodyEvent::Chunk(Duration::from_millis(delay_ms), Bytes::from_static(bytes))
}

/// `count` single bytes, each preceded by `gap_ms`.
pub fn drip(count: usize, gap_ms: u64) -> Vec<BodyEvent> {
    (0..count).map(|_| chunk_at_ms(gap_ms, b"*")).collect()
}

pub fn request() -> VerificationRequest {
    VerificationRequest::new(
        "http://localhost:3000/api/v1/fetch",
        "https://httpbin.org/drip?duration=2&numbytes=10&code=200&delay=0",
        10_000,
        "SCAPI-Verifier",
    )
    .unwrap()
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 0.01
}
