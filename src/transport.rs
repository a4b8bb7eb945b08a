use bytes::Bytes;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::future::Future;

use crate::error::{error_chain, VerifyError};
use crate::model::VerificationRequest;

/// A body read that failed mid-transfer. The verifier decides whether it
/// counts as a connection failure or a stream read failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ReadFault(pub String);

/// Status line, headers and the still-unread body of a response.
pub struct TransportResponse<B> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: B,
}

/// Issues the probe request.
pub trait Transport {
    type Body: BodyReader;

    /// POST the request's JSON payload and resolve once headers have arrived.
    fn send(
        &self,
        request: &VerificationRequest,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, VerifyError>> + Send;
}

/// Incremental access to a response body.
pub trait BodyReader {
    /// Next unit the transport delivered (at least one byte), or `None` at
    /// end of stream.
    fn read_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>, ReadFault>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, VerifyError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    type Body = ReqwestBody;

    async fn send(
        &self,
        request: &VerificationRequest,
    ) -> Result<TransportResponse<ReqwestBody>, VerifyError> {
        let response = self
            .client
            .post(&request.endpoint)
            .header(USER_AGENT, &request.user_agent)
            .json(&request.payload())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = value
                    .to_str()
                    .map(str::to_string)
                    .unwrap_or_else(|_| String::from_utf8_lossy(value.as_bytes()).into_owned());
                (name.as_str().to_string(), value)
            })
            .collect();

        Ok(TransportResponse {
            status,
            headers,
            body: ReqwestBody { response },
        })
    }
}

/// Reads a reqwest body one decoded frame at a time.
///
/// Each `chunk()` resolves as soon as the connection delivers data, so frame
/// boundaries follow the server's flushes rather than a fixed buffer size.
pub struct ReqwestBody {
    response: reqwest::Response,
}

impl BodyReader for ReqwestBody {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ReadFault> {
        loop {
            match self.response.chunk().await {
                Ok(Some(chunk)) if chunk.is_empty() => continue,
                Ok(chunk) => return Ok(chunk),
                Err(e) => return Err(ReadFault(error_chain(&e))),
            }
        }
    }
}
