use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Thin wrapper over a shared `reqwest::Client` bound to one backend.
///
/// Every call is raced against a cancellation token, so a cancelled caller
/// never waits for the network to give up on its own.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: Arc<str>,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::transport(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: Arc::from(config.api_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}{}", method, self.base_url, path);
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Like [`Transport::request`], for paths carrying user-supplied text.
    /// Each segment is percent-encoded on its own.
    pub fn request_segments(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::transport(format!("Invalid backend URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::transport(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    /// Send and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> ClientResult<T> {
        let response = self.execute(request, cancel).await?;

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            body = response.bytes() => body?,
        };

        serde_json::from_slice(&body).map_err(|e| ClientError::decode(e.to_string()))
    }

    /// Send and discard whatever body comes back.
    pub async fn send_empty(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.execute(request, cancel).await?;
        Ok(())
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> ClientResult<Response> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            body = response.text() => body.unwrap_or_default(),
        };
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            body
        };

        warn!("{} answered {}: {}", url, status.as_u16(), message);
        Err(ClientError::rejected(status.as_u16(), message))
    }
}

/// Race `call` against an optional caller-owned token, on top of whatever
/// token the call itself honours.
pub(crate) async fn cancellable<T>(
    cancel: Option<&CancellationToken>,
    call: impl Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled),
            result = call => result,
        },
        None => call.await,
    }
}
