use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::request::{ApiResponse, OutboundRequest};

/// Network seam between [`ApiClient`](crate::ApiClient) and the backend.
///
/// Implementations return the backend's response for *every* status code;
/// `Err` is reserved for failures where no response was received.
///
/// # Example
///
/// ```rust,ignore
/// impl Transport for RecordingTransport {
///     async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, Error> {
///         self.seen.lock().push(request.url.to_string());
///         Ok(ApiResponse::new(StatusCode::OK, "{}"))
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<ApiResponse, Error>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<ApiResponse, Error>> + Send {
        (**self).send(request)
    }
}

/// [`Transport`] backed by a `reqwest::Client`.
#[cfg(feature = "reqwest")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}

#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, Error> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
