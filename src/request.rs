use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;
use crate::types::AccessToken;

/// A logical API call, independent of which credential it is sent with.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<JsonValue>,
    headers: HeaderMap,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach an extra header. Overrides the default `Content-Type` if named so.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// One dispatch of an [`ApiRequest`] with a specific bearer credential.
///
/// Attempts are never mutated; [`RequestAttempt::retry_with`] yields a new
/// attempt marked as retried so a request is replayed at most once.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    request: Arc<ApiRequest>,
    bearer: Option<AccessToken>,
    retried: bool,
}

impl RequestAttempt {
    #[must_use]
    pub fn first(request: Arc<ApiRequest>, bearer: Option<AccessToken>) -> Self {
        Self {
            request,
            bearer,
            retried: false,
        }
    }

    /// The replay of this attempt with a fresh token.
    #[must_use]
    pub fn retry_with(&self, token: AccessToken) -> Self {
        Self {
            request: Arc::clone(&self.request),
            bearer: Some(token),
            retried: true,
        }
    }

    #[must_use]
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&AccessToken> {
        self.bearer.as_ref()
    }

    #[must_use]
    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Build the wire request: defaults, caller headers, then the bearer.
    pub(crate) fn to_outbound(&self, url: Url) -> Result<OutboundRequest, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in self.request.headers() {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(token) = &self.bearer {
            let value = HeaderValue::from_str(&token.bearer())
                .map_err(|e| Error::InvalidRequest(format!("access token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let body = self
            .request
            .body()
            .map(serde_json::to_vec)
            .transpose()?
            .map(Bytes::from);

        Ok(OutboundRequest {
            method: self.request.method().clone(),
            url,
            headers,
            body,
        })
    }
}

/// Fully resolved request handed to a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    /// The bearer token this request carries, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Backend response as returned to callers.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    #[must_use]
    pub fn json_body(status: StatusCode, body: &JsonValue) -> Self {
        Self::new(status, body.to_string())
    }

    /// Deserialize the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Human-readable failure detail: the body's `detail` or `message`, else the raw text.
    #[must_use]
    pub fn detail(&self) -> String {
        serde_json::from_slice::<JsonValue>(&self.body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .or_else(|| v.get("message"))
                    .and_then(JsonValue::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| self.text())
    }

    /// Map the status to the crate's error taxonomy. Anything below 400 passes.
    pub(crate) fn error_for_status(self) -> Result<Self, Error> {
        if self.status.as_u16() < 400 {
            return Ok(self);
        }
        let detail = self.detail();
        if self.status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized { detail });
        }
        Err(Error::Status {
            status: self.status.as_u16(),
            detail,
        })
    }
}
