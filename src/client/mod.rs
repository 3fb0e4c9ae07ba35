//! Authenticated API client.
//!
//! Every call flows through [`ApiClient::request`]:
//!
//! 1. attach the stored access token, or short-circuit with
//!    [`Error::Unauthenticated`] for non-exempt paths;
//! 2. dispatch through the [`Transport`];
//! 3. on a first 401, refresh the session through the shared
//!    [`RefreshCoordinator`] (or wait on the refresh already running) and
//!    replay the request once with the new token.

mod auth;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::navigator::{LogNavigator, LoginNavigator};
use crate::refresh::{RefreshCoordinator, RefreshError, RefreshOutcome, RefreshTicket};
use crate::request::{ApiRequest, ApiResponse, RequestAttempt};
use crate::store::{CredentialStore, Credentials, Session};
use crate::transport::Transport;
use crate::types::{AccessToken, RefreshToken};

/// Pharmacy backend client with transparent token refresh.
///
/// Cheap to share: wrap it in an `Arc` and issue requests from any task.
pub struct ApiClient<T> {
    config: ClientConfig,
    transport: T,
    credentials: Credentials,
    navigator: Arc<dyn LoginNavigator>,
    coordinator: Arc<RefreshCoordinator>,
}

/// Body of a successful refresh exchange.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

#[cfg(feature = "reqwest")]
impl ApiClient<crate::transport::ReqwestTransport> {
    /// Client over a default `reqwest::Client`.
    #[must_use]
    pub fn with_reqwest(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self::new(config, crate::transport::ReqwestTransport::new(), store)
    }
}

impl<T: Transport> ApiClient<T> {
    #[must_use]
    pub fn new(config: ClientConfig, transport: T, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            transport,
            credentials: Credentials::new(store),
            navigator: Arc::new(LogNavigator),
            coordinator: Arc::new(RefreshCoordinator::new()),
        }
    }

    /// Route login redirects to the embedding UI.
    #[must_use]
    pub fn with_navigator(mut self, navigator: impl LoginNavigator) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// Share a refresh coordinator with other clients on the same session.
    #[must_use]
    pub fn with_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
        self.coordinator = coordinator;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Current stored session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.credentials.session()
    }

    /// Whether a restored session holds both a token and a role.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// Perform `request`, refreshing the session once if the backend answers 401.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthenticated`] if no token is stored and the path is not exempt
    /// - [`Error::Unauthorized`] if the replay after a refresh is also rejected
    /// - [`Error::NoRefreshToken`] / [`Error::RefreshFailed`] if the session could not be renewed
    /// - [`Error::Status`] for any other non-success status, never retried
    /// - [`Error::Http`] / [`Error::Transport`] on network failure
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let attempt = self.authorize(Arc::new(request))?;

        match self.dispatch(&attempt).await {
            Err(Error::Unauthorized { detail }) if self.is_recoverable(&attempt) => {
                tracing::debug!(
                    path = %attempt.request().path(),
                    detail = %detail,
                    "Request unauthorized; renewing session"
                );
                self.recover(&attempt).await
            }
            other => other,
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, Error> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: JsonValue) -> Result<ApiResponse, Error> {
        self.request(ApiRequest::post(path).with_json(body)).await
    }

    pub async fn put(&self, path: &str, body: JsonValue) -> Result<ApiResponse, Error> {
        self.request(ApiRequest::put(path).with_json(body)).await
    }

    pub async fn patch(&self, path: &str, body: JsonValue) -> Result<ApiResponse, Error> {
        self.request(ApiRequest::patch(path).with_json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, Error> {
        self.request(ApiRequest::delete(path)).await
    }

    /// `GET` and deserialize the body.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        self.get(path).await?.json()
    }

    /// Build the first attempt, or refuse an anonymous call to a protected path.
    fn authorize(&self, request: Arc<ApiRequest>) -> Result<RequestAttempt, Error> {
        let token = self.credentials.access_token();
        if token.is_none() && !self.config.is_exempt(request.path()) {
            tracing::warn!(path = %request.path(), "No access token; request refused");
            self.navigator.redirect_to_login(&self.config.login_redirect);
            return Err(Error::Unauthenticated);
        }
        Ok(RequestAttempt::first(request, token))
    }

    /// A 401 on a login/refresh call is a credential failure, never a refresh trigger.
    fn is_recoverable(&self, attempt: &RequestAttempt) -> bool {
        !attempt.retried() && !self.config.is_exempt(attempt.request().path())
    }

    async fn dispatch(&self, attempt: &RequestAttempt) -> Result<ApiResponse, Error> {
        let url = self.config.endpoint(attempt.request().path())?;
        let outbound = attempt.to_outbound(url)?;

        tracing::debug!(
            method = %outbound.method,
            url = %outbound.url,
            retried = attempt.retried(),
            "Dispatching request"
        );

        let response = self.transport.send(outbound).await?;
        tracing::debug!(status = response.status.as_u16(), "Response received");
        response.error_for_status()
    }

    async fn recover(&self, attempt: &RequestAttempt) -> Result<ApiResponse, Error> {
        let token = loop {
            // An episode settled between dispatch and the 401.
            if let Some(current) = self.newer_token(attempt) {
                tracing::debug!("Access token changed since dispatch; replaying without refresh");
                break current;
            }

            match self.coordinator.acquire() {
                RefreshTicket::Follower(waiter) => match waiter.wait().await {
                    // The leader went away without a verdict; the session is untouched.
                    Err(RefreshError::Abandoned) => {
                        tracing::debug!("Refresh leader abandoned the episode; retrying");
                    }
                    outcome => break outcome?,
                },
                RefreshTicket::Leader(lease) => {
                    // An episode may have settled between the check above and `acquire`.
                    if let Some(current) = self.newer_token(attempt) {
                        lease.settle(&Ok(current.clone()));
                        break current;
                    }
                    let outcome = self.refresh_session().await;
                    lease.settle(&outcome);
                    break outcome?;
                }
            }
        };

        self.replay(attempt, token).await
    }

    /// The stored access token, if it differs from the one `attempt` was sent with.
    fn newer_token(&self, attempt: &RequestAttempt) -> Option<AccessToken> {
        self.credentials
            .access_token()
            .filter(|current| attempt.bearer() != Some(current))
    }

    async fn replay(
        &self,
        attempt: &RequestAttempt,
        token: AccessToken,
    ) -> Result<ApiResponse, Error> {
        let retry = attempt.retry_with(token);
        self.dispatch(&retry).await
    }

    /// Run the refresh exchange under the configured timeout and apply its session effects.
    ///
    /// On failure the whole store is wiped and the user is sent to login before
    /// queued callers observe the error.
    async fn refresh_session(&self) -> RefreshOutcome {
        let outcome = match self.config.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange_refresh_token())
                .await
                .unwrap_or(Err(RefreshError::TimedOut(limit))),
            None => self.exchange_refresh_token().await,
        };

        match &outcome {
            Ok(_) => tracing::info!("Access token refreshed"),
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed; clearing session");
                if let Err(store_err) = self.credentials.clear_all() {
                    tracing::error!(error = %store_err, "Failed to clear credential store");
                }
                self.navigator.redirect_to_login(&self.config.login_redirect);
            }
        }

        outcome
    }

    async fn exchange_refresh_token(&self) -> RefreshOutcome {
        let refresh = self
            .credentials
            .refresh_token()
            .ok_or(RefreshError::NoRefreshToken)?;

        let request = ApiRequest::post(self.config.refresh_path.clone())
            .with_json(json!({ "refresh": refresh.as_str() }));
        let attempt = RequestAttempt::first(Arc::new(request), self.credentials.access_token());

        let response = self.dispatch(&attempt).await.map_err(|e| match e {
            Error::Unauthorized { detail } => RefreshError::Rejected { status: 401, detail },
            Error::Status { status, detail } => RefreshError::Rejected { status, detail },
            other => RefreshError::Transport(other.to_string()),
        })?;

        let body: RefreshResponse = response.json().map_err(|_| RefreshError::Malformed)?;
        let access = body
            .access
            .filter(|a| !a.is_empty())
            .map(AccessToken::from)
            .ok_or(RefreshError::Malformed)?;
        let rotated = body
            .refresh
            .filter(|r| !r.is_empty())
            .map(RefreshToken::from);

        self.credentials
            .store_refreshed(&access, rotated.as_ref())
            .map_err(|e| RefreshError::Store(e.to_string()))?;

        Ok(access)
    }
}
