use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use super::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;
use crate::transport::Transport;
use crate::types::{AccessToken, Identity, RefreshToken, Role};

/// Body of a successful login.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl<T: Transport> ApiClient<T> {
    /// Sign in with username and password and store the new session.
    ///
    /// Returns the role reported by the backend (`"user"` when absent).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoginFailed`] if the backend rejects the credentials or
    /// answers without an access token, or a transport/store error.
    pub async fn login(&self, username: &str, password: &str) -> Result<Role, Error> {
        let request = ApiRequest::post(self.config.login_path.clone())
            .with_json(json!({ "username": username, "password": password }));

        let response = self.request(request).await.map_err(|e| match e {
            Error::Unauthorized { detail } | Error::Status { detail, .. } => {
                Error::LoginFailed(detail)
            }
            other => other,
        })?;

        let body: LoginResponse = response
            .json()
            .map_err(|e| Error::LoginFailed(format!("invalid login response: {e}")))?;

        let access = non_empty(body.access)
            .map(AccessToken::from)
            .ok_or_else(|| Error::LoginFailed("No access token in response".into()))?;
        let refresh = non_empty(body.refresh).map(RefreshToken::from);
        let role = non_empty(body.role).map_or_else(|| Role::new(Role::DEFAULT), Role::from);

        self.credentials.store_login(&access, refresh.as_ref(), &role)?;

        tracing::info!(username = %username, role = %role, "Login successful");
        Ok(role)
    }

    /// Forget the session: token, refresh token, role and cached identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the credential store cannot be written.
    pub fn logout(&self) -> Result<(), Error> {
        self.credentials.clear_session()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Cached display identity, if a profile was loaded earlier.
    #[must_use]
    pub fn cached_identity(&self) -> Option<Identity> {
        self.credentials.identity()
    }

    /// Display identity of the signed-in user.
    ///
    /// Served from the store when every field is cached; otherwise fetched
    /// from the profile endpoint and cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the profile lacks a username,
    /// staff ID or contact, or any error from [`ApiClient::request`].
    pub async fn user_profile(&self) -> Result<Identity, Error> {
        if let Some(identity) = self.credentials.identity() {
            tracing::debug!(username = %identity.username, "Using cached user profile");
            return Ok(identity);
        }

        let profile: JsonValue = self.get_json(&self.config.profile_path).await?;
        let identity = Identity::new(
            first_field(&profile, &["username", "name"]),
            first_field(&profile, &["license_number", "staff_id"]),
            first_field(&profile, &["contact", "phone"]),
        );
        if !identity.is_complete() {
            return Err(Error::InvalidResponse(
                "incomplete user data received from profile endpoint".into(),
            ));
        }

        self.credentials.store_identity(&identity)?;
        tracing::debug!(username = %identity.username, "User profile cached");
        Ok(identity)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// First non-empty field among `keys`; numbers are accepted and stringified.
fn first_field(profile: &JsonValue, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| match profile.get(*key) {
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_default()
}
