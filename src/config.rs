use std::time::Duration;

use url::Url;

use crate::error::Error;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4040";
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Pharmacy API client configuration.
///
/// The base URL is the only required field; everything else has the backend's
/// conventional default.
///
/// ```rust,ignore
/// use pharmacy_client::ClientConfig;
///
/// let config = ClientConfig::new("https://pharmacy.example.com".parse()?)
///     .with_login_redirect("/signin")
///     .with_refresh_timeout(Some(std::time::Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) login_path: String,
    pub(crate) refresh_path: String,
    pub(crate) profile_path: String,
    pub(crate) login_redirect: String,
    pub(crate) exempt_markers: Vec<String>,
    pub(crate) refresh_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for the backend at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: "/api/users/login/".into(),
            refresh_path: "/api/auth/refresh/".into(),
            profile_path: "/api/auth/user-profile/".into(),
            login_redirect: "/login".into(),
            exempt_markers: vec!["/login".into(), "/refresh".into()],
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `PHARMACY_API_BASE_URL`: backend base URL (default `http://127.0.0.1:4040`)
    /// - `PHARMACY_LOGIN_REDIRECT`: login entry point (default `/login`)
    /// - `PHARMACY_REFRESH_TIMEOUT_SECS`: refresh timeout in seconds, `0` disables it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        let base_url_str =
            std::env::var("PHARMACY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let base_url: Url = base_url_str
            .parse()
            .map_err(|e| Error::Config(format!("PHARMACY_API_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(redirect) = std::env::var("PHARMACY_LOGIN_REDIRECT") {
            config = config.with_login_redirect(redirect);
        }
        if let Ok(secs) = std::env::var("PHARMACY_REFRESH_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("PHARMACY_REFRESH_TIMEOUT_SECS: {e}")))?;
            config = config.with_refresh_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }

        Ok(config)
    }

    /// Override the login endpoint (default `/api/users/login/`).
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Override the refresh endpoint (default `/api/auth/refresh/`).
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Override the user profile endpoint (default `/api/auth/user-profile/`).
    #[must_use]
    pub fn with_profile_path(mut self, path: impl Into<String>) -> Self {
        self.profile_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.login_redirect = path.into();
        self
    }

    /// Override the path fragments that may be called without an access token.
    #[must_use]
    pub fn with_exempt_markers(mut self, markers: Vec<String>) -> Self {
        self.exempt_markers = markers;
        self
    }

    /// Bound on a single refresh exchange. `None` waits forever.
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    #[must_use]
    pub fn profile_path(&self) -> &str {
        &self.profile_path
    }

    #[must_use]
    pub fn login_redirect(&self) -> &str {
        &self.login_redirect
    }

    #[must_use]
    pub fn refresh_timeout(&self) -> Option<Duration> {
        self.refresh_timeout
    }

    /// Whether `path` may be dispatched without an access token.
    ///
    /// Substring match, so `/api/users/login/` and `/api/auth/refresh/` both qualify.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_markers.iter().any(|m| path.contains(m.as_str()))
    }

    /// Resolve a request path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidRequest(format!("{path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig::new("http://127.0.0.1:4040".parse().unwrap())
    }

    #[test]
    fn defaults_match_backend_routes() {
        let config = test_config();
        assert_eq!(config.login_path(), "/api/users/login/");
        assert_eq!(config.refresh_path(), "/api/auth/refresh/");
        assert_eq!(config.profile_path(), "/api/auth/user-profile/");
        assert_eq!(config.login_redirect(), "/login");
        assert_eq!(config.refresh_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn login_and_refresh_paths_are_exempt() {
        let config = test_config();
        assert!(config.is_exempt("/api/users/login/"));
        assert!(config.is_exempt("/api/auth/refresh/"));
        assert!(!config.is_exempt("/api/inventory/medicines/"));
        assert!(!config.is_exempt("/api/auth/user-profile/"));
    }

    #[test]
    fn endpoint_keeps_query_string() {
        let config = test_config();
        let url = config
            .endpoint("/api/inventory/inventory-logs/?medicine_id=7")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:4040/api/inventory/inventory-logs/?medicine_id=7"
        );
    }

    #[test]
    fn overrides_apply() {
        let config = test_config()
            .with_login_redirect("/signin")
            .with_refresh_timeout(None)
            .with_exempt_markers(vec!["/public".into()]);
        assert_eq!(config.login_redirect(), "/signin");
        assert_eq!(config.refresh_timeout(), None);
        assert!(config.is_exempt("/public/health"));
        assert!(!config.is_exempt("/api/users/login/"));
    }
}
