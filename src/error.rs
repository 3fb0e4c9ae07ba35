use crate::refresh::RefreshError;

/// Errors returned by the pharmacy API client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No access token is stored and the request is not a login/refresh call.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The backend answered 401 and the request could not be recovered.
    #[error("Unauthorized: {detail}")]
    Unauthorized { detail: String },

    /// A refresh was needed but no refresh token is stored.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The refresh exchange failed; the session has been cleared.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The login endpoint rejected the credentials or returned no token.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[cfg(feature = "reqwest")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network failure reported by a non-reqwest transport.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a body the client cannot use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credential store operation failed.
    #[error("Credential store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by this error, if it came from a backend response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable detail suitable for rendering next to a form.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Unauthorized { detail } | Self::Status { detail, .. } => detail.clone(),
            Self::LoginFailed(detail) | Self::RefreshFailed(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<RefreshError> for Error {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::NoRefreshToken => Self::NoRefreshToken,
            other => Self::RefreshFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_refresh_token_keeps_its_variant() {
        let err: Error = RefreshError::NoRefreshToken.into();
        assert!(matches!(err, Error::NoRefreshToken));
    }

    #[test]
    fn rejected_refresh_becomes_refresh_failed() {
        let err: Error = RefreshError::Rejected {
            status: 400,
            detail: "Token is blacklisted".into(),
        }
        .into();
        match err {
            Error::RefreshFailed(msg) => assert!(msg.contains("Token is blacklisted")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_and_detail_accessors() {
        let err = Error::Status {
            status: 404,
            detail: "Not found.".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), "Not found.");

        let err = Error::Unauthorized {
            detail: "Token expired".into(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(Error::Unauthenticated.status(), None);
        assert_eq!(Error::Unauthenticated.detail(), "Not authenticated");
    }
}
