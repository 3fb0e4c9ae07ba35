use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Short-lived bearer credential attached to every authorized request.
///
/// `Debug` is redacted so tokens never end up in log lines.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for this token.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Longer-lived credential exchanged for a new [`AccessToken`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshToken(***)")
    }
}

/// Dashboard role reported by the login endpoint (`admin`, `pharmacist`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Role assumed when the login response carries none.
    pub const DEFAULT: &'static str = "user";

    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cached display identity of the signed-in staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Identity {
    pub username: String,
    pub staff_id: String,
    pub contact: String,
}

impl Identity {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        staff_id: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            staff_id: staff_id.into(),
            contact: contact.into(),
        }
    }

    /// Every field is non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.staff_id.is_empty() && !self.contact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_value() {
        let token = AccessToken::new("A1");
        assert_eq!(token.bearer(), "Bearer A1");
    }

    #[test]
    fn tokens_are_redacted_in_debug() {
        let access = AccessToken::new("secret-access");
        let refresh = RefreshToken::new("secret-refresh");
        assert!(!format!("{access:?}").contains("secret"));
        assert!(!format!("{refresh:?}").contains("secret"));
    }

    #[test]
    fn role_serializes_transparently() {
        let role = Role::new("pharmacist");
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"pharmacist\"");
        assert_eq!(role.to_string(), "pharmacist");
    }

    #[test]
    fn identity_completeness() {
        assert!(Identity::new("jdoe", "LIC-42", "555-0100").is_complete());
        assert!(!Identity::new("jdoe", "", "555-0100").is_complete());
    }
}
