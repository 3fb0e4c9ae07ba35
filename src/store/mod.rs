//! Process-wide credential persistence.
//!
//! The client reads and writes the session through a [`CredentialStore`],
//! a small key/value surface with a fixed key layout:
//!
//! | key            | value                       |
//! |----------------|-----------------------------|
//! | `token`        | access token                |
//! | `refreshToken` | refresh token               |
//! | `userRole`     | dashboard role              |
//! | `username`     | cached display identity     |
//! | `staffId`      | cached display identity     |
//! | `contact`      | cached display identity     |
//!
//! Use [`MemoryStore`] for short-lived processes and tests, or [`FileStore`]
//! to keep the session across restarts.

mod file;
mod memory;

use std::sync::Arc;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Error;
use crate::types::{AccessToken, Identity, RefreshToken, Role};

/// Keys owned by the client in a [`CredentialStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    UserRole,
    Username,
    StaffId,
    Contact,
}

impl StoreKey {
    /// Keys removed by an explicit logout.
    pub const SESSION: [Self; 6] = [
        Self::AccessToken,
        Self::RefreshToken,
        Self::UserRole,
        Self::Username,
        Self::StaffId,
        Self::Contact,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "token",
            Self::RefreshToken => "refreshToken",
            Self::UserRole => "userRole",
            Self::Username => "username",
            Self::StaffId => "staffId",
            Self::Contact => "contact",
        }
    }
}

/// Consumer-provided (or built-in) key/value persistence.
///
/// Calls are synchronous and short; the client never holds them across an await.
pub trait CredentialStore: Send + Sync + 'static {
    fn get(&self, key: StoreKey) -> Option<String>;

    fn set(&self, key: StoreKey, value: &str) -> Result<(), Error>;

    fn remove(&self, key: StoreKey) -> Result<(), Error>;

    /// Remove every entry, including ones this crate does not own.
    fn clear(&self) -> Result<(), Error>;
}

/// Snapshot of the stored session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    pub role: Option<Role>,
}

impl Session {
    /// A restored session counts as signed in when both token and role survive.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.role.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.role.is_none()
    }
}

/// Typed view over a [`CredentialStore`].
#[derive(Clone)]
pub(crate) struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub(crate) fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    fn non_empty(&self, key: StoreKey) -> Option<String> {
        self.store.get(key).filter(|v| !v.is_empty())
    }

    pub(crate) fn access_token(&self) -> Option<AccessToken> {
        self.non_empty(StoreKey::AccessToken).map(AccessToken::from)
    }

    pub(crate) fn refresh_token(&self) -> Option<RefreshToken> {
        self.non_empty(StoreKey::RefreshToken).map(RefreshToken::from)
    }

    pub(crate) fn session(&self) -> Session {
        Session {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            role: self.non_empty(StoreKey::UserRole).map(Role::from),
        }
    }

    pub(crate) fn identity(&self) -> Option<Identity> {
        let identity = Identity::new(
            self.non_empty(StoreKey::Username)?,
            self.non_empty(StoreKey::StaffId)?,
            self.non_empty(StoreKey::Contact)?,
        );
        Some(identity)
    }

    pub(crate) fn store_login(
        &self,
        access: &AccessToken,
        refresh: Option<&RefreshToken>,
        role: &Role,
    ) -> Result<(), Error> {
        self.store.set(StoreKey::AccessToken, access.as_str())?;
        if let Some(refresh) = refresh {
            self.store.set(StoreKey::RefreshToken, refresh.as_str())?;
        }
        self.store.set(StoreKey::UserRole, role.as_str())
    }

    pub(crate) fn store_refreshed(
        &self,
        access: &AccessToken,
        rotated: Option<&RefreshToken>,
    ) -> Result<(), Error> {
        self.store.set(StoreKey::AccessToken, access.as_str())?;
        if let Some(rotated) = rotated {
            self.store.set(StoreKey::RefreshToken, rotated.as_str())?;
        }
        Ok(())
    }

    pub(crate) fn store_identity(&self, identity: &Identity) -> Result<(), Error> {
        self.store.set(StoreKey::Username, &identity.username)?;
        self.store.set(StoreKey::StaffId, &identity.staff_id)?;
        self.store.set(StoreKey::Contact, &identity.contact)
    }

    /// Explicit logout: only the keys this crate owns.
    pub(crate) fn clear_session(&self) -> Result<(), Error> {
        for key in StoreKey::SESSION {
            self.store.remove(key)?;
        }
        Ok(())
    }

    /// Refresh failure: wipe everything.
    pub(crate) fn clear_all(&self) -> Result<(), Error> {
        self.store.clear()
    }
}
