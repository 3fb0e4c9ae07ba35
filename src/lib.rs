#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod navigator;
pub mod refresh;
pub mod request;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::Error;
pub use navigator::{LogNavigator, LoginNavigator};
pub use refresh::{RefreshCoordinator, RefreshError};
pub use request::{ApiRequest, ApiResponse, OutboundRequest, RequestAttempt};
pub use store::{CredentialStore, FileStore, MemoryStore, Session, StoreKey};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use types::{AccessToken, Identity, RefreshToken, Role};
