//! Conduit - client core for the Conduit social blogging API
//!
//! The crate couples a small unidirectional state runtime ([`runtime::Store`]
//! and [`runtime::Cmd`]) with a typed HTTP client and the feature reducers
//! of the app: home feed, login, sign-in, account, profile and session.
//! Rendering is left to the host; it subscribes to a Store and sends
//! messages back.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod features;
pub mod http;
pub mod logging;
pub mod runtime;
pub mod types;

// Re-export commonly used types
pub use api::ConduitApi;
pub use config::Config;
pub use credentials::{CredentialConfig, CredentialStore, StorageBackend};
pub use error::{ConduitError, CredentialStoreError, HttpError, Result};
pub use http::HttpClient;
pub use runtime::{Cmd, Store};
pub use types::{Article, Author, Slug, User};
