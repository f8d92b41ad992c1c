// proxy module - per-shop authenticated reverse proxy

pub mod config;
pub mod credential_cache;
pub mod error;
pub mod server;

pub mod handlers;          // Route handlers
pub mod mappers;           // Upstream payload shaping
pub mod middleware;        // Axum layers
pub mod store;             // Credential store clients
pub mod upstream;          // Upstream forwarder

pub use config::{CredentialStoreConfig, ProxyConfig};
pub use credential_cache::{CredentialCache, CredentialError};
pub use error::ProxyError;
pub use server::{build_router, AppState, AxumServer};
