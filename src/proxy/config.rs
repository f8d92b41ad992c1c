use serde::{Deserialize, Serialize};

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://shop.tekmetric.com";
pub const DEFAULT_CREDENTIAL_TABLE: &str = "shop_tokens";

/// Reverse proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to listen on all interfaces
    /// - false: 127.0.0.1 only
    /// - true: 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Origin every forwarded call is sent to
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Where per-shop credentials are read from. Without it every route
    /// except `/health` answers 503.
    #[serde(default)]
    pub credential_store: Option<CredentialStoreConfig>,

    /// CORS allow-list. Empty or `"*"` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Maximum age of a cached credential before the store is read again (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// TCP connect timeout for upstream and store calls (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Largest accepted request body (bytes)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Credential store connection
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialStoreConfig {
    pub endpoint: String,
    /// Read-only key; never logged
    pub access_key: String,
    #[serde(default = "default_credential_table")]
    pub table: String,
}

impl CredentialStoreConfig {
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.access_key.trim().is_empty()
    }
}

impl std::fmt::Debug for CredentialStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allow_lan_access: false,
            upstream_base_url: default_upstream_base_url(),
            credential_store: None,
            allowed_origins: Vec::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_port() -> u16 {
    8787
}

fn default_upstream_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

fn default_credential_table() -> String {
    DEFAULT_CREDENTIAL_TABLE.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    20
}

fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

impl ProxyConfig {
    /// Actual listen address
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// The store config, only when both endpoint and key are present.
    pub fn credential_store(&self) -> Option<&CredentialStoreConfig> {
        self.credential_store.as_ref().filter(|c| c.is_complete())
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }
}
