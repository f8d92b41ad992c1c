use std::fs;
use std::path::Path;

use crate::proxy::config::DEFAULT_CREDENTIAL_TABLE;
use crate::proxy::{CredentialStoreConfig, ProxyConfig};

/// Optional JSON file layered under the environment
pub const CONFIG_PATH_ENV: &str = "SHOP_PROXY_CONFIG";

/// Load configuration: defaults, then the JSON file named by
/// `SHOP_PROXY_CONFIG` (if set), then environment overrides.
pub fn load_config() -> Result<ProxyConfig, String> {
    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => load_config_file(Path::new(path.trim()))?,
        _ => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<ProxyConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("ignoring invalid {} {:?}: {}", key, value, e);
            None
        }
    }
}

/// Apply environment overrides through `lookup`. Blank values are ignored; an
/// unparsable value skips only its own key.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(port) = get("PORT").and_then(|v| parse_or_warn::<u16>("PORT", &v)) {
        config.port = port;
    }

    if let Some(value) = get("SHOP_PROXY_ALLOW_LAN") {
        config.allow_lan_access = is_truthy(&value);
    }

    if let Some(url) = get("UPSTREAM_BASE_URL") {
        config.upstream_base_url = url;
    }

    let endpoint = get("CREDENTIAL_STORE_URL");
    let access_key = get("CREDENTIAL_STORE_KEY");
    let table = get("CREDENTIAL_STORE_TABLE");
    if endpoint.is_some() || access_key.is_some() || table.is_some() {
        let store = config
            .credential_store
            .get_or_insert_with(|| CredentialStoreConfig {
                endpoint: String::new(),
                access_key: String::new(),
                table: DEFAULT_CREDENTIAL_TABLE.to_string(),
            });
        if let Some(endpoint) = endpoint {
            store.endpoint = endpoint;
        }
        if let Some(access_key) = access_key {
            store.access_key = access_key;
        }
        if let Some(table) = table {
            store.table = table;
        }
    }

    if let Some(origins) = get("ALLOWED_ORIGINS") {
        config.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(ttl) = get("CREDENTIAL_CACHE_TTL_SECS")
        .and_then(|v| parse_or_warn::<u64>("CREDENTIAL_CACHE_TTL_SECS", &v))
    {
        config.cache_ttl_secs = ttl;
    }
}
