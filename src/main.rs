use shop_proxy::modules;
use shop_proxy::proxy;

#[tokio::main]
async fn main() -> Result<(), String> {
    modules::logger::init_logger();

    let proxy_config = match modules::config::load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!("failed to load config: {}. using defaults", err);
            proxy::ProxyConfig::default()
        }
    };

    let bind_address = if let Ok(addr) = std::env::var("SHOP_PROXY_BIND") {
        addr
    } else {
        proxy_config.get_bind_address().to_string()
    };

    let state = proxy::AppState::from_config(&proxy_config)?;
    if state.credential_store_configured() {
        tracing::info!(
            upstream = %proxy_config.upstream_base_url,
            cache_ttl_secs = proxy_config.cache_ttl_secs,
            "credential store configured"
        );
    } else {
        tracing::warn!(
            "credential store not configured; set CREDENTIAL_STORE_URL and CREDENTIAL_STORE_KEY. \
             tenant routes will answer 503"
        );
    }

    let (server, handle) = proxy::AxumServer::start(
        bind_address,
        proxy_config.port,
        state,
        &proxy_config,
    )
    .await
    .map_err(|e| format!("failed to start proxy server: {}", e))?;

    tracing::info!("shop-proxy listening on http://{}", server.local_addr());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {}", e))?;

    tracing::info!("shutdown requested, stopping server...");
    server.stop();
    let _ = handle.await;

    Ok(())
}
