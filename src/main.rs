use std::time::Duration;

use tracing::info;

use veilrelay::core::config::{AppConfig, ProxyConfig};
use veilrelay::router::build_router;
use veilrelay::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::from_env();
    let proxy = ProxyConfig::from_env();
    info!(
        target_site = %config.target_site,
        proxy_host = %proxy.host,
        proxy_region = %proxy.region,
        use_proxy = proxy.use_proxy,
        "starting veilrelay"
    );

    let host = config.host.clone();
    let port = config.port;
    let state = AppState::new(config, proxy);

    state.sessions.clone().spawn_sweeper(SWEEP_INTERVAL);
    state.short_urls.clone().spawn_sweeper(SWEEP_INTERVAL);

    let app = build_router(state);

    let bind_addr = format!("{host}:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {bind_addr}. Stop the existing process or set PORT to a free port."
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("veilrelay listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
