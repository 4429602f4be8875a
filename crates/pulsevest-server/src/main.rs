mod api;
mod middleware;

use std::sync::Arc;

use pulsevest_storage::StorageClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pulsevest_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulsevest_db::PoolConfig::from_app_config(&config);
    let pool = pulsevest_db::connect_pool(&config.database_url, pool_config).await?;
    pulsevest_db::run_migrations(&pool).await?;

    let storage = match &config.storage {
        Some(creds) => Some(Arc::new(StorageClient::new(
            &config.storage_base_url,
            &creds.cloud_name,
            &creds.api_key,
            &creds.api_secret,
            config.upload_timeout_secs,
        )?
        .with_signature_algorithm(config.storage_signature_algorithm))),
        None => {
            tracing::warn!("object storage credentials not set; upload routes will fail");
            None
        }
    };

    let app = build_app(
        AppState {
            pool: pool.clone(),
            storage,
        },
        RateLimitState::from_app_config(&config),
        config.upload_max_bytes,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "pulsevest server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("database pool closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
