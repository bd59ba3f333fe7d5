use anyhow::Context;
use tracing_subscriber::EnvFilter;

use clinic_core::DbPool;
use clinic_server::config::{self, ServerConfig, ADMIN_USERNAME};
use clinic_server::{clinic_api_router, ApiContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("clinic-server starting v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let pool = DbPool::open(&config.database_path, config.pool).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })?;

    if config.admin_password_is_default {
        tracing::warn!("CLINIC_ADMIN_PASSWORD not set, seeding admin with the default password");
    }
    let password = config.admin_password.clone();
    pool.run(move |db| db.ensure_admin_user(ADMIN_USERNAME, &password))
        .await
        .context("failed to seed admin user")?;

    let app = clinic_api_router(ApiContext::new(pool, config.session_ttl));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "clinic-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("clinic-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
