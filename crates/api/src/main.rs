use std::sync::Arc;

use anyhow::Context;

use loyalty_api::app::{self, services};
use loyalty_infra::{Config, SystemClock, run_seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    loyalty_observability::init();

    let config = Config::from_env().context("invalid configuration")?;
    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let store = services::open_store(&config)
        .await
        .context("failed to open store")?;

    if config.seed.on_start {
        run_seed(store.as_ref(), &config.seed, config.default_visit_threshold)
            .await
            .context("seed failed")?;
    }

    let services = services::build_services(&config, store, Arc::new(SystemClock));
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
