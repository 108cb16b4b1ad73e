//! Service wiring: store backend, clock, notifier, token service.

use std::sync::Arc;

use loyalty_auth::Hs256TokenService;
use loyalty_infra::{
    Clock, Config, InMemoryLoyaltyStore, LogNotifier, LoyaltyServices, LoyaltyStore,
    PostgresLoyaltyStore, ProgramSettings, ServiceDeps, StoreError,
};

/// Open the configured backend: Postgres when a database is configured
/// (schema applied on connect), the in-memory store otherwise.
pub async fn open_store(config: &Config) -> Result<Arc<dyn LoyaltyStore>, StoreError> {
    match &config.database {
        Some(db) => {
            let store = PostgresLoyaltyStore::connect(&db.url, db.max_connections).await?;
            store.migrate().await?;
            tracing::info!(max_connections = db.max_connections, "using postgres store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no database configured; using in-memory store");
            Ok(Arc::new(InMemoryLoyaltyStore::new()))
        }
    }
}

pub fn build_services(
    config: &Config,
    store: Arc<dyn LoyaltyStore>,
    clock: Arc<dyn Clock>,
) -> Arc<LoyaltyServices> {
    let deps = ServiceDeps {
        store,
        clock,
        notifier: Arc::new(LogNotifier),
        settings: ProgramSettings {
            default_visit_threshold: config.default_visit_threshold,
            default_gift_name: config.default_gift_name.clone(),
            reference_offset: config.reference_offset,
        },
    };
    let tokens = Arc::new(Hs256TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl));
    Arc::new(LoyaltyServices::new(deps, tokens))
}
