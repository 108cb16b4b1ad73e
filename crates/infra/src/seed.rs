//! Idempotent bootstrap data: stores, the first admin and an optional
//! scope-locked manager. Safe to run on every start.

use tracing::{info, warn};

use loyalty_auth::{Role, hash_password};
use loyalty_core::{Email, StoreId};
use loyalty_program::{NewStore, NewUser};

use crate::config::SeedConfig;
use crate::services::ServiceResult;
use crate::store::{LoyaltyStore, StoreTx};

/// What a seed run actually created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub stores_created: usize,
    pub admin_created: bool,
    pub manager_created: bool,
}

pub async fn run_seed(
    store: &dyn LoyaltyStore,
    seed: &SeedConfig,
    default_threshold: u32,
) -> ServiceResult<SeedReport> {
    let mut report = SeedReport::default();
    let mut tx = store.begin().await?;

    for name in &seed.store_names {
        if tx.find_store_by_name(name).await?.is_none() {
            let new_store = NewStore::new(name, None, default_threshold)?;
            tx.insert_store(&new_store).await?;
            report.stores_created += 1;
        }
    }

    report.admin_created =
        ensure_user(tx.as_mut(), "Administrador", &seed.admin_email, &seed.admin_password, Role::Admin, None)
            .await?;

    if let Some(manager) = &seed.manager {
        match tx.find_store_by_name(&manager.store_name).await? {
            Some(home) => {
                report.manager_created = ensure_user(
                    tx.as_mut(),
                    "Gerente",
                    &manager.email,
                    &manager.password,
                    Role::Manager,
                    Some(home.id),
                )
                .await?;
            }
            None => warn!(store = %manager.store_name, "seed manager skipped: store does not exist"),
        }
    }

    tx.commit().await?;
    info!(
        stores_created = report.stores_created,
        admin_created = report.admin_created,
        manager_created = report.manager_created,
        "seed complete"
    );
    Ok(report)
}

async fn ensure_user(
    tx: &mut dyn StoreTx,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    store_id: Option<StoreId>,
) -> ServiceResult<bool> {
    if tx.find_user_by_email(&Email::parse(email)?).await?.is_some() {
        return Ok(false);
    }
    let new_user = NewUser::new(name, email, hash_password(password)?, Some(role), store_id)?;
    tx.insert_user(&new_user).await?;
    Ok(true)
}
