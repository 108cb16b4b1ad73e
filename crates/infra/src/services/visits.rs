use serde::Serialize;
use tracing::{info, instrument};

use loyalty_auth::{Caller, allowed_store_filter};
use loyalty_core::{DomainError, EntityKind, Page, PageRequest, StoreId};
use loyalty_program::{NewVisit, Visit, evaluate, visit_store};

use super::clients::{ClientRef, resolve_client};
use super::{ServiceDeps, ServiceResult};
use crate::store::StoreTx;

/// Outcome of recording a visit, as seen right after the insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitRecord {
    pub visit: Visit,
    pub visits_count: u64,
    pub threshold: u32,
    pub eligible: bool,
}

/// Threshold of `store`, or the program default when there is no store row.
pub(crate) async fn threshold_for(
    tx: &mut dyn StoreTx,
    store: Option<StoreId>,
    default_threshold: u32,
) -> ServiceResult<u32> {
    let Some(store) = store else {
        return Ok(default_threshold);
    };
    Ok(tx
        .get_store(store)
        .await?
        .map(|s| s.visit_threshold)
        .unwrap_or(default_threshold))
}

#[derive(Clone)]
pub struct VisitLedger {
    deps: ServiceDeps,
}

impl VisitLedger {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps }
    }

    /// Append a visit and return the client's updated unredeemed count.
    ///
    /// The client row is locked for the whole transaction, so the count
    /// cannot interleave with a concurrent visit or redemption.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()), err)]
    pub async fn record_visit(&self, caller: &Caller, reference: &ClientRef) -> ServiceResult<VisitRecord> {
        let mut tx = self.deps.store.begin().await?;
        let client = resolve_client(tx.as_mut(), caller, reference).await?;
        if !tx.lock_client(client.id).await? {
            return Err(DomainError::not_found(EntityKind::Client).into());
        }

        let lowest = match (client.home_store_id, caller.store_scope()) {
            (None, None) => tx.lowest_store_id().await?,
            _ => None,
        };
        let store_id = visit_store(client.home_store_id, caller.store_scope(), lowest);

        let visit = tx
            .insert_visit(&NewVisit {
                client_id: client.id,
                store_id,
                created_at: self.deps.clock.now(),
            })
            .await?;
        let visits_count = tx.count_visits_for_client(client.id).await?;
        let threshold =
            threshold_for(tx.as_mut(), store_id, self.deps.settings.default_visit_threshold).await?;
        tx.commit().await?;

        let state = evaluate(visits_count, threshold);
        info!(
            client_id = %client.id,
            store_id = ?store_id,
            visits_count,
            threshold,
            eligible = state.is_eligible(),
            "visit recorded"
        );

        Ok(VisitRecord {
            visit,
            visits_count,
            threshold,
            eligible: state.is_eligible(),
        })
    }

    /// Visits recorded since the client's last redemption.
    pub async fn count_unredeemed(&self, caller: &Caller, reference: &ClientRef) -> ServiceResult<u64> {
        let mut tx = self.deps.store.begin().await?;
        let client = resolve_client(tx.as_mut(), caller, reference).await?;
        Ok(tx.count_visits_for_client(client.id).await?)
    }

    pub async fn list(&self, caller: &Caller, page: PageRequest) -> ServiceResult<Page<Visit>> {
        let mut tx = self.deps.store.begin().await?;
        Ok(tx.list_visits(allowed_store_filter(caller), page).await?)
    }
}
