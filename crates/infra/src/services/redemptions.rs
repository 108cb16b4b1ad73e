use tracing::{info, instrument};

use loyalty_auth::{Caller, allowed_store_filter};
use loyalty_core::{DomainError, EntityKind, Page, PageRequest};
use loyalty_program::{NewRedemption, Redemption, ensure_eligible, gift_name, redemption_store};

use super::clients::{ClientRef, resolve_client};
use super::visits::threshold_for;
use super::{ServiceDeps, ServiceResult};
use crate::notify::{notify_best_effort, redemption_message};

/// The loyalty state machine.
///
/// A redemption is recorded and the client's visits are purged in the same
/// transaction: either both happen or neither does.
#[derive(Clone)]
pub struct RedemptionEngine {
    deps: ServiceDeps,
}

impl RedemptionEngine {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps }
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id()), err)]
    pub async fn redeem(
        &self,
        caller: &Caller,
        reference: &ClientRef,
        requested_gift: Option<&str>,
    ) -> ServiceResult<Redemption> {
        let gift = gift_name(requested_gift, &self.deps.settings.default_gift_name)?;

        let mut tx = self.deps.store.begin().await?;
        let client = resolve_client(tx.as_mut(), caller, reference).await?;
        if !tx.lock_client(client.id).await? {
            return Err(DomainError::not_found(EntityKind::Client).into());
        }

        let lowest = match (caller.store_scope(), client.home_store_id) {
            (None, None) => tx.lowest_store_id().await?,
            _ => None,
        };
        let store_id = redemption_store(caller.store_scope(), client.home_store_id, lowest)?;
        let threshold =
            threshold_for(tx.as_mut(), Some(store_id), self.deps.settings.default_visit_threshold).await?;

        let visits_count = tx.count_visits_for_client(client.id).await?;
        ensure_eligible(visits_count, threshold)?;

        let redemption = tx
            .insert_redemption(&NewRedemption {
                client_id: client.id,
                store_id,
                gift_name: gift,
                created_at: self.deps.clock.now(),
            })
            .await?;
        let purged = tx.delete_visits_for_client(client.id).await?;
        tx.commit().await?;

        info!(
            client_id = %client.id,
            store_id = %store_id,
            redemption_id = %redemption.id,
            visits_purged = purged,
            threshold,
            "gift redeemed"
        );

        if let Some(email) = &client.email {
            notify_best_effort(
                self.deps.notifier.as_ref(),
                redemption_message(email.as_str(), &client.name, &redemption.gift_name),
            )
            .await;
        }
        Ok(redemption)
    }

    pub async fn list(&self, caller: &Caller, page: PageRequest) -> ServiceResult<Page<Redemption>> {
        let mut tx = self.deps.store.begin().await?;
        Ok(tx.list_redemptions(allowed_store_filter(caller), page).await?)
    }
}
