use loyalty_auth::{Caller, allowed_store_filter};
use loyalty_program::{Client, Kpis, current_month, kpi_window_start, sort_birthdays};

use super::{ServiceDeps, ServiceResult};

/// Read-only rollups, filtered by the caller's store.
#[derive(Clone)]
pub struct DashboardAggregator {
    deps: ServiceDeps,
}

impl DashboardAggregator {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps }
    }

    /// Counts over the trailing window ending now, plus the client total.
    ///
    /// Visits and redemptions are filtered by the store they were recorded
    /// at; clients by their home store.
    pub async fn kpis(&self, caller: &Caller) -> ServiceResult<Kpis> {
        let filter = allowed_store_filter(caller);
        let since = kpi_window_start(self.deps.clock.now());

        let mut tx = self.deps.store.begin().await?;
        Ok(Kpis {
            visits_last_30_days: tx.count_visits_since(filter, since).await?,
            redemptions_last_30_days: tx.count_redemptions_since(filter, since).await?,
            total_clients: tx.count_clients(filter).await?,
        })
    }

    /// Clients whose birthday falls in the current month of the reference
    /// time zone, ordered by day then name.
    pub async fn birthdays_this_month(&self, caller: &Caller) -> ServiceResult<Vec<Client>> {
        let month = current_month(self.deps.clock.now(), self.deps.settings.reference_offset);
        let mut tx = self.deps.store.begin().await?;
        let mut clients = tx.clients_born_in_month(allowed_store_filter(caller), month).await?;
        sort_birthdays(&mut clients);
        Ok(clients)
    }
}
