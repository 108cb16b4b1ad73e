use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use loyalty_auth::StoreFilter;
use loyalty_core::{
    ClientId, Email, Page, PageRequest, RedemptionId, StoreId, TaxId, UserId, VisitId,
};
use loyalty_program::{
    Client, NewClient, NewRedemption, NewStore, NewUser, NewVisit, Redemption, Store, User, Visit,
};

use super::{
    LoyaltyStore, StoreError, StoreResult, StoreTx, UQ_CLIENTS_TAX_ID, UQ_STORES_NAME,
    UQ_USERS_EMAIL,
};

#[derive(Debug, Default, Clone)]
struct Sequences {
    store: i64,
    user: i64,
    client: i64,
    visit: i64,
    redemption: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default, Clone)]
struct Tables {
    seq: Sequences,
    stores: BTreeMap<StoreId, Store>,
    users: BTreeMap<UserId, User>,
    clients: BTreeMap<ClientId, Client>,
    visits: BTreeMap<VisitId, Visit>,
    redemptions: BTreeMap<RedemptionId, Redemption>,
}

impl Tables {
    fn require_store(&self, id: StoreId) -> StoreResult<()> {
        if self.stores.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("store {id} does not exist")))
        }
    }

    fn require_client(&self, id: ClientId) -> StoreResult<()> {
        if self.clients.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("client {id} does not exist")))
        }
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, i64)) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

/// In-memory loyalty store.
///
/// Intended for tests/dev. A transaction holds the table lock for its whole
/// lifetime and works on a staged copy that replaces the tables on commit,
/// so transactions are fully serialised and dropping one discards its writes.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoyaltyStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLoyaltyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoyaltyStore for InMemoryLoyaltyStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTx { guard, staged }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn insert_store(&mut self, store: &NewStore) -> StoreResult<Store> {
        let t = &mut self.staged;
        if t.stores.values().any(|s| s.name == store.name) {
            return Err(unique(UQ_STORES_NAME));
        }
        let row = Store {
            id: StoreId::new(next(&mut t.seq.store)),
            name: store.name.clone(),
            visit_threshold: store.visit_threshold,
        };
        t.stores.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_store(&mut self, id: StoreId) -> StoreResult<Option<Store>> {
        Ok(self.staged.stores.get(&id).cloned())
    }

    async fn find_store_by_name(&mut self, name: &str) -> StoreResult<Option<Store>> {
        Ok(self.staged.stores.values().find(|s| s.name == name).cloned())
    }

    async fn list_stores(&mut self) -> StoreResult<Vec<Store>> {
        Ok(self.staged.stores.values().cloned().collect())
    }

    async fn lowest_store_id(&mut self) -> StoreResult<Option<StoreId>> {
        Ok(self.staged.stores.keys().next().copied())
    }

    async fn update_store_threshold(&mut self, id: StoreId, threshold: u32) -> StoreResult<Option<Store>> {
        Ok(self.staged.stores.get_mut(&id).map(|s| {
            s.visit_threshold = threshold;
            s.clone()
        }))
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let t = &mut self.staged;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(unique(UQ_USERS_EMAIL));
        }
        if let Some(store) = user.store_id {
            t.require_store(store)?;
        }
        let row = User {
            id: UserId::new(next(&mut t.seq.user)),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            store_id: user.store_id,
            scope_locked: user.scope_locked,
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &Email) -> StoreResult<Option<User>> {
        Ok(self.staged.users.values().find(|u| &u.email == email).cloned())
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        Ok(self.staged.users.values().cloned().collect())
    }

    async fn insert_client(&mut self, client: &NewClient, created_at: DateTime<Utc>) -> StoreResult<Client> {
        let t = &mut self.staged;
        if t.clients.values().any(|c| c.tax_id == client.tax_id) {
            return Err(unique(UQ_CLIENTS_TAX_ID));
        }
        if let Some(store) = client.home_store_id {
            t.require_store(store)?;
        }
        let row = Client {
            id: ClientId::new(next(&mut t.seq.client)),
            name: client.name.clone(),
            tax_id: client.tax_id.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            birthday: client.birthday,
            home_store_id: client.home_store_id,
            created_at,
        };
        t.clients.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_client(&mut self, id: ClientId) -> StoreResult<Option<Client>> {
        Ok(self.staged.clients.get(&id).cloned())
    }

    async fn find_client_by_tax_id(&mut self, tax_id: &TaxId) -> StoreResult<Option<Client>> {
        Ok(self.staged.clients.values().find(|c| &c.tax_id == tax_id).cloned())
    }

    async fn lock_client(&mut self, id: ClientId) -> StoreResult<bool> {
        // The whole table set is already held by this transaction.
        Ok(self.staged.clients.contains_key(&id))
    }

    async fn list_clients(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Client>> {
        let rows = self
            .staged
            .clients
            .values()
            .filter(|c| filter.admits(c.home_store_id))
            .cloned()
            .collect();
        let rows = newest_first(rows, |c| (c.created_at, c.id.get()));
        Ok(Page::from_ordered(page, rows))
    }

    async fn count_clients(&mut self, filter: StoreFilter) -> StoreResult<u64> {
        Ok(self
            .staged
            .clients
            .values()
            .filter(|c| filter.admits(c.home_store_id))
            .count() as u64)
    }

    async fn clients_born_in_month(&mut self, filter: StoreFilter, month: u32) -> StoreResult<Vec<Client>> {
        Ok(self
            .staged
            .clients
            .values()
            .filter(|c| filter.admits(c.home_store_id))
            .filter(|c| c.birthday.is_some_and(|b| b.month() == month))
            .cloned()
            .collect())
    }

    async fn insert_visit(&mut self, visit: &NewVisit) -> StoreResult<Visit> {
        let t = &mut self.staged;
        t.require_client(visit.client_id)?;
        if let Some(store) = visit.store_id {
            t.require_store(store)?;
        }
        let row = Visit {
            id: VisitId::new(next(&mut t.seq.visit)),
            client_id: visit.client_id,
            store_id: visit.store_id,
            created_at: visit.created_at,
        };
        t.visits.insert(row.id, row.clone());
        Ok(row)
    }

    async fn count_visits_for_client(&mut self, client: ClientId) -> StoreResult<u64> {
        Ok(self
            .staged
            .visits
            .values()
            .filter(|v| v.client_id == client)
            .count() as u64)
    }

    async fn delete_visits_for_client(&mut self, client: ClientId) -> StoreResult<u64> {
        let before = self.staged.visits.len();
        self.staged.visits.retain(|_, v| v.client_id != client);
        Ok((before - self.staged.visits.len()) as u64)
    }

    async fn list_visits(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Visit>> {
        let rows = self
            .staged
            .visits
            .values()
            .filter(|v| filter.admits(v.store_id))
            .cloned()
            .collect();
        let rows = newest_first(rows, |v| (v.created_at, v.id.get()));
        Ok(Page::from_ordered(page, rows))
    }

    async fn count_visits_since(&mut self, filter: StoreFilter, since: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self
            .staged
            .visits
            .values()
            .filter(|v| filter.admits(v.store_id) && v.created_at >= since)
            .count() as u64)
    }

    async fn insert_redemption(&mut self, redemption: &NewRedemption) -> StoreResult<Redemption> {
        let t = &mut self.staged;
        t.require_client(redemption.client_id)?;
        t.require_store(redemption.store_id)?;
        let row = Redemption {
            id: RedemptionId::new(next(&mut t.seq.redemption)),
            client_id: redemption.client_id,
            store_id: redemption.store_id,
            gift_name: redemption.gift_name.clone(),
            created_at: redemption.created_at,
        };
        t.redemptions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_redemptions(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Redemption>> {
        let rows = self
            .staged
            .redemptions
            .values()
            .filter(|r| filter.admits(Some(r.store_id)))
            .cloned()
            .collect();
        let rows = newest_first(rows, |r| (r.created_at, r.id.get()));
        Ok(Page::from_ordered(page, rows))
    }

    async fn count_redemptions_since(&mut self, filter: StoreFilter, since: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self
            .staged
            .redemptions
            .values()
            .filter(|r| filter.admits(Some(r.store_id)) && r.created_at >= since)
            .count() as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_program::DEFAULT_VISIT_THRESHOLD;

    fn new_store(name: &str) -> NewStore {
        NewStore::new(name, None, DEFAULT_VISIT_THRESHOLD).unwrap()
    }

    fn new_client(tax_id: &str, store: Option<StoreId>) -> NewClient {
        NewClient::new("Maria", tax_id, None, None, None, store).unwrap()
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = InMemoryLoyaltyStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_store(&new_store("Centro")).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_stores().await.unwrap().is_empty());
        tx.insert_store(&new_store("Centro")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.list_stores().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unique_constraints_report_their_names() {
        let store = InMemoryLoyaltyStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.insert_store(&new_store("Centro")).await.unwrap();
        assert_eq!(
            tx.insert_store(&new_store("Centro")).await,
            Err(unique(UQ_STORES_NAME))
        );

        tx.insert_client(&new_client("111", None), Utc::now()).await.unwrap();
        assert_eq!(
            tx.insert_client(&new_client("111", None), Utc::now()).await,
            Err(unique(UQ_CLIENTS_TAX_ID))
        );
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let store = InMemoryLoyaltyStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_client(&new_client("111", Some(StoreId::new(99))), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn lists_are_filtered_and_newest_first() {
        let store = InMemoryLoyaltyStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_store(&new_store("A")).await.unwrap();
        let b = tx.insert_store(&new_store("B")).await.unwrap();

        let t0 = Utc::now();
        let c1 = tx.insert_client(&new_client("1", Some(a.id)), t0).await.unwrap();
        let c2 = tx.insert_client(&new_client("2", Some(b.id)), t0).await.unwrap();
        let c3 = tx
            .insert_client(&new_client("3", Some(a.id)), t0 + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let all = tx.list_clients(StoreFilter::All, PageRequest::default()).await.unwrap();
        let ids: Vec<_> = all.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c3.id, c2.id, c1.id]);

        let only_a = tx
            .list_clients(StoreFilter::Only(a.id), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(only_a.total, 2);
        assert!(only_a.items.iter().all(|c| c.home_store_id == Some(a.id)));
        assert_eq!(tx.lowest_store_id().await.unwrap(), Some(a.id));
    }

    #[tokio::test]
    async fn deleting_visits_only_touches_one_client() {
        let store = InMemoryLoyaltyStore::new();
        let mut tx = store.begin().await.unwrap();
        let c1 = tx.insert_client(&new_client("1", None), Utc::now()).await.unwrap();
        let c2 = tx.insert_client(&new_client("2", None), Utc::now()).await.unwrap();
        for client in [c1.id, c1.id, c2.id] {
            tx.insert_visit(&NewVisit { client_id: client, store_id: None, created_at: Utc::now() })
                .await
                .unwrap();
        }

        assert_eq!(tx.delete_visits_for_client(c1.id).await.unwrap(), 2);
        assert_eq!(tx.count_visits_for_client(c1.id).await.unwrap(), 0);
        assert_eq!(tx.count_visits_for_client(c2.id).await.unwrap(), 1);
    }
}
