//! Transactional persistence boundary.
//!
//! Every service operation runs inside one [`StoreTx`]. Writes become visible
//! only on [`StoreTx::commit`]; dropping a transaction rolls it back.
//!
//! ## Uniqueness
//!
//! Natural-key uniqueness (`stores.name`, `users.email`, `clients.tax_id`) is
//! enforced by the backend and surfaced as [`StoreError::UniqueViolation`]
//! carrying the constraint name. Callers must not rely on pre-checks.
//!
//! ## Ordering
//!
//! - stores and users: by id ascending
//! - clients, visits, redemptions: by `created_at` descending, then id descending

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use loyalty_auth::StoreFilter;
use loyalty_core::{ClientId, Email, Page, PageRequest, StoreId, TaxId, UserId};
use loyalty_program::{
    Client, NewClient, NewRedemption, NewStore, NewUser, NewVisit, Redemption, Store, User, Visit,
};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryLoyaltyStore;
pub use postgres::PostgresLoyaltyStore;

pub const UQ_STORES_NAME: &str = "uq_stores_name";
pub const UQ_USERS_EMAIL: &str = "uq_users_email";
pub const UQ_CLIENTS_TAX_ID: &str = "uq_clients_tax_id";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },

    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point to the persistence layer.
#[async_trait]
pub trait LoyaltyStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// One unit of work against the five loyalty tables.
#[async_trait]
pub trait StoreTx: Send {
    // stores
    async fn insert_store(&mut self, store: &NewStore) -> StoreResult<Store>;
    async fn get_store(&mut self, id: StoreId) -> StoreResult<Option<Store>>;
    async fn find_store_by_name(&mut self, name: &str) -> StoreResult<Option<Store>>;
    async fn list_stores(&mut self) -> StoreResult<Vec<Store>>;
    async fn lowest_store_id(&mut self) -> StoreResult<Option<StoreId>>;
    async fn update_store_threshold(&mut self, id: StoreId, threshold: u32) -> StoreResult<Option<Store>>;

    // users
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &Email) -> StoreResult<Option<User>>;
    async fn list_users(&mut self) -> StoreResult<Vec<User>>;

    // clients
    async fn insert_client(&mut self, client: &NewClient, created_at: DateTime<Utc>) -> StoreResult<Client>;
    async fn get_client(&mut self, id: ClientId) -> StoreResult<Option<Client>>;
    async fn find_client_by_tax_id(&mut self, tax_id: &TaxId) -> StoreResult<Option<Client>>;
    /// Lock the client row until the transaction ends. `false` if absent.
    async fn lock_client(&mut self, id: ClientId) -> StoreResult<bool>;
    async fn list_clients(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Client>>;
    async fn count_clients(&mut self, filter: StoreFilter) -> StoreResult<u64>;
    async fn clients_born_in_month(&mut self, filter: StoreFilter, month: u32) -> StoreResult<Vec<Client>>;

    // visits
    async fn insert_visit(&mut self, visit: &NewVisit) -> StoreResult<Visit>;
    async fn count_visits_for_client(&mut self, client: ClientId) -> StoreResult<u64>;
    async fn delete_visits_for_client(&mut self, client: ClientId) -> StoreResult<u64>;
    async fn list_visits(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Visit>>;
    async fn count_visits_since(&mut self, filter: StoreFilter, since: DateTime<Utc>) -> StoreResult<u64>;

    // redemptions
    async fn insert_redemption(&mut self, redemption: &NewRedemption) -> StoreResult<Redemption>;
    async fn list_redemptions(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Redemption>>;
    async fn count_redemptions_since(&mut self, filter: StoreFilter, since: DateTime<Utc>) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
