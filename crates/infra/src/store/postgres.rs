//! Postgres-backed loyalty store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError |
//! |-----------------------|------------|
//! | `23505` unique violation | `UniqueViolation { constraint }` |
//! | `23503` foreign key violation | `ForeignKeyViolation` |
//! | anything else, pool/IO failures | `Backend` |
//!
//! ## Isolation
//!
//! Transactions run at the default READ COMMITTED level. Read-check-write
//! sequences on a client (visit counting, redemption) take a row lock with
//! [`StoreTx::lock_client`] first, so they serialise per client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, Row, Transaction};
use tracing::instrument;

use loyalty_auth::{Role, StoreFilter};
use loyalty_core::{
    Birthday, ClientId, Email, Page, PageRequest, RedemptionId, StoreId, TaxId, UserId, VisitId,
};
use loyalty_program::{
    Client, NewClient, NewRedemption, NewStore, NewUser, NewVisit, Redemption, Store, User, Visit,
};

use super::{LoyaltyStore, StoreError, StoreResult, StoreTx};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct PostgresLoyaltyStore {
    pool: Arc<PgPool>,
}

impl PostgresLoyaltyStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the (idempotent) schema.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LoyaltyStore for PostgresLoyaltyStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

fn filter_param(filter: StoreFilter) -> Option<i64> {
    filter.store().map(StoreId::get)
}

fn count(row: &PgRow) -> StoreResult<u64> {
    let total: i64 = row
        .try_get("total")
        .map_err(|e| StoreError::Backend(format!("failed to read count: {e}")))?;
    Ok(total.max(0) as u64)
}

fn decode<T, R>(operation: &str, row: &PgRow) -> StoreResult<T>
where
    R: for<'r> FromRow<'r, PgRow>,
    T: TryFrom<R, Error = StoreError>,
{
    let raw = R::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to decode row in {operation}: {e}")))?;
    T::try_from(raw)
}

fn decode_all<T, R>(operation: &str, rows: &[PgRow]) -> StoreResult<Vec<T>>
where
    R: for<'r> FromRow<'r, PgRow>,
    T: TryFrom<R, Error = StoreError>,
{
    rows.iter().map(|r| decode::<T, R>(operation, r)).collect()
}

const STORE_COLUMNS: &str = "id, name, visit_threshold";
const USER_COLUMNS: &str = "id, name, email, password_hash, role, store_id, scope_locked";
const CLIENT_COLUMNS: &str = "id, name, tax_id, phone, email, birthday, home_store_id, created_at";
const VISIT_COLUMNS: &str = "id, client_id, store_id, created_at";
const REDEMPTION_COLUMNS: &str = "id, client_id, store_id, gift_name, created_at";

#[async_trait]
impl StoreTx for PostgresTx {
    #[instrument(skip(self, store), fields(name = %store.name), err)]
    async fn insert_store(&mut self, store: &NewStore) -> StoreResult<Store> {
        let row = sqlx::query(&format!(
            "INSERT INTO stores (name, visit_threshold) VALUES ($1, $2) RETURNING {STORE_COLUMNS}"
        ))
        .bind(&store.name)
        .bind(store.visit_threshold as i32)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_store", e))?;
        decode::<Store, StoreRow>("insert_store", &row)
    }

    async fn get_store(&mut self, id: StoreId) -> StoreResult<Option<Store>> {
        let row = sqlx::query(&format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_store", e))?;
        row.map(|r| decode::<Store, StoreRow>("get_store", &r)).transpose()
    }

    async fn find_store_by_name(&mut self, name: &str) -> StoreResult<Option<Store>> {
        let row = sqlx::query(&format!("SELECT {STORE_COLUMNS} FROM stores WHERE name = $1"))
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_store_by_name", e))?;
        row.map(|r| decode::<Store, StoreRow>("find_store_by_name", &r)).transpose()
    }

    async fn list_stores(&mut self) -> StoreResult<Vec<Store>> {
        let rows = sqlx::query(&format!("SELECT {STORE_COLUMNS} FROM stores ORDER BY id ASC"))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_stores", e))?;
        decode_all::<Store, StoreRow>("list_stores", &rows)
    }

    async fn lowest_store_id(&mut self) -> StoreResult<Option<StoreId>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT MIN(id) FROM stores")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lowest_store_id", e))?;
        Ok(id.map(StoreId::new))
    }

    #[instrument(skip(self), fields(store_id = %id), err)]
    async fn update_store_threshold(&mut self, id: StoreId, threshold: u32) -> StoreResult<Option<Store>> {
        let row = sqlx::query(&format!(
            "UPDATE stores SET visit_threshold = $2 WHERE id = $1 RETURNING {STORE_COLUMNS}"
        ))
        .bind(id.get())
        .bind(threshold as i32)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_store_threshold", e))?;
        row.map(|r| decode::<Store, StoreRow>("update_store_threshold", &r)).transpose()
    }

    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, store_id, scope_locked)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.store_id.map(StoreId::get))
        .bind(user.scope_locked)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        decode::<User, UserRow>("insert_user", &row)
    }

    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.map(|r| decode::<User, UserRow>("get_user", &r)).transpose()
    }

    async fn find_user_by_email(&mut self, email: &Email) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| decode::<User, UserRow>("find_user_by_email", &r)).transpose()
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        decode_all::<User, UserRow>("list_users", &rows)
    }

    #[instrument(skip(self, client), fields(tax_id = %client.tax_id), err)]
    async fn insert_client(&mut self, client: &NewClient, created_at: DateTime<Utc>) -> StoreResult<Client> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO clients (name, tax_id, phone, email, birthday, home_store_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&client.name)
        .bind(client.tax_id.as_str())
        .bind(client.phone.as_deref())
        .bind(client.email.as_ref().map(Email::as_str))
        .bind(client.birthday.map(|b| b.date()))
        .bind(client.home_store_id.map(StoreId::get))
        .bind(created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_client", e))?;
        decode::<Client, ClientRow>("insert_client", &row)
    }

    async fn get_client(&mut self, id: ClientId) -> StoreResult<Option<Client>> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_client", e))?;
        row.map(|r| decode::<Client, ClientRow>("get_client", &r)).transpose()
    }

    async fn find_client_by_tax_id(&mut self, tax_id: &TaxId) -> StoreResult<Option<Client>> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE tax_id = $1"))
            .bind(tax_id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_client_by_tax_id", e))?;
        row.map(|r| decode::<Client, ClientRow>("find_client_by_tax_id", &r)).transpose()
    }

    #[instrument(skip(self), fields(client_id = %id), err)]
    async fn lock_client(&mut self, id: ClientId) -> StoreResult<bool> {
        let row = sqlx::query("SELECT id FROM clients WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_client", e))?;
        Ok(row.is_some())
    }

    async fn list_clients(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Client>> {
        let store = filter_param(filter);
        let total_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM clients WHERE ($1::bigint IS NULL OR home_store_id = $1)",
        )
        .bind(store)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_clients", e))?;
        let total = count(&total_row)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE ($1::bigint IS NULL OR home_store_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(store)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_clients", e))?;

        Ok(Page::new(page, total, decode_all::<Client, ClientRow>("list_clients", &rows)?))
    }

    async fn count_clients(&mut self, filter: StoreFilter) -> StoreResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM clients WHERE ($1::bigint IS NULL OR home_store_id = $1)",
        )
        .bind(filter_param(filter))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_clients", e))?;
        count(&row)
    }

    async fn clients_born_in_month(&mut self, filter: StoreFilter, month: u32) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE birthday IS NOT NULL
              AND EXTRACT(MONTH FROM birthday) = $2
              AND ($1::bigint IS NULL OR home_store_id = $1)
            "#
        ))
        .bind(filter_param(filter))
        .bind(month as i32)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("clients_born_in_month", e))?;
        decode_all::<Client, ClientRow>("clients_born_in_month", &rows)
    }

    #[instrument(skip(self, visit), fields(client_id = %visit.client_id), err)]
    async fn insert_visit(&mut self, visit: &NewVisit) -> StoreResult<Visit> {
        let row = sqlx::query(&format!(
            "INSERT INTO visits (client_id, store_id, created_at) VALUES ($1, $2, $3) RETURNING {VISIT_COLUMNS}"
        ))
        .bind(visit.client_id.get())
        .bind(visit.store_id.map(StoreId::get))
        .bind(visit.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_visit", e))?;
        decode::<Visit, VisitRow>("insert_visit", &row)
    }

    async fn count_visits_for_client(&mut self, client: ClientId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM visits WHERE client_id = $1")
            .bind(client.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_visits_for_client", e))?;
        count(&row)
    }

    #[instrument(skip(self), fields(client_id = %client), err)]
    async fn delete_visits_for_client(&mut self, client: ClientId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM visits WHERE client_id = $1")
            .bind(client.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_visits_for_client", e))?;
        Ok(result.rows_affected())
    }

    async fn list_visits(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Visit>> {
        let store = filter_param(filter);
        let total_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM visits WHERE ($1::bigint IS NULL OR store_id = $1)",
        )
        .bind(store)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_visits", e))?;
        let total = count(&total_row)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM visits
            WHERE ($1::bigint IS NULL OR store_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(store)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_visits", e))?;

        Ok(Page::new(page, total, decode_all::<Visit, VisitRow>("list_visits", &rows)?))
    }

    async fn count_visits_since(&mut self, filter: StoreFilter, since: DateTime<Utc>) -> StoreResult<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM visits
            WHERE created_at >= $2 AND ($1::bigint IS NULL OR store_id = $1)
            "#,
        )
        .bind(filter_param(filter))
        .bind(since)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_visits_since", e))?;
        count(&row)
    }

    #[instrument(skip(self, redemption), fields(client_id = %redemption.client_id), err)]
    async fn insert_redemption(&mut self, redemption: &NewRedemption) -> StoreResult<Redemption> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO redemptions (client_id, store_id, gift_name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {REDEMPTION_COLUMNS}
            "#
        ))
        .bind(redemption.client_id.get())
        .bind(redemption.store_id.get())
        .bind(&redemption.gift_name)
        .bind(redemption.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_redemption", e))?;
        decode::<Redemption, RedemptionRow>("insert_redemption", &row)
    }

    async fn list_redemptions(&mut self, filter: StoreFilter, page: PageRequest) -> StoreResult<Page<Redemption>> {
        let store = filter_param(filter);
        let total_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM redemptions WHERE ($1::bigint IS NULL OR store_id = $1)",
        )
        .bind(store)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_redemptions", e))?;
        let total = count(&total_row)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {REDEMPTION_COLUMNS}
            FROM redemptions
            WHERE ($1::bigint IS NULL OR store_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(store)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_redemptions", e))?;

        Ok(Page::new(
            page,
            total,
            decode_all::<Redemption, RedemptionRow>("list_redemptions", &rows)?,
        ))
    }

    async fn count_redemptions_since(&mut self, filter: StoreFilter, since: DateTime<Utc>) -> StoreResult<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM redemptions
            WHERE created_at >= $2 AND ($1::bigint IS NULL OR store_id = $1)
            "#,
        )
        .bind(filter_param(filter))
        .bind(since)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_redemptions_since", e))?;
        count(&row)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                },
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct StoreRow {
    id: i64,
    name: String,
    visit_threshold: i32,
}

impl<'r> FromRow<'r, PgRow> for StoreRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoreRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            visit_threshold: row.try_get("visit_threshold")?,
        })
    }
}

impl TryFrom<StoreRow> for Store {
    type Error = StoreError;

    fn try_from(row: StoreRow) -> Result<Self, StoreError> {
        Ok(Store {
            id: StoreId::new(row.id),
            name: row.name,
            visit_threshold: u32::try_from(row.visit_threshold)
                .map_err(|_| StoreError::Backend(format!("negative visit_threshold on store {}", row.id)))?,
        })
    }
}

#[derive(Debug)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    store_id: Option<i64>,
    scope_locked: bool,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            store_id: row.try_get("store_id")?,
            scope_locked: row.try_get("scope_locked")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, StoreError> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Backend(format!("user {}: {e}", row.id)))?;
        let email = Email::parse(&row.email)
            .map_err(|e| StoreError::Backend(format!("user {}: {e}", row.id)))?;
        Ok(User {
            id: UserId::new(row.id),
            name: row.name,
            email,
            password_hash: row.password_hash,
            role,
            store_id: row.store_id.map(StoreId::new),
            scope_locked: row.scope_locked,
        })
    }
}

#[derive(Debug)]
struct ClientRow {
    id: i64,
    name: String,
    tax_id: String,
    phone: Option<String>,
    email: Option<String>,
    birthday: Option<NaiveDate>,
    home_store_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ClientRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ClientRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            tax_id: row.try_get("tax_id")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            birthday: row.try_get("birthday")?,
            home_store_id: row.try_get("home_store_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ClientRow> for Client {
    type Error = StoreError;

    fn try_from(row: ClientRow) -> Result<Self, StoreError> {
        let corrupt = |e: loyalty_core::DomainError| StoreError::Backend(format!("client {}: {e}", row.id));
        let tax_id = TaxId::parse(&row.tax_id).map_err(corrupt)?;
        let email = Email::parse_optional(row.email.as_deref()).map_err(corrupt)?;
        Ok(Client {
            id: ClientId::new(row.id),
            name: row.name,
            tax_id,
            phone: row.phone,
            email,
            birthday: row.birthday.map(Birthday::new),
            home_store_id: row.home_store_id.map(StoreId::new),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct VisitRow {
    id: i64,
    client_id: i64,
    store_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for VisitRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VisitRow {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            store_id: row.try_get("store_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<VisitRow> for Visit {
    type Error = StoreError;

    fn try_from(row: VisitRow) -> Result<Self, StoreError> {
        Ok(Visit {
            id: VisitId::new(row.id),
            client_id: ClientId::new(row.client_id),
            store_id: row.store_id.map(StoreId::new),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct RedemptionRow {
    id: i64,
    client_id: i64,
    store_id: i64,
    gift_name: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for RedemptionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RedemptionRow {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            store_id: row.try_get("store_id")?,
            gift_name: row.try_get("gift_name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = StoreError;

    fn try_from(row: RedemptionRow) -> Result<Self, StoreError> {
        Ok(Redemption {
            id: RedemptionId::new(row.id),
            client_id: ClientId::new(row.client_id),
            store_id: StoreId::new(row.store_id),
            gift_name: row.gift_name,
            created_at: row.created_at,
        })
    }
}
