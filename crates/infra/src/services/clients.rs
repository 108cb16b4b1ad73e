use tracing::{info, instrument};

use loyalty_auth::{Caller, allowed_store_filter, ensure_store_writable};
use loyalty_core::{ClientId, DomainError, EntityKind, Page, PageRequest, StoreId, TaxId};
use loyalty_program::{Client, NewClient};

use super::{ServiceDeps, ServiceResult};
use crate::notify::{notify_best_effort, welcome_message};
use crate::store::StoreTx;

/// How a request identifies a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRef {
    Id(ClientId),
    TaxId(TaxId),
}

impl ClientRef {
    /// A non-blank tax id wins over an id. One of the two is required.
    pub fn from_parts(cpf: Option<&str>, client_id: Option<i64>) -> Result<Self, DomainError> {
        match (cpf.map(str::trim).filter(|s| !s.is_empty()), client_id) {
            (Some(cpf), _) => Ok(ClientRef::TaxId(TaxId::parse(cpf)?)),
            (None, Some(id)) if id > 0 => Ok(ClientRef::Id(ClientId::new(id))),
            (None, Some(_)) => Err(DomainError::validation("client_id must be positive")),
            (None, None) => Err(DomainError::validation("cpf or client_id is required")),
        }
    }
}

/// Resolve a client inside `tx`.
///
/// Tax-id lookups cross stores; id lookups honour the caller's store filter
/// and report a filtered-out client as not found.
pub(crate) async fn resolve_client(
    tx: &mut dyn StoreTx,
    caller: &Caller,
    reference: &ClientRef,
) -> ServiceResult<Client> {
    let found = match reference {
        ClientRef::TaxId(tax_id) => tx.find_client_by_tax_id(tax_id).await?,
        ClientRef::Id(id) => tx
            .get_client(*id)
            .await?
            .filter(|c| allowed_store_filter(caller).admits(c.home_store_id)),
    };
    found.ok_or_else(|| DomainError::not_found(EntityKind::Client).into())
}

/// Raw client fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateClient {
    pub name: String,
    pub cpf: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<String>,
    pub store_id: Option<StoreId>,
}

#[derive(Clone)]
pub struct ClientRegistry {
    deps: ServiceDeps,
}

impl ClientRegistry {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps }
    }

    /// Register a client. The home store defaults to the caller's store.
    #[instrument(skip(self, input), fields(user_id = %caller.user_id()), err)]
    pub async fn create(&self, caller: &Caller, input: CreateClient) -> ServiceResult<Client> {
        if let Some(store) = input.store_id {
            ensure_store_writable(caller, store)?;
        }
        let home_store_id = input.store_id.or(caller.store_scope());

        let new_client = NewClient::new(
            &input.name,
            &input.cpf,
            input.phone.as_deref(),
            input.email.as_deref(),
            input.birthday.as_deref(),
            home_store_id,
        )?;

        let mut tx = self.deps.store.begin().await?;
        if let Some(store) = home_store_id {
            if tx.get_store(store).await?.is_none() {
                return Err(DomainError::not_found(EntityKind::Store).into());
            }
        }
        let client = tx.insert_client(&new_client, self.deps.clock.now()).await?;
        tx.commit().await?;

        info!(client_id = %client.id, store_id = ?client.home_store_id, "client registered");

        if let Some(email) = &client.email {
            notify_best_effort(
                self.deps.notifier.as_ref(),
                welcome_message(email.as_str(), &client.name),
            )
            .await;
        }
        Ok(client)
    }

    /// Exact tax-id match across all stores.
    pub async fn find_by_tax_id(&self, cpf: &str) -> ServiceResult<Option<Client>> {
        let tax_id = TaxId::parse(cpf)?;
        let mut tx = self.deps.store.begin().await?;
        Ok(tx.find_client_by_tax_id(&tax_id).await?)
    }

    pub async fn list(&self, caller: &Caller, page: PageRequest) -> ServiceResult<Page<Client>> {
        let mut tx = self.deps.store.begin().await?;
        Ok(tx.list_clients(allowed_store_filter(caller), page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::services::testing::{add_store, admin, fixture, locked};
    use loyalty_auth::{AuthError, Role};
    use loyalty_core::ConflictKind;

    fn input(cpf: &str) -> CreateClient {
        CreateClient {
            name: "Maria".into(),
            cpf: cpf.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicate_tax_id_is_a_conflict_and_keeps_the_first() {
        let fx = fixture();
        let first = fx.services.clients.create(&admin(), input("123")).await.unwrap();

        let err = fx.services.clients.create(&admin(), input("123")).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::Conflict(ConflictKind::DuplicateTaxId)));

        let found = fx.services.clients.find_by_tax_id("123").await.unwrap();
        assert_eq!(found, Some(first));
    }

    #[tokio::test]
    async fn home_store_defaults_to_caller_scope() {
        let fx = fixture();
        let store = add_store(&fx, "Centro", 10).await;
        let caller = locked(Role::Attendant, store.id);

        let client = fx.services.clients.create(&caller, input("1")).await.unwrap();
        assert_eq!(client.home_store_id, Some(store.id));
    }

    #[tokio::test]
    async fn locked_caller_cannot_register_into_another_store() {
        let fx = fixture();
        let a = add_store(&fx, "A", 10).await;
        let b = add_store(&fx, "B", 10).await;

        let err = fx
            .services
            .clients
            .create(&locked(Role::Manager, a.id), CreateClient { store_id: Some(b.id), ..input("1") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Auth(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_home_store_is_not_found() {
        let fx = fixture();
        let err = fx
            .services
            .clients
            .create(&admin(), CreateClient { store_id: Some(StoreId::new(42)), ..input("1") })
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::NotFound(EntityKind::Store)));
    }

    #[tokio::test]
    async fn listing_is_scoped_but_tax_id_lookup_is_not() {
        let fx = fixture();
        let a = add_store(&fx, "A", 10).await;
        let b = add_store(&fx, "B", 10).await;
        fx.services
            .clients
            .create(&admin(), CreateClient { store_id: Some(a.id), ..input("1") })
            .await
            .unwrap();
        fx.services
            .clients
            .create(&admin(), CreateClient { store_id: Some(b.id), ..input("2") })
            .await
            .unwrap();

        let scoped = fx
            .services
            .clients
            .list(&locked(Role::Attendant, a.id), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(scoped.total, 1);
        assert_eq!(scoped.items[0].tax_id.as_str(), "1");

        let everything = fx.services.clients.list(&admin(), PageRequest::default()).await.unwrap();
        assert_eq!(everything.total, 2);

        let other_store = fx.services.clients.find_by_tax_id("2").await.unwrap();
        assert_eq!(other_store.unwrap().home_store_id, Some(b.id));
    }

    #[tokio::test]
    async fn repeated_tax_id_lookups_agree() {
        let fx = fixture();
        let created = fx.services.clients.create(&admin(), input("55")).await.unwrap();

        let first = fx.services.clients.find_by_tax_id("55").await.unwrap();
        let second = fx.services.clients.find_by_tax_id(" 55 ").await.unwrap();
        assert_eq!(first, Some(created));
        assert_eq!(first, second);

        let missing = fx.services.clients.find_by_tax_id("404").await.unwrap();
        assert_eq!(missing, None);
        assert_eq!(fx.services.clients.find_by_tax_id("404").await.unwrap(), None);

        let page = fx.services.clients.list(&admin(), PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn invalid_birthday_is_reported_distinctly() {
        let fx = fixture();
        let err = fx
            .services
            .clients
            .create(&admin(), CreateClient { birthday: Some("soon".into()), ..input("1") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidBirthday(_))));
    }

    #[test]
    fn client_ref_prefers_tax_id() {
        assert_eq!(
            ClientRef::from_parts(Some(" 9 "), Some(3)).unwrap(),
            ClientRef::TaxId(TaxId::parse("9").unwrap())
        );
        assert_eq!(ClientRef::from_parts(Some(""), Some(3)).unwrap(), ClientRef::Id(ClientId::new(3)));
        assert!(ClientRef::from_parts(None, None).is_err());
    }
}
