use serde::Deserialize;
use serde_json::{Value, json};

use loyalty_auth::Role;
use loyalty_core::{Page, StoreId};
use loyalty_infra::{ClientRef, CreateClient, CreateUser, VisitRecord};
use loyalty_program::{Client, Redemption, Store, Visit};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub store_id: Option<StoreId>,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(body: CreateUserRequest) -> Self {
        CreateUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
            store_id: body.store_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub visit_threshold: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub visit_threshold: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub cpf: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<String>,
    pub store_id: Option<StoreId>,
}

impl From<CreateClientRequest> for CreateClient {
    fn from(body: CreateClientRequest) -> Self {
        CreateClient {
            name: body.name,
            cpf: body.cpf,
            phone: body.phone,
            email: body.email,
            birthday: body.birthday,
            store_id: body.store_id,
        }
    }
}

/// `{cpf}` or `{client_id}`; a non-blank cpf wins.
#[derive(Debug, Deserialize)]
pub struct ClientRefRequest {
    pub cpf: Option<String>,
    pub client_id: Option<i64>,
}

impl ClientRefRequest {
    pub fn to_ref(&self) -> Result<ClientRef, loyalty_core::DomainError> {
        ClientRef::from_parts(self.cpf.as_deref(), self.client_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    #[serde(flatten)]
    pub client: ClientRefRequest,
    pub gift_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientsQuery {
    pub cpf: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn store_to_json(s: &Store) -> Value {
    json!({
        "id": s.id,
        "name": s.name,
        "visit_threshold": s.visit_threshold,
    })
}

pub fn client_to_json(c: &Client) -> Value {
    json!({
        "id": c.id,
        "name": c.name,
        "cpf": c.tax_id,
        "phone": c.phone,
        "email": c.email,
        "birthday": c.birthday,
        "store_id": c.home_store_id,
        "created_at": c.created_at.to_rfc3339(),
    })
}

pub fn visit_to_json(v: &Visit) -> Value {
    json!({
        "id": v.id,
        "client_id": v.client_id,
        "store_id": v.store_id,
        "created_at": v.created_at.to_rfc3339(),
    })
}

pub fn visit_record_to_json(r: &VisitRecord) -> Value {
    json!({
        "visit_id": r.visit.id,
        "client_id": r.visit.client_id,
        "store_id": r.visit.store_id,
        "visits_count": r.visits_count,
        "threshold": r.threshold,
        "eligible": r.eligible,
    })
}

pub fn redemption_to_json(r: &Redemption) -> Value {
    json!({
        "redemption_id": r.id,
        "client_id": r.client_id,
        "store_id": r.store_id,
        "gift_name": r.gift_name,
        "when": r.created_at.to_rfc3339(),
    })
}

pub fn page_to_json<T>(page: &Page<T>, item: impl Fn(&T) -> Value) -> Value {
    json!({
        "total": page.total,
        "page": page.page,
        "per_page": page.per_page,
        "items": page.items.iter().map(item).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeem_request_accepts_either_reference() {
        let by_cpf: RedeemRequest = serde_json::from_value(json!({ "cpf": "123", "gift_name": "Mug" })).unwrap();
        assert!(matches!(by_cpf.client.to_ref().unwrap(), ClientRef::TaxId(_)));
        assert_eq!(by_cpf.gift_name.as_deref(), Some("Mug"));

        let by_id: RedeemRequest = serde_json::from_value(json!({ "client_id": 7 })).unwrap();
        assert!(matches!(by_id.client.to_ref().unwrap(), ClientRef::Id(_)));
        assert!(by_id.gift_name.is_none());
    }

    #[test]
    fn create_user_accepts_legacy_role_names() {
        let body: CreateUserRequest = serde_json::from_value(json!({
            "name": "G", "email": "g@x.com", "password": "p", "role": "GERENTE", "store_id": 1
        }))
        .unwrap();
        assert_eq!(body.role, Some(Role::Manager));
    }
}
