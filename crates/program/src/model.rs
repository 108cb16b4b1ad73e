//! Persistent records and their validated constructors.
//!
//! `New*` types are the validated input of an insert; the persistence layer
//! assigns ids. Relationships are plain foreign-key fields.

use chrono::{DateTime, Utc};
use serde::Serialize;

use loyalty_auth::{AuthError, Caller, Role};
use loyalty_core::{
    Birthday, ClientId, DomainError, DomainResult, Email, RedemptionId, StoreId, TaxId,
    UserId, VisitId,
};

const NAME_MAX_LEN: usize = 120;
const PHONE_MAX_LEN: usize = 30;
const EMAIL_MAX_LEN: usize = 255;

fn required_text(field: &str, raw: &str, max: usize) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, raw: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => required_text(field, s, max).map(Some),
    }
}

fn bounded_email(raw: &str) -> DomainResult<Email> {
    let email = Email::parse(raw)?;
    if email.as_str().len() > EMAIL_MAX_LEN {
        return Err(DomainError::validation(format!(
            "email must be at most {EMAIL_MAX_LEN} characters"
        )));
    }
    Ok(email)
}

/// A visit threshold must be a positive integer.
pub fn validate_threshold(raw: i64) -> DomainResult<u32> {
    match u32::try_from(raw) {
        Ok(n) if n >= 1 && n <= i32::MAX as u32 => Ok(n),
        _ => Err(DomainError::validation("visit_threshold must be a positive integer")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub visit_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStore {
    pub name: String,
    pub visit_threshold: u32,
}

impl NewStore {
    pub fn new(name: &str, visit_threshold: Option<i64>, default_threshold: u32) -> DomainResult<Self> {
        let name = required_text("name", name, NAME_MAX_LEN)?;
        let visit_threshold = match visit_threshold {
            Some(raw) => validate_threshold(raw)?,
            None => default_threshold,
        };
        Ok(Self { name, visit_threshold })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// An operator account. Never serialized directly: see [`UserSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub store_id: Option<StoreId>,
    pub scope_locked: bool,
}

impl User {
    pub fn caller(&self) -> Result<Caller, AuthError> {
        Caller::new(self.id, self.role, self.store_id, self.scope_locked)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            store_id: self.store_id,
            scope_locked: self.scope_locked,
        }
    }
}

/// The public view of a user (no credential material).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub store_id: Option<StoreId>,
    pub scope_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub store_id: Option<StoreId>,
    pub scope_locked: bool,
}

impl NewUser {
    /// Role defaults to ATTENDANT. `scope_locked` is derived: a non-admin
    /// with a store is locked to it.
    pub fn new(
        name: &str,
        email: &str,
        password_hash: String,
        role: Option<Role>,
        store_id: Option<StoreId>,
    ) -> DomainResult<Self> {
        let name = required_text("name", name, NAME_MAX_LEN)?;
        let email = bounded_email(email)?;
        let role = role.unwrap_or_default();
        Ok(Self {
            name,
            email,
            password_hash,
            role,
            store_id,
            scope_locked: store_id.is_some() && !role.is_admin(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub tax_id: TaxId,
    pub phone: Option<String>,
    pub email: Option<Email>,
    pub birthday: Option<Birthday>,
    pub home_store_id: Option<StoreId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub tax_id: TaxId,
    pub phone: Option<String>,
    pub email: Option<Email>,
    pub birthday: Option<Birthday>,
    pub home_store_id: Option<StoreId>,
}

impl NewClient {
    pub fn new(
        name: &str,
        tax_id: &str,
        phone: Option<&str>,
        email: Option<&str>,
        birthday: Option<&str>,
        home_store_id: Option<StoreId>,
    ) -> DomainResult<Self> {
        let tax_id = TaxId::parse(tax_id)?;
        let name = required_text("name", name, NAME_MAX_LEN)?;
        let phone = optional_text("phone", phone, PHONE_MAX_LEN)?;
        let email = match email.map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(bounded_email(s)?),
        };
        let birthday = Birthday::parse_optional(birthday)?;
        Ok(Self {
            name,
            tax_id,
            phone,
            email,
            birthday,
            home_store_id,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visit / Redemption
// ─────────────────────────────────────────────────────────────────────────────

/// A visit event. Append-only; purged in bulk when the client redeems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visit {
    pub id: VisitId,
    pub client_id: ClientId,
    pub store_id: Option<StoreId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewVisit {
    pub client_id: ClientId,
    pub store_id: Option<StoreId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub id: RedemptionId,
    pub client_id: ClientId,
    pub store_id: StoreId,
    pub gift_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRedemption {
    pub client_id: ClientId,
    pub store_id: StoreId,
    pub gift_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_derives_scope_lock() {
        let store = Some(StoreId::new(1));

        let attendant = NewUser::new("Ana", "ana@x.com", "h".into(), None, store).unwrap();
        assert_eq!(attendant.role, Role::Attendant);
        assert!(attendant.scope_locked);

        let admin = NewUser::new("Root", "root@x.com", "h".into(), Some(Role::Admin), store).unwrap();
        assert!(!admin.scope_locked);

        let floating = NewUser::new("Bia", "bia@x.com", "h".into(), Some(Role::Manager), None).unwrap();
        assert!(!floating.scope_locked);
    }

    #[test]
    fn new_client_validates_fields() {
        let c = NewClient::new(" Maria ", "123", Some(""), Some("M@X.com"), Some("01/02/1990"), None)
            .unwrap();
        assert_eq!(c.name, "Maria");
        assert_eq!(c.phone, None);
        assert_eq!(c.email.unwrap().as_str(), "m@x.com");
        assert_eq!(c.birthday.unwrap().month(), 2);

        assert!(matches!(
            NewClient::new("Maria", "  ", None, None, None, None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            NewClient::new("", "123", None, None, None, None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            NewClient::new("Maria", "123", None, None, Some("1990-13-01"), None),
            Err(DomainError::InvalidBirthday(_))
        ));
    }

    #[test]
    fn store_threshold_must_be_positive() {
        assert_eq!(NewStore::new("Centro", None, 10).unwrap().visit_threshold, 10);
        assert_eq!(NewStore::new("Centro", Some(5), 10).unwrap().visit_threshold, 5);
        assert!(NewStore::new("Centro", Some(0), 10).is_err());
        assert!(NewStore::new("Centro", Some(-3), 10).is_err());
        assert!(NewStore::new("   ", Some(3), 10).is_err());
    }

    #[test]
    fn user_summary_omits_the_hash() {
        let user = User {
            id: UserId::new(1),
            name: "Ana".into(),
            email: Email::parse("ana@x.com").unwrap(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Manager,
            store_id: Some(StoreId::new(2)),
            scope_locked: true,
        };
        let summary = user.summary();
        assert_eq!(summary.id, user.id);
        assert!(user.caller().unwrap().scope_locked());
    }
}
