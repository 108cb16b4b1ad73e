//! `loyalty-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod page;
pub mod value_object;

pub use error::{ConflictKind, DomainError, DomainResult, EntityKind};
pub use id::{ClientId, RedemptionId, StoreId, UserId, VisitId};
pub use page::{Page, PageRequest};
pub use value_object::{Birthday, Email, TaxId};
