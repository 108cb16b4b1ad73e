//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Which kind of record a `NotFound` refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Store,
    User,
    Client,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            EntityKind::Store => "store",
            EntityKind::User => "user",
            EntityKind::Client => "client",
        })
    }
}

/// Which natural key collided.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DuplicateTaxId,
    DuplicateEmail,
    DuplicateStoreName,
}

impl core::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ConflictKind::DuplicateTaxId => "tax id already registered",
            ConflictKind::DuplicateEmail => "email already registered",
            ConflictKind::DuplicateStoreName => "store name already exists",
        })
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records, conflicts, loyalty rule rejections). Infrastructure
/// concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, empty required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A birthday could not be parsed as `YYYY-MM-DD` or `DD/MM/YYYY`.
    #[error("invalid birthday '{0}': use YYYY-MM-DD or DD/MM/YYYY")]
    InvalidBirthday(String),

    #[error("{0} not found")]
    NotFound(EntityKind),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    /// Redemption attempted below the store threshold.
    #[error("client has {visits_count} of {threshold} required visits")]
    NotEligible { visits_count: u64, threshold: u32 },

    /// No store exists to associate a redemption with.
    #[error("no store available")]
    NoStoreAvailable,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: EntityKind) -> Self {
        Self::NotFound(kind)
    }

    pub fn conflict(kind: ConflictKind) -> Self {
        Self::Conflict(kind)
    }
}
