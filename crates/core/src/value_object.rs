//! Value objects: equality by value, not identity.
//!
//! Each type here is validated once at construction; holders can rely on the
//! invariant without re-checking.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

const TAX_ID_MAX_LEN: usize = 32;

/// A client's tax id (CPF): the globally-unique business key.
///
/// Only surrounding whitespace is stripped; lookups are exact matches on the
/// stored form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxId(String);

impl TaxId {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("tax id (cpf) is required"));
        }
        if trimmed.len() > TAX_ID_MAX_LEN {
            return Err(DomainError::validation(format!(
                "tax id (cpf) must be at most {TAX_ID_MAX_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TaxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-normalized email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(normalized)),
            _ => Err(DomainError::validation("email must look like name@domain")),
        }
    }

    /// Optional email field: blank input means "no email".
    pub fn parse_optional(raw: Option<&str>) -> DomainResult<Option<Self>> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client's birthday, stored as a structured calendar date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Birthday(NaiveDate);

impl Birthday {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Accepts ISO `YYYY-MM-DD` or `DD/MM/YYYY`. Blank (or the literal
    /// `null`) means no birthday.
    pub fn parse_optional(raw: Option<&str>) -> DomainResult<Option<Self>> {
        let s = match raw.map(str::trim) {
            None | Some("") | Some("null") => return Ok(None),
            Some(s) => s,
        };

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
            .map(|d| Some(Self(d)))
            .map_err(|_| DomainError::InvalidBirthday(s.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}
