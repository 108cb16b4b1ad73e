use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator role.
///
/// The wire/storage form is the upper-case name. Legacy spellings from the
/// first deployment (`GERENTE`, `ATENDENTE`) are accepted on input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[serde(alias = "GERENTE")]
    Manager,
    #[default]
    #[serde(alias = "ATENDENTE")]
    Attendant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Attendant => "ATTENDANT",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" | "GERENTE" => Ok(Role::Manager),
            "ATTENDANT" | "ATENDENTE" => Ok(Role::Attendant),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
