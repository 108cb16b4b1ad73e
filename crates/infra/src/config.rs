//! Configuration loading and representation.
//!
//! All settings come from the process environment. Malformed values are
//! errors; only absent values fall back to defaults.

use std::net::SocketAddr;

use chrono::{Duration, FixedOffset};
use thiserror::Error;

use loyalty_program::{DEFAULT_GIFT_NAME, DEFAULT_VISIT_THRESHOLD};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;
const DEV_JWT_SECRET: &str = "dev-secret-change-me";
const DEFAULT_STORE_NAMES: &str = "Loja Centro,Loja Shopping";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSeed {
    pub store_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    pub on_start: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub store_names: Vec<String>,
    pub manager: Option<ManagerSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub jwt_secret: String,
    /// `true` when `JWT_SECRET` was absent and the dev default is in use.
    pub jwt_secret_is_default: bool,
    pub token_ttl: Duration,
    pub default_visit_threshold: u32,
    pub default_gift_name: String,
    /// The server's reference time zone for calendar-month questions.
    pub reference_offset: FixedOffset,
    pub seed: SeedConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", &bind_raw, e.to_string()))?;

        let max_connections = parse_or("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?;
        let database = database_url(&get).map(|url| DatabaseConfig { url, max_connections });

        let (jwt_secret, jwt_secret_is_default) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let ttl_hours: i64 = parse_or("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), DEFAULT_TOKEN_TTL_HOURS)?;
        if ttl_hours <= 0 {
            return Err(invalid("TOKEN_TTL_HOURS", &ttl_hours.to_string(), "must be positive"));
        }

        let default_visit_threshold: u32 =
            parse_or("DEFAULT_VISIT_THRESHOLD", get("DEFAULT_VISIT_THRESHOLD"), DEFAULT_VISIT_THRESHOLD)?;
        if default_visit_threshold == 0 {
            return Err(invalid("DEFAULT_VISIT_THRESHOLD", "0", "must be positive"));
        }

        let offset_minutes: i32 = parse_or("REFERENCE_UTC_OFFSET_MINUTES", get("REFERENCE_UTC_OFFSET_MINUTES"), 0)?;
        let reference_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| invalid("REFERENCE_UTC_OFFSET_MINUTES", &offset_minutes.to_string(), "out of range"))?;

        let store_names = get("SEED_STORE_NAMES")
            .unwrap_or_else(|| DEFAULT_STORE_NAMES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let manager = get("SEED_MANAGER_STORE").map(|store_name| ManagerSeed {
            store_name,
            email: get("SEED_MANAGER_EMAIL").unwrap_or_else(|| "manager@loyalty.local".to_string()),
            password: get("SEED_MANAGER_PASSWORD").unwrap_or_else(|| "change-me".to_string()),
        });

        let seed = SeedConfig {
            on_start: parse_bool("SEED_ON_START", get("SEED_ON_START"))?,
            admin_email: get("SEED_ADMIN_EMAIL").unwrap_or_else(|| "admin@loyalty.local".to_string()),
            admin_password: get("SEED_ADMIN_PASSWORD").unwrap_or_else(|| "change-me".to_string()),
            store_names,
            manager,
        };

        Ok(Self {
            bind_addr,
            database,
            jwt_secret,
            jwt_secret_is_default,
            token_ttl: Duration::hours(ttl_hours),
            default_visit_threshold,
            default_gift_name: get("DEFAULT_GIFT_NAME").unwrap_or_else(|| DEFAULT_GIFT_NAME.to_string()),
            reference_offset,
            seed,
        })
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s.parse().map_err(|e: T::Err| invalid(var, &s, e.to_string())),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(invalid(var, other, "expected a boolean")),
    }
}

/// `DATABASE_URL`, else a URL assembled from the `DB_*` parts when host,
/// name and user are all present.
fn database_url(get: &impl Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(url) = get("DATABASE_URL") {
        return Some(url);
    }
    let host = get("DB_HOST")?;
    let name = get("DB_NAME")?;
    let user = get("DB_USER")?;
    let port = get("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let credentials = match get("DB_PASSWORD") {
        Some(password) => format!("{user}:{password}"),
        None => user,
    };
    Some(format!("postgres://{credentials}@{host}:{port}/{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(move |k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(c.database, None);
        assert!(c.jwt_secret_is_default);
        assert_eq!(c.token_ttl, Duration::hours(8));
        assert_eq!(c.default_visit_threshold, 10);
        assert_eq!(c.default_gift_name, "Brinde");
        assert!(!c.seed.on_start);
        assert_eq!(c.seed.store_names.len(), 2);
        assert_eq!(c.seed.manager, None);
    }

    #[test]
    fn database_url_is_assembled_from_parts() {
        let c = config(&[
            ("DB_HOST", "db"),
            ("DB_NAME", "loyalty"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "pw"),
        ])
        .unwrap();
        assert_eq!(c.database.unwrap().url, "postgres://app:pw@db:5432/loyalty");

        let partial = config(&[("DB_HOST", "db")]).unwrap();
        assert_eq!(partial.database, None);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(matches!(
            config(&[("DEFAULT_VISIT_THRESHOLD", "ten")]),
            Err(ConfigError::Invalid { var: "DEFAULT_VISIT_THRESHOLD", .. })
        ));
        assert!(config(&[("TOKEN_TTL_HOURS", "0")]).is_err());
        assert!(config(&[("SEED_ON_START", "maybe")]).is_err());
    }

    #[test]
    fn reference_offset_out_of_range_is_an_error() {
        let c = config(&[("REFERENCE_UTC_OFFSET_MINUTES", "-180")]).unwrap();
        assert_eq!(c.reference_offset, FixedOffset::west_opt(3 * 3600).unwrap());

        for raw in ["40000000", "-40000000", "1440"] {
            assert!(
                matches!(
                    config(&[("REFERENCE_UTC_OFFSET_MINUTES", raw)]),
                    Err(ConfigError::Invalid { var: "REFERENCE_UTC_OFFSET_MINUTES", .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn manager_seed_requires_a_store_name() {
        let c = config(&[("SEED_MANAGER_STORE", "Loja Centro"), ("SEED_ON_START", "true")]).unwrap();
        assert!(c.seed.on_start);
        assert_eq!(c.seed.manager.unwrap().email, "manager@loyalty.local");
    }
}
