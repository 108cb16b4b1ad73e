//! The loyalty rule.
//!
//! A client is ELIGIBLE once its unredeemed visit count reaches the store's
//! threshold. There is no stored state: eligibility is always derived from
//! the live count. Redeeming purges the visits, which resets the count.

use serde::Serialize;

use loyalty_core::{DomainError, DomainResult, StoreId};

pub const DEFAULT_VISIT_THRESHOLD: u32 = 10;
pub const DEFAULT_GIFT_NAME: &str = "Brinde";

const GIFT_NAME_MAX_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyState {
    BelowThreshold { visits_count: u64, threshold: u32 },
    Eligible { visits_count: u64, threshold: u32 },
}

impl LoyaltyState {
    pub fn is_eligible(&self) -> bool {
        matches!(self, LoyaltyState::Eligible { .. })
    }

    pub fn visits_count(&self) -> u64 {
        match self {
            LoyaltyState::BelowThreshold { visits_count, .. }
            | LoyaltyState::Eligible { visits_count, .. } => *visits_count,
        }
    }

    pub fn threshold(&self) -> u32 {
        match self {
            LoyaltyState::BelowThreshold { threshold, .. }
            | LoyaltyState::Eligible { threshold, .. } => *threshold,
        }
    }
}

pub fn evaluate(visits_count: u64, threshold: u32) -> LoyaltyState {
    if visits_count >= u64::from(threshold) {
        LoyaltyState::Eligible { visits_count, threshold }
    } else {
        LoyaltyState::BelowThreshold { visits_count, threshold }
    }
}

/// `NotEligible` (carrying the values used in the decision) below threshold.
pub fn ensure_eligible(visits_count: u64, threshold: u32) -> DomainResult<()> {
    match evaluate(visits_count, threshold) {
        LoyaltyState::Eligible { .. } => Ok(()),
        LoyaltyState::BelowThreshold { visits_count, threshold } => {
            Err(DomainError::NotEligible { visits_count, threshold })
        }
    }
}

/// Store a new visit is attributed to: the client's home store, then the
/// caller's store, then the lowest-id store. `None` only when no store exists.
pub fn visit_store(
    client_home: Option<StoreId>,
    caller_scope: Option<StoreId>,
    lowest_store: Option<StoreId>,
) -> Option<StoreId> {
    client_home.or(caller_scope).or(lowest_store)
}

/// Store a redemption is attributed to: the caller's store, then the client's
/// home store, then the lowest-id store.
pub fn redemption_store(
    caller_scope: Option<StoreId>,
    client_home: Option<StoreId>,
    lowest_store: Option<StoreId>,
) -> DomainResult<StoreId> {
    caller_scope
        .or(client_home)
        .or(lowest_store)
        .ok_or(DomainError::NoStoreAvailable)
}

/// Requested gift name, or `default` when blank.
pub fn gift_name(requested: Option<&str>, default: &str) -> DomainResult<String> {
    let name = match requested.map(str::trim) {
        None | Some("") => default.trim(),
        Some(s) => s,
    };
    if name.is_empty() {
        return Err(DomainError::validation("gift_name is required"));
    }
    if name.chars().count() > GIFT_NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "gift_name must be at most {GIFT_NAME_MAX_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
