use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use loyalty_core::{StoreId, UserId};

use crate::{AuthError, Caller, Role};

/// Session token claims.
///
/// Timestamps are unix seconds so the payload stays interoperable with any
/// standard JWT tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id, as a string.
    pub sub: String,

    pub role: Role,

    /// The user's home store, if any.
    pub store_id: Option<StoreId>,

    pub scope_locked: bool,

    pub iat: i64,
    pub exp: i64,

    /// Unique token id.
    pub jti: Uuid,
}

impl SessionClaims {
    pub fn for_caller(caller: &Caller, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: caller.user_id().to_string(),
            role: caller.role(),
            store_id: caller.store_scope(),
            scope_locked: caller.scope_locked(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Rebuild the caller carried by these claims.
    pub fn caller(&self) -> Result<Caller, AuthError> {
        let user_id: UserId = self.sub.parse().map_err(|_| AuthError::Unauthenticated)?;
        Caller::new(user_id, self.role, self.store_id, self.scope_locked)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of session claims.
///
/// Signature verification happens in [`crate::token`]; this only looks at
/// `iat`/`exp` against the supplied `now`.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn caller() -> Caller {
        Caller::new(UserId::new(7), Role::Manager, Some(StoreId::new(2)), true).unwrap()
    }

    #[test]
    fn claims_round_trip_the_caller() {
        let now = Utc::now();
        let claims = SessionClaims::for_caller(&caller(), now, now + Duration::hours(8));
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.caller().unwrap(), caller());
    }

    #[test]
    fn time_window_is_enforced() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let claims = SessionClaims::for_caller(&caller(), now, now + Duration::hours(8));

        assert_eq!(validate_claims(&claims, now), Ok(()));
        assert_eq!(
            validate_claims(&claims, now - Duration::seconds(5)),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims, now + Duration::hours(8)),
            Err(TokenValidationError::Expired)
        );

        let inverted = SessionClaims::for_caller(&caller(), now, now);
        assert_eq!(validate_claims(&inverted, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn inconsistent_scope_is_rejected() {
        let now = Utc::now();
        let mut claims = SessionClaims::for_caller(&caller(), now, now + Duration::hours(1));
        claims.store_id = None;
        assert_eq!(claims.caller(), Err(AuthError::InconsistentScope));

        claims.sub = "not-a-number".into();
        assert_eq!(claims.caller(), Err(AuthError::Unauthenticated));
    }
}
