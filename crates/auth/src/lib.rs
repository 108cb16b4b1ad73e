//! `loyalty-auth` — authentication and the tenant scoping policy.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthError, StoreFilter, allowed_store_filter, ensure_store_writable, require_admin};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, hash_password, verify_password, verify_password_or_dummy};
pub use principal::Caller;
pub use roles::Role;
pub use token::{Hs256TokenService, TokenError, TokenValidator};
