//! Loyalty program domain module.
//!
//! Records for stores, operators, clients, visits and redemptions, plus the
//! rules that tie them together, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod dashboard;
pub mod model;
pub mod rules;

pub use dashboard::{KPI_WINDOW_DAYS, Kpis, current_month, kpi_window_start, sort_birthdays};
pub use model::{
    Client, NewClient, NewRedemption, NewStore, NewUser, NewVisit, Redemption, Store, User,
    UserSummary, Visit, validate_threshold,
};
pub use rules::{
    DEFAULT_GIFT_NAME, DEFAULT_VISIT_THRESHOLD, LoyaltyState, ensure_eligible, evaluate, gift_name,
    redemption_store, visit_store,
};
