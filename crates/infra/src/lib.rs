//! Infrastructure layer: persistence, configuration, clock, notifications
//! and the application services built on top of them.

pub mod clock;
pub mod config;
pub mod notify;
pub mod seed;
pub mod services;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigError, DatabaseConfig, ManagerSeed, SeedConfig};
pub use notify::{LogNotifier, Message, Notifier, NotifyError};
pub use seed::{SeedReport, run_seed};
pub use services::{
    AccountService, ClientRef, ClientRegistry, CreateClient, CreateUser, DashboardAggregator,
    LoginOutcome, LoyaltyServices, ProgramSettings, RedemptionEngine, ServiceDeps, ServiceError,
    ServiceResult, VisitLedger, VisitRecord,
};
pub use store::{InMemoryLoyaltyStore, LoyaltyStore, PostgresLoyaltyStore, StoreError, StoreTx};
