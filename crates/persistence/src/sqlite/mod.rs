//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod analytics;
pub mod repos;
pub mod schema;

pub use analytics::{
    AnalyticsOverview, AnalyticsRepo, BetStats, BonusStats, FraudStats, PlatformStats, Revenue,
    TimePeriod, TimeSeriesPoint, TopUser, TransactionStats, UserCounts,
};
pub use repos::{
    create_pool, init_database, run_migrations, AuditLogRepo, BetRepo, BonusRepo, FraudAlertRepo,
    KycDocumentRepo, TransactionRepo, UserRepo,
};
pub use schema::{
    AuditLogRow, BetRow, BonusRow, FraudAlertRow, KycDocumentRow, TransactionRow, UserRow,
};
