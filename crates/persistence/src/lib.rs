//! # Pandaloto Persistence
//!
//! SQLite persistence for Pandaloto.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │  │   SQLite    │    │    Repos    │    │    Analytics    │  │
//! │  │ (WAL, FKs)  │    │   (CRUD)    │    │  (aggregation)  │  │
//! │  └─────────────┘    └─────────────┘    └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pandaloto_persistence::{Database, UserRepo};
//!
//! let db = Database::init("sqlite:pandaloto.db", 5, Duration::from_secs(5)).await?;
//! let users = UserRepo::get_all(db.pool()).await?;
//!
//! // balance changes run inside one transaction
//! let mut tx = db.pool().begin().await?;
//! UserRepo::lock_for_update(&mut *tx, &user_id, now).await?;
//! ```

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::*;

use sqlx::SqlitePool;
use std::time::Duration;

/// Database facade
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to an existing, migrated database
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:pandaloto.db")
    pub async fn connect(db_url: &str, max_connections: u32, busy_timeout: Duration) -> PersistenceResult<Self> {
        let pool = sqlite::create_pool(db_url, max_connections, busy_timeout).await?;
        Ok(Self { pool })
    }

    /// Create the database if needed and apply migrations
    pub async fn init(db_url: &str, max_connections: u32, busy_timeout: Duration) -> PersistenceResult<Self> {
        let pool = init_database(db_url, max_connections, busy_timeout).await?;
        Ok(Self { pool })
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
