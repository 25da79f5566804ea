//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx and row decoding errors.

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    // === Conversion errors ===
    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("Invalid JSON in {field}: {source}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt row: {0}")]
    Corrupt(#[from] pandaloto_core::CoreError),
}

/// Result type alias with PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Unique constraint hit, either mapped already or straight from SQLite
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::UniqueViolation(_) => true,
            Self::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }

    /// Name of the violated column, when SQLite reports one
    /// ("UNIQUE constraint failed: users.email" -> "email")
    pub fn violated_column(&self) -> Option<String> {
        let message = match self {
            Self::UniqueViolation(m) => m.clone(),
            Self::Database(sqlx::Error::Database(db)) => db.message().to_string(),
            _ => return None,
        };
        message
            .rsplit(['.', ' '])
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = PersistenceError::not_found("User", "u-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Record not found: User with id u-1");
    }

    #[test]
    fn test_violated_column() {
        let err = PersistenceError::UniqueViolation("UNIQUE constraint failed: users.email".to_string());
        assert!(err.is_unique_violation());
        assert_eq!(err.violated_column().as_deref(), Some("email"));
    }
}
