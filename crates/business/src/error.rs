//! Business layer errors
//!
//! The caller-visible error taxonomy. Lower layer errors are folded into the
//! matching variant where one exists, so callers can match on the outcome
//! without digging through sqlx or row-decoding errors.

use pandaloto_core::{CoreError, KycStatus};
use pandaloto_persistence::PersistenceError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Validation errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition for {entity}: {from} -> {to}")]
    InvalidStatusTransition {
        entity: String,
        from: String,
        to: String,
    },

    // === Gate errors ===
    #[error("KYC approval required (current status: {status})")]
    KycRequired { status: KycStatus },

    #[error("Too many requests: {count} transactions in the velocity window")]
    TooManyRequests { count: usize },

    #[error("Account inactive: {0}")]
    AccountInactive(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // === Promotion errors ===
    #[error("Promo code not found or expired: {0}")]
    PromoCodeNotFound(String),

    #[error("Promo code already used: {0}")]
    PromoCodeAlreadyUsed(String),

    // === Not found errors ===
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("KYC document not found: {0}")]
    DocumentNotFound(String),

    #[error("Fraud alert not found: {0}")]
    AlertNotFound(String),

    #[error("Bonus not found: {0}")]
    BonusNotFound(String),

    // === Conflict errors ===
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[source] PersistenceError),

    #[error("Core error: {0}")]
    Core(#[source] CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl BusinessError {
    /// Create insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Create forbidden error
    pub fn forbidden(reason: &str) -> Self {
        Self::Forbidden(reason.to_string())
    }

    /// HTTP-equivalent status class of the error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_)
            | Self::InsufficientFunds { .. }
            | Self::Validation(_)
            | Self::InvalidStatusTransition { .. }
            | Self::PromoCodeAlreadyUsed(_) => 400,
            Self::InvalidCredentials => 401,
            Self::KycRequired { .. } | Self::AccountInactive(_) | Self::Forbidden(_) => 403,
            Self::PromoCodeNotFound(_)
            | Self::UserNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::AlertNotFound(_)
            | Self::BonusNotFound(_) => 404,
            Self::UsernameTaken(_) | Self::EmailTaken(_) => 409,
            Self::TooManyRequests { .. } => 429,
            Self::Persistence(_) | Self::Core(_) => 500,
        }
    }

    /// Short message for the player or operator (pt-BR)
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "Valor inválido",
            Self::InsufficientFunds { .. } => "Saldo insuficiente",
            Self::Validation(_) => "Dados inválidos",
            Self::InvalidStatusTransition { .. } => "Alteração de status não permitida",
            Self::KycRequired { .. } => {
                "Para realizar saques, é necessário completar a verificação KYC primeiro"
            }
            Self::TooManyRequests { .. } => "Muitas transações em curto período. Aguarde um momento.",
            Self::AccountInactive(_) => "Conta suspensa",
            Self::Forbidden(_) => "Acesso negado",
            Self::InvalidCredentials => "Usuário ou senha inválidos",
            Self::PromoCodeNotFound(_) => "Código inválido ou expirado",
            Self::PromoCodeAlreadyUsed(_) => "Código já utilizado",
            Self::UserNotFound(_) => "Usuário não encontrado",
            Self::TransactionNotFound(_) => "Transação não encontrada",
            Self::DocumentNotFound(_) => "Documento não encontrado",
            Self::AlertNotFound(_) => "Alerta não encontrado",
            Self::BonusNotFound(_) => "Bônus não encontrado",
            Self::UsernameTaken(_) => "Nome de usuário já existe",
            Self::EmailTaken(_) => "Email já cadastrado",
            Self::Persistence(_) | Self::Core(_) => "Erro interno, tente novamente",
        }
    }

    /// Whether the caller caused the error (4xx class)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<PersistenceError> for BusinessError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity, id } => match entity.as_str() {
                "User" => Self::UserNotFound(id),
                "Transaction" => Self::TransactionNotFound(id),
                "KycDocument" => Self::DocumentNotFound(id),
                "FraudAlert" => Self::AlertNotFound(id),
                "Bonus" => Self::BonusNotFound(id),
                _ => Self::Persistence(PersistenceError::NotFound { entity, id }),
            },
            PersistenceError::UniqueViolation(message) => {
                if message.ends_with("users.username") {
                    Self::UsernameTaken(message)
                } else if message.ends_with("users.email") {
                    Self::EmailTaken(message)
                } else {
                    Self::Persistence(PersistenceError::UniqueViolation(message))
                }
            }
            PersistenceError::Corrupt(core) => Self::Core(core),
            other => Self::Persistence(other),
        }
    }
}

impl From<CoreError> for BusinessError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount(reason) => Self::InvalidAmount(reason),
            CoreError::InsufficientFunds { needed, available } => {
                Self::insufficient_funds(needed, available)
            }
            CoreError::InvalidTransition { entity, from, to } => {
                Self::InvalidStatusTransition { entity, from, to }
            }
            CoreError::ValidationError(reason) => Self::Validation(reason),
            other => Self::Core(other),
        }
    }
}

impl From<sqlx::Error> for BusinessError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(PersistenceError::Database(err))
    }
}
