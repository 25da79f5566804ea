//! # Pandaloto Core
//!
//! Domain types and pure rules for the Pandaloto casino/lottery platform.
//!
//! ## Modules
//!
//! ```text
//! money    - BRL amounts (2 decimal places)
//! user     - User, Role, KycStatus
//! ledger   - LedgerEntry, TransactionType, TransactionStatus
//! bet      - Bet, GameType, GameData
//! kyc      - KycDocument and status aggregation
//! fraud    - FraudAlert and the detection rules
//! bonus    - Bonus, wagering progress, promotions
//! audit    - AuditLog
//! context  - RequestContext (who is acting)
//! ```
//!
//! Nothing in this crate touches storage. Persistence and orchestration live in
//! `pandaloto-persistence` and `pandaloto-business`.

pub mod audit;
pub mod bet;
pub mod bonus;
pub mod context;
pub mod error;
pub mod fraud;
pub mod kyc;
pub mod ledger;
pub mod money;
pub mod user;

pub use audit::{AuditAction, AuditLog, EntityType};
pub use bet::{Bet, BetStatus, GameData, GameSelection, GameType};
pub use bonus::{Bonus, BonusStatus, BonusType, PromotionDraft};
pub use context::RequestContext;
pub use error::{CoreError, CoreResult};
pub use fraud::{AlertDetails, AlertStatus, AlertType, DetectedPattern, FraudAlert, FraudThresholds, Severity};
pub use kyc::{DocumentType, KycDocument};
pub use ledger::{KnownMetadata, LedgerEntry, PaymentMethod, TransactionMetadata, TransactionStatus, TransactionType};
pub use money::{format_brl, to_cents, validate_amount, MAX_AMOUNT};
pub use user::{KycStatus, Role, User};
