//! # Pandaloto Business
//!
//! Business logic layer - wallet, KYC, bonus, fraud and admin operations.
//!
//! Every balance change goes through [`ledger::BalanceMutator`] inside one
//! database transaction together with its dependent rows and audit entry.
//! Fraud rules run after commit and never fail the caller, except for the
//! velocity pre-check on deposits and withdrawals.

pub mod account;
pub mod admin;
pub mod bonus;
pub mod config;
pub mod error;
pub mod fraud;
pub mod kyc;
pub mod ledger;
pub mod services;
pub mod wallet;

pub use account::{AccountService, NewUser, Registration};
pub use admin::{AdminService, WithdrawalUpdate};
pub use bonus::{BonusProgress, BonusService};
pub use config::{ConfigError, PlatformConfig};
pub use error::{BusinessError, BusinessResult};
pub use fraud::FraudEngine;
pub use kyc::KycService;
pub use ledger::{BalanceChange, BalanceMutator};
pub use services::{Clock, ManualClock, ServiceContext, SystemClock, TransactionResult};
pub use wallet::{BetRequest, BetResult, UserStats, WalletService, DEFAULT_HISTORY_LIMIT};
