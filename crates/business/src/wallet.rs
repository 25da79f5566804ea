//! Wallet operations - deposit, withdraw, place bet
//!
//! WalletService moves player money. Every operation goes through the
//! balance mutator in one database transaction together with its audit row,
//! then hands the user to the fraud engine.

use crate::error::BusinessResult;
use crate::fraud::FraudEngine;
use crate::ledger::{BalanceChange, BalanceMutator};
use crate::services::{ensure_can_act_on, ServiceContext, TransactionResult};
use pandaloto_core::{
    AuditAction, AuditLog, Bet, EntityType, FraudAlert, GameData, GameType, LedgerEntry,
    PaymentMethod, RequestContext, TransactionMetadata, TransactionStatus, TransactionType,
};
use pandaloto_persistence::{AuditLogRepo, BetRepo, TransactionRepo, UserRepo};
use rust_decimal::Decimal;
use serde::Serialize;

/// Default page size for history listings
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Bet placement request
#[derive(Debug, Clone)]
pub struct BetRequest {
    pub game_type: GameType,
    pub amount: Decimal,
    pub game_id: Option<String>,
    pub game_data: Option<GameData>,
}

impl BetRequest {
    pub fn new(game_type: GameType, amount: Decimal) -> Self {
        Self {
            game_type,
            amount,
            game_id: None,
            game_data: None,
        }
    }

    pub fn with_game_id(mut self, game_id: &str) -> Self {
        self.game_id = Some(game_id.to_string());
        self
    }

    pub fn with_game_data(mut self, game_data: GameData) -> Self {
        self.game_data = Some(game_data);
        self
    }
}

/// Outcome of a placed bet
#[derive(Debug, Clone)]
pub struct BetResult {
    pub bet: Bet,
    pub transaction: LedgerEntry,
    pub new_balance: Decimal,
    pub alerts: Vec<FraudAlert>,
}

/// Per-user betting totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub balance: Decimal,
    pub total_wagered: Decimal,
    pub total_won: Decimal,
}

#[derive(Serialize)]
struct MoneyMovement {
    amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method: Option<PaymentMethod>,
    balance_after: Decimal,
}

#[derive(Serialize)]
struct BetPlaced<'a> {
    game_type: GameType,
    amount: Decimal,
    potential_win: Decimal,
    transaction_id: &'a str,
}

/// Wallet Service - handles deposit, withdraw, bet operations
pub struct WalletService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WalletService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Credit a simulated deposit. Settles instantly (`completed`).
    pub async fn deposit(
        &self,
        req: &RequestContext,
        user_id: &str,
        amount: Decimal,
        method: PaymentMethod,
    ) -> BusinessResult<TransactionResult> {
        ensure_can_act_on(req, user_id)?;

        let change = BalanceChange::credit(user_id, TransactionType::Deposit, amount)?
            .with_payment_method(method)
            .with_metadata(TransactionMetadata::payment(method))
            .with_description(format!("Depósito via {}", method));

        FraudEngine::new(self.ctx).velocity_precheck(user_id).await?;

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;
        let entry = BalanceMutator::apply(&mut tx, &change, self.ctx.next_id(), now).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::DepositCompleted, now)
            .by(req)
            .on(EntityType::Transaction, &entry.id)
            .with_details(&MoneyMovement {
                amount: entry.amount,
                payment_method: Some(method),
                balance_after: entry.balance_after,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %user_id, tx = %entry.id, amount = %entry.amount, "deposit completed");

        let alerts = FraudEngine::new(self.ctx).after_event(user_id).await;
        Ok(TransactionResult::new(entry).with_alerts(alerts))
    }

    /// Request a withdrawal. The amount leaves the balance now and the entry
    /// stays `pending` until an admin processes it.
    pub async fn withdraw(
        &self,
        req: &RequestContext,
        user_id: &str,
        amount: Decimal,
    ) -> BusinessResult<TransactionResult> {
        ensure_can_act_on(req, user_id)?;

        let change = BalanceChange::debit(user_id, TransactionType::Withdraw, amount)?
            .with_status(TransactionStatus::Pending)
            .with_payment_method(PaymentMethod::Pix)
            .with_metadata(TransactionMetadata::payment(PaymentMethod::Pix))
            .with_description("Solicitação de saque")
            .requiring_kyc();

        FraudEngine::new(self.ctx).velocity_precheck(user_id).await?;

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;
        let entry = BalanceMutator::apply(&mut tx, &change, self.ctx.next_id(), now).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::WithdrawalRequested, now)
            .by(req)
            .on(EntityType::Transaction, &entry.id)
            .with_details(&MoneyMovement {
                amount: entry.amount,
                payment_method: Some(PaymentMethod::Pix),
                balance_after: entry.balance_after,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %user_id, tx = %entry.id, amount = %entry.amount, "withdrawal requested");

        let alerts = FraudEngine::new(self.ctx).after_event(user_id).await;
        Ok(TransactionResult::new(entry).with_alerts(alerts))
    }

    /// Capture a stake and record the bet. No settlement happens here.
    pub async fn place_bet(
        &self,
        req: &RequestContext,
        user_id: &str,
        request: BetRequest,
    ) -> BusinessResult<BetResult> {
        ensure_can_act_on(req, user_id)?;

        let bet_id = self.ctx.next_id();
        let change = BalanceChange::debit(user_id, TransactionType::BetStake, request.amount)?
            .with_metadata(TransactionMetadata::bet_stake(&bet_id, request.game_type))
            .with_description(format!("Aposta em {}", request.game_type.label()));

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;
        let entry = BalanceMutator::apply(&mut tx, &change, self.ctx.next_id(), now).await?;

        let bet = Bet::new(
            bet_id,
            user_id,
            &entry.id,
            request.game_type,
            entry.magnitude(),
            self.ctx.config().betting.payout_multiplier,
            now,
        )
        .with_game_id(request.game_id)
        .with_game_data(request.game_data);
        BetRepo::insert(&mut *tx, &bet).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::BetPlaced, now)
            .by(req)
            .on(EntityType::Bet, &bet.id)
            .with_details(&BetPlaced {
                game_type: bet.game_type,
                amount: bet.amount,
                potential_win: bet.potential_win,
                transaction_id: &entry.id,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %user_id, bet = %bet.id, amount = %bet.amount, "bet placed");

        let alerts = FraudEngine::new(self.ctx).after_event(user_id).await;
        Ok(BetResult {
            new_balance: entry.balance_after,
            bet,
            transaction: entry,
            alerts,
        })
    }

    /// Latest ledger entries of a user, newest first
    pub async fn transactions(
        &self,
        req: &RequestContext,
        user_id: &str,
        limit: i64,
    ) -> BusinessResult<Vec<LedgerEntry>> {
        ensure_can_act_on(req, user_id)?;
        Ok(TransactionRepo::list_by_user(self.ctx.pool(), user_id, limit).await?)
    }

    /// Latest bets of a user, newest first
    pub async fn bets(&self, req: &RequestContext, user_id: &str, limit: i64) -> BusinessResult<Vec<Bet>> {
        ensure_can_act_on(req, user_id)?;
        Ok(BetRepo::list_by_user(self.ctx.pool(), user_id, limit).await?)
    }

    pub async fn user_stats(&self, req: &RequestContext, user_id: &str) -> BusinessResult<UserStats> {
        ensure_can_act_on(req, user_id)?;
        let balance = UserRepo::get_balance(self.ctx.pool(), user_id).await?;
        let (total_wagered, total_won) = BetRepo::totals_by_user(self.ctx.pool(), user_id).await?;
        Ok(UserStats {
            balance,
            total_wagered,
            total_won,
        })
    }
}
