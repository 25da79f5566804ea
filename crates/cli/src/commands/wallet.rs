//! Wallet commands: deposit, withdraw, bet, history

use anyhow::Result;
use pandaloto_business::{AdminService, BetRequest, WalletService};
use pandaloto_core::{format_brl, GameData, GameType, LedgerEntry};

use super::print_alerts;
use crate::db::App;
use crate::WalletAction;

pub async fn handle(app: &App, actor: Option<&str>, action: WalletAction) -> Result<()> {
    let (me, req) = app.session(actor).await?;
    let wallet = WalletService::new(&app.ctx);

    match action {
        WalletAction::Deposit { amount, method, user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let result = wallet.deposit(&req, &target.id, amount, method.to_core()).await?;

            println!("✅ Deposit completed!");
            print_entry(&result.transaction);
            println!("   New balance: {}", format_brl(result.new_balance));
            print_alerts(&result.alerts);
        }

        WalletAction::Withdraw { amount, user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let result = wallet.withdraw(&req, &target.id, amount).await?;

            println!("⏳ Withdrawal requested (pending approval)");
            print_entry(&result.transaction);
            println!("   New balance: {}", format_brl(result.new_balance));
            print_alerts(&result.alerts);
        }

        WalletAction::Bet {
            game,
            amount,
            game_id,
            numbers,
            animal,
            modality,
            table,
            user,
        } => {
            let target = app.target(&me, user.as_deref()).await?;
            let game_type = game.to_core();

            let mut request = BetRequest::new(game_type, amount);
            if let Some(game_id) = &game_id {
                request = request.with_game_id(game_id);
            }
            let game_data = match game_type {
                GameType::Lottery => numbers.map(GameData::lottery),
                GameType::JogoBicho => animal.map(|a| GameData::jogo_bicho(&a, &modality)),
                GameType::Casino => table.map(|t| GameData::casino(&t)),
            };
            if let Some(game_data) = game_data {
                request = request.with_game_data(game_data);
            }

            let result = wallet.place_bet(&req, &target.id, request).await?;
            println!("🎲 Bet placed!");
            println!("   Bet:           {}", result.bet.id);
            println!("   Game:          {}", result.bet.game_type.label());
            println!("   Stake:         {}", format_brl(result.bet.amount));
            println!("   Potential win: {}", format_brl(result.bet.potential_win));
            println!("   New balance:   {}", format_brl(result.new_balance));
            print_alerts(&result.alerts);
        }

        WalletAction::Balance { user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let stats = wallet.user_stats(&req, &target.id).await?;

            println!("💰 {}", target.username);
            println!("   Balance:       {}", format_brl(stats.balance));
            println!("   Total wagered: {}", format_brl(stats.total_wagered));
            println!("   Total won:     {}", format_brl(stats.total_won));
        }

        WalletAction::History { limit, user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let entries = wallet.transactions(&req, &target.id, limit).await?;

            println!("📜 Transactions of {} ({})", target.username, entries.len());
            println!(
                "{:<20} {:<12} {:<10} {:>14} {:>14}  DESCRIPTION",
                "DATE", "TYPE", "STATUS", "AMOUNT", "BALANCE"
            );
            for entry in entries {
                println!(
                    "{:<20} {:<12} {:<10} {:>14} {:>14}  {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.tx_type,
                    entry.status,
                    format_brl(entry.amount),
                    format_brl(entry.balance_after),
                    entry.description
                );
            }
        }

        WalletAction::Bets { limit, user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let bets = wallet.bets(&req, &target.id, limit).await?;

            println!("🎲 Bets of {} ({})", target.username, bets.len());
            for bet in bets {
                println!(
                    "   {}  {:<14} {:>12} → {:>12}  [{}]",
                    bet.placed_at.format("%Y-%m-%d %H:%M"),
                    bet.game_type.label(),
                    format_brl(bet.amount),
                    format_brl(bet.potential_win),
                    bet.status
                );
            }
        }

        WalletAction::Pending => {
            let withdrawals = AdminService::new(&app.ctx).open_withdrawals(&req).await?;

            println!("⏳ Open withdrawals ({})", withdrawals.len());
            for entry in withdrawals {
                println!(
                    "   {}  {}  user {}  {}  [{}]",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.user_id,
                    format_brl(entry.magnitude()),
                    entry.status
                );
            }
        }

        WalletAction::Process { transaction_id, status } => {
            let update = AdminService::new(&app.ctx)
                .update_withdrawal_status(&req, &transaction_id, status.to_core())
                .await?;

            println!("✅ Withdrawal {} is now {}", update.withdrawal.id, update.withdrawal.status);
            if let Some(refund) = update.refund {
                println!(
                    "   ↩️  Refunded {} (balance {})",
                    format_brl(refund.amount),
                    format_brl(refund.balance_after)
                );
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &LedgerEntry) {
    println!("   Transaction: {}", entry.id);
    println!("   Amount:      {}", format_brl(entry.magnitude()));
    println!("   Status:      {}", entry.status);
}
