//! Promo code and bonus commands

use anyhow::Result;
use chrono::Duration;
use pandaloto_business::{BonusProgress, BonusService};
use pandaloto_core::{format_brl, Bonus, PromotionDraft};

use crate::db::App;
use crate::PromoAction;

pub async fn handle(app: &App, actor: Option<&str>, action: PromoAction) -> Result<()> {
    let (me, req) = app.session(actor).await?;
    let bonuses = BonusService::new(&app.ctx);

    match action {
        PromoAction::Apply { code, user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let bonus = bonuses.apply_promo_code(&req, &target.id, &code).await?;

            println!("🎁 Promo code applied!");
            println!("   Bonus:  {}", format_brl(bonus.amount));
            if !bonus.wager_requirement.is_zero() {
                println!("   Wager {} to unlock", format_brl(bonus.wager_requirement));
            }
        }

        PromoAction::Create {
            code,
            amount,
            wager,
            bonus_type,
            description,
            expires_in_days,
        } => {
            let draft = PromotionDraft {
                bonus_type: bonus_type.to_core(),
                amount,
                wager_requirement: wager,
                code: Some(code),
                description,
                expires_at: expires_in_days.map(|days| app.ctx.now() + Duration::days(days)),
            };
            let template = bonuses.create_promotion(&req, draft).await?;

            println!("📣 Promotion published: {}", template.code.as_deref().unwrap_or_default());
            println!("   ID:     {}", template.id);
            println!("   Amount: {}", format_brl(template.amount));
            if let Some(expires_at) = template.expires_at {
                println!("   Until:  {}", expires_at.format("%Y-%m-%d %H:%M"));
            }
        }

        PromoAction::List { user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let list = bonuses.bonuses(&req, &target.id, None).await?;

            println!("🎁 Bonuses of {} ({})", target.username, list.len());
            for bonus in &list {
                print_bonus(bonus);
            }
        }

        PromoAction::All => {
            let list = bonuses.all_bonuses(&req).await?;
            println!("🎁 All bonuses ({})", list.len());
            for bonus in &list {
                print_bonus(bonus);
            }
        }
    }

    Ok(())
}

fn print_bonus(bonus: &Bonus) {
    let progress = BonusProgress::from(bonus);
    println!(
        "   {:<13} {:>12}  {:<9} {:>6}%  {}",
        bonus.bonus_type,
        format_brl(bonus.amount),
        bonus.status,
        progress.progress.round_dp(1),
        bonus.code.as_deref().unwrap_or("-")
    );
}
