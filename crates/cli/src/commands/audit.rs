//! Fraud alert review and audit trail

use anyhow::Result;
use pandaloto_business::AdminService;

use crate::db::App;
use crate::FraudAction;

pub async fn handle(app: &App, actor: Option<&str>, action: FraudAction) -> Result<()> {
    let (_, req) = app.session(actor).await?;
    let admin = AdminService::new(&app.ctx);

    match action {
        FraudAction::List { status } => {
            let alerts = admin.list_fraud_alerts(&req, status.map(|s| s.to_core())).await?;

            println!("🚨 Fraud alerts ({})", alerts.len());
            for alert in alerts {
                println!(
                    "   {}  {}  [{}] {} user {} ({})",
                    alert.id,
                    alert.triggered_at.format("%Y-%m-%d %H:%M"),
                    alert.severity,
                    alert.alert_type,
                    alert.user_id,
                    alert.status
                );
                println!("      {}", alert.details.summary());
                if let Some(notes) = &alert.notes {
                    println!("      notes: {}", notes);
                }
            }
        }

        FraudAction::Review { alert_id, status, notes } => {
            let alert = admin
                .review_fraud_alert(&req, &alert_id, status.to_core(), notes)
                .await?;
            println!("✅ Alert {} is now {}", alert.id, alert.status);
        }

        FraudAction::Audit { limit } => {
            let logs = admin.audit_trail(&req, limit).await?;

            println!("📋 Audit trail ({} entries)", logs.len());
            for log in logs {
                let entity = match (&log.entity_type, &log.entity_id) {
                    (Some(kind), Some(id)) => format!("{}:{}", kind, id),
                    _ => "-".to_string(),
                };
                println!(
                    "   {}  {:<28} by {:<36} {}",
                    log.created_at.format("%Y-%m-%d %H:%M:%S"),
                    log.action,
                    log.user_id.as_deref().unwrap_or("system"),
                    entity
                );
            }
        }
    }

    Ok(())
}
