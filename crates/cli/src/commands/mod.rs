//! Subcommand handlers

pub mod account;
pub mod audit;
pub mod kyc;
pub mod promo;
pub mod report;
pub mod wallet;

use pandaloto_core::FraudAlert;

/// Print alerts raised while processing a command
pub(crate) fn print_alerts(alerts: &[FraudAlert]) {
    for alert in alerts {
        println!(
            "   ⚠️  Fraud alert [{}] {}: {}",
            alert.severity,
            alert.alert_type,
            alert.details.summary()
        );
    }
}
