//! Reporting aggregations
//!
//! Read-only SQL over the whole platform. Money columns are summed as integer
//! cents so results stay exact.

use crate::error::PersistenceResult;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;
use std::fmt;

/// `SUM` of a TEXT money expression as integer cents, 0 when empty
fn cents_sum(expr: &str) -> String {
    format!(
        "COALESCE(SUM(CAST(ROUND(CAST({} AS REAL) * 100) AS INTEGER)), 0)",
        expr
    )
}

fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

// === Result types ===

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub kyc_approved_users: i64,
    pub admin_users: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_transactions: i64,
    pub total_deposits: i64,
    pub total_withdrawals: i64,
    pub deposit_volume: Decimal,
    pub withdrawal_volume: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetStats {
    pub total_bets: i64,
    pub winning_bets: i64,
    pub losing_bets: i64,
    pub open_bets: i64,
    pub total_wagered: Decimal,
    pub total_payouts: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusStats {
    pub total_bonuses: i64,
    pub active_bonuses: i64,
    pub promotion_templates: i64,
    pub bonus_value_issued: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FraudStats {
    pub total_alerts: i64,
    pub pending_alerts: i64,
    pub investigating_alerts: i64,
    pub resolved_alerts: i64,
    pub false_positive_alerts: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    /// Gross gaming revenue: wagered minus payouts
    pub ggr: Decimal,
    pub total_wagered: Decimal,
    pub total_payouts: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub users: UserCounts,
    pub transactions: TransactionStats,
    pub bets: BetStats,
    pub bonuses: BonusStats,
    pub fraud_alerts: FraudStats,
    pub revenue: Revenue,
}

/// Bucket size for the transaction time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    /// Hourly buckets over 30 days
    Day,
    /// Weekly buckets over 12 weeks
    Week,
    /// Monthly buckets over a year
    Month,
}

impl TimePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Day => "day",
            TimePeriod::Week => "week",
            TimePeriod::Month => "month",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" => Some(TimePeriod::Day),
            "week" => Some(TimePeriod::Week),
            "month" => Some(TimePeriod::Month),
            _ => None,
        }
    }

    /// strftime pattern of a bucket label
    pub fn bucket_format(&self) -> &'static str {
        match self {
            TimePeriod::Day => "%Y-%m-%d %H:00",
            TimePeriod::Week => "%Y-%W",
            TimePeriod::Month => "%Y-%m",
        }
    }

    pub fn lookback(&self) -> Duration {
        match self {
            TimePeriod::Day => Duration::days(30),
            TimePeriod::Week => Duration::days(84),
            TimePeriod::Month => Duration::days(365),
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub period_start: DateTime<Utc>,
    pub count: i64,
    pub deposits: Decimal,
    pub withdrawals: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub total_wagered: Decimal,
    pub total_deposited: Decimal,
    pub bet_count: i64,
}

/// Counters for the admin dashboard header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub pending_kyc_count: i64,
    /// Stakes of bets lost today
    pub today_revenue: Decimal,
    pub active_bets: i64,
}

// ============================================================================
// Analytics Repository
// ============================================================================

pub struct AnalyticsRepo;

impl AnalyticsRepo {
    pub async fn user_counts<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<UserCounts> {
        let (total_users, active_users, kyc_approved_users, admin_users): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(CASE WHEN is_active = 1 THEN 1 END),
                    COUNT(CASE WHEN kyc_status = 'approved' THEN 1 END),
                    COUNT(CASE WHEN role = 'admin' THEN 1 END)
                FROM users
                "#,
            )
            .fetch_one(exec)
            .await?;

        Ok(UserCounts {
            total_users,
            active_users,
            kyc_approved_users,
            admin_users,
        })
    }

    pub async fn transaction_stats<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<TransactionStats> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*),
                COUNT(CASE WHEN tx_type = 'deposit' THEN 1 END),
                COUNT(CASE WHEN tx_type = 'withdraw' THEN 1 END),
                {},
                {}
            FROM transactions
            "#,
            cents_sum("CASE WHEN tx_type = 'deposit' AND status = 'completed' THEN amount ELSE 0 END"),
            cents_sum("CASE WHEN tx_type = 'withdraw' AND status = 'completed' THEN ABS(CAST(amount AS REAL)) ELSE 0 END"),
        );
        let (total_transactions, total_deposits, total_withdrawals, deposit_cents, withdrawal_cents): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(&sql).fetch_one(exec).await?;

        Ok(TransactionStats {
            total_transactions,
            total_deposits,
            total_withdrawals,
            deposit_volume: from_cents(deposit_cents),
            withdrawal_volume: from_cents(withdrawal_cents),
        })
    }

    pub async fn bet_stats<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<BetStats> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*),
                COUNT(CASE WHEN status = 'won' THEN 1 END),
                COUNT(CASE WHEN status = 'lost' THEN 1 END),
                COUNT(CASE WHEN status IN ('pending', 'active') THEN 1 END),
                {},
                {}
            FROM bets
            "#,
            cents_sum("amount"),
            cents_sum("CASE WHEN status = 'won' THEN potential_win ELSE 0 END"),
        );
        let (total_bets, winning_bets, losing_bets, open_bets, wagered_cents, payout_cents): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(&sql).fetch_one(exec).await?;

        Ok(BetStats {
            total_bets,
            winning_bets,
            losing_bets,
            open_bets,
            total_wagered: from_cents(wagered_cents),
            total_payouts: from_cents(payout_cents),
        })
    }

    pub async fn bonus_stats<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<BonusStats> {
        let sql = format!(
            r#"
            SELECT
                COUNT(CASE WHEN status != 'pending' THEN 1 END),
                COUNT(CASE WHEN status = 'active' THEN 1 END),
                COUNT(CASE WHEN status = 'pending' THEN 1 END),
                {}
            FROM bonuses
            "#,
            cents_sum("CASE WHEN status IN ('active', 'used') THEN amount ELSE 0 END"),
        );
        let (total_bonuses, active_bonuses, promotion_templates, issued_cents): (i64, i64, i64, i64) =
            sqlx::query_as(&sql).fetch_one(exec).await?;

        Ok(BonusStats {
            total_bonuses,
            active_bonuses,
            promotion_templates,
            bonus_value_issued: from_cents(issued_cents),
        })
    }

    pub async fn fraud_stats<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<FraudStats> {
        let (total_alerts, pending_alerts, investigating_alerts, resolved_alerts, false_positive_alerts): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(CASE WHEN status = 'pending' THEN 1 END),
                COUNT(CASE WHEN status = 'investigating' THEN 1 END),
                COUNT(CASE WHEN status = 'resolved' THEN 1 END),
                COUNT(CASE WHEN status = 'false_positive' THEN 1 END)
            FROM fraud_alerts
            "#,
        )
        .fetch_one(exec)
        .await?;

        Ok(FraudStats {
            total_alerts,
            pending_alerts,
            investigating_alerts,
            resolved_alerts,
            false_positive_alerts,
        })
    }

    /// Transaction counts and completed volumes per bucket, newest first
    pub async fn time_series<'e, E: SqliteExecutor<'e>>(
        exec: E,
        period: TimePeriod,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<TimeSeriesPoint>> {
        let sql = format!(
            r#"
            SELECT
                strftime(?, created_at) AS period,
                MIN(created_at) AS period_start,
                COUNT(*),
                {},
                {}
            FROM transactions
            WHERE created_at >= ?
            GROUP BY 1
            ORDER BY period_start DESC
            "#,
            cents_sum("CASE WHEN tx_type = 'deposit' AND status = 'completed' THEN amount ELSE 0 END"),
            cents_sum("CASE WHEN tx_type = 'withdraw' AND status = 'completed' THEN ABS(CAST(amount AS REAL)) ELSE 0 END"),
        );
        let rows: Vec<(String, DateTime<Utc>, i64, i64, i64)> = sqlx::query_as(&sql)
            .bind(period.bucket_format())
            .bind(now - period.lookback())
            .fetch_all(exec)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(period, period_start, count, deposits, withdrawals)| TimeSeriesPoint {
                period,
                period_start,
                count,
                deposits: from_cents(deposits),
                withdrawals: from_cents(withdrawals),
            })
            .collect())
    }

    /// Non-admin users with any wagering, biggest wagerers first
    pub async fn top_users<'e, E: SqliteExecutor<'e>>(exec: E, limit: i64) -> PersistenceResult<Vec<TopUser>> {
        let sql = format!(
            r#"
            SELECT id, username, email, wagered, deposited, bet_count FROM (
                SELECT
                    u.id AS id,
                    u.username AS username,
                    u.email AS email,
                    (SELECT {} FROM bets b WHERE b.user_id = u.id) AS wagered,
                    (SELECT {} FROM transactions t
                        WHERE t.user_id = u.id AND t.tx_type = 'deposit' AND t.status = 'completed') AS deposited,
                    (SELECT COUNT(*) FROM bets b WHERE b.user_id = u.id) AS bet_count
                FROM users u
                WHERE u.role != 'admin'
            )
            WHERE wagered > 0
            ORDER BY wagered DESC, username
            LIMIT ?
            "#,
            cents_sum("b.amount"),
            cents_sum("t.amount"),
        );
        let rows: Vec<(String, String, String, i64, i64, i64)> =
            sqlx::query_as(&sql).bind(limit).fetch_all(exec).await?;

        Ok(rows
            .into_iter()
            .map(|(id, username, email, wagered, deposited, bet_count)| TopUser {
                id,
                username,
                email,
                total_wagered: from_cents(wagered),
                total_deposited: from_cents(deposited),
                bet_count,
            })
            .collect())
    }

    /// Every section of the overview in one call
    pub async fn overview(pool: &SqlitePool) -> PersistenceResult<AnalyticsOverview> {
        Ok(AnalyticsOverview::new(
            Self::user_counts(pool).await?,
            Self::transaction_stats(pool).await?,
            Self::bet_stats(pool).await?,
            Self::bonus_stats(pool).await?,
            Self::fraud_stats(pool).await?,
        ))
    }

    pub async fn platform_stats(pool: &SqlitePool, now: DateTime<Utc>) -> PersistenceResult<PlatformStats> {
        let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        let (pending_kyc_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM kyc_documents WHERE status IN ('pending', 'under_review')",
        )
        .fetch_one(pool)
        .await?;
        let (active_bets,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bets WHERE status IN ('pending', 'active')")
                .fetch_one(pool)
                .await?;

        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let sql = format!(
            "SELECT {} FROM bets WHERE status = 'lost' AND placed_at >= ?",
            cents_sum("amount")
        );
        let (revenue_cents,): (i64,) = sqlx::query_as(&sql).bind(midnight).fetch_one(pool).await?;

        Ok(PlatformStats {
            total_users,
            pending_kyc_count,
            today_revenue: from_cents(revenue_cents),
            active_bets,
        })
    }
}

impl AnalyticsOverview {
    pub fn new(
        users: UserCounts,
        transactions: TransactionStats,
        bets: BetStats,
        bonuses: BonusStats,
        fraud_alerts: FraudStats,
    ) -> Self {
        let revenue = Revenue {
            ggr: bets.total_wagered - bets.total_payouts,
            total_wagered: bets.total_wagered,
            total_payouts: bets.total_payouts,
        };
        Self {
            users,
            transactions,
            bets,
            bonuses,
            fraud_alerts,
            revenue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_period_parsing() {
        assert_eq!(TimePeriod::from_str("WEEK"), Some(TimePeriod::Week));
        assert_eq!(TimePeriod::from_str("year"), None);
        assert_eq!(TimePeriod::Day.bucket_format(), "%Y-%m-%d %H:00");
        assert_eq!(TimePeriod::Week.lookback(), Duration::days(84));
    }

    #[test]
    fn test_overview_revenue() {
        let bets = BetStats {
            total_wagered: dec!(300.00),
            total_payouts: dec!(120.50),
            ..Default::default()
        };
        let overview = AnalyticsOverview::new(
            UserCounts::default(),
            TransactionStats::default(),
            bets,
            BonusStats::default(),
            FraudStats::default(),
        );
        assert_eq!(overview.revenue.ggr, dec!(179.50));
    }

    #[test]
    fn test_cents_sql() {
        assert!(cents_sum("amount").starts_with("COALESCE(SUM(CAST(ROUND(CAST(amount AS REAL)"));
        assert_eq!(from_cents(12345), dec!(123.45));
    }
}
