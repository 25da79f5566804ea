//! Pandaloto CLI - operator console for the casino core
//!
//! Usage:
//! ```bash
//! pandaloto init --admin admin --admin-email admin@pandaloto.com --admin-password segredo
//! pandaloto user register maria maria@example.com segredo123 "Maria Silva"
//! pandaloto --as maria wallet deposit 100 --method pix
//! pandaloto --as maria wallet bet lottery 10 --numbers 4,8,15,16,23
//! pandaloto --as maria kyc upload id-front https://files.example.com/rg.jpg
//! pandaloto --as admin kyc review <document-id> --approve
//! pandaloto --as admin fraud list --status pending
//! pandaloto --as admin report fraud --format markdown --output fraude.md
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pandaloto_business::{BusinessError, PlatformConfig};
use pandaloto_core::money::parse_amount;
use pandaloto_core::{
    AlertStatus, BonusType, DocumentType, GameType, PaymentMethod, TransactionStatus,
};
use pandaloto_persistence::TimePeriod;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{account, audit, kyc, promo, report, wallet};

/// Pandaloto - wallet, KYC, bonus and fraud operations on SQLite
#[derive(Parser)]
#[command(name = "pandaloto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database URL, overrides the config file (e.g. sqlite:data/pandaloto.db)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// TOML configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user
    #[arg(long = "as", value_name = "USERNAME", global = true)]
    pub acting_as: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create and migrate the database, optionally bootstrapping an admin
    Init {
        /// Delete the database file first
        #[arg(long)]
        force: bool,
        /// Username of the first admin
        #[arg(long, requires_all = ["admin_email", "admin_password"])]
        admin: Option<String>,
        #[arg(long)]
        admin_email: Option<String>,
        #[arg(long)]
        admin_password: Option<String>,
        #[arg(long, default_value = "Administrador")]
        admin_name: String,
    },

    /// Show platform counters
    Status,

    /// Registration, login and user administration
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Deposits, withdrawals and bets
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Identity documents
    Kyc {
        #[command(subcommand)]
        action: KycAction,
    },

    /// Promo codes and promotions
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },

    /// Fraud alerts and the audit trail (admin)
    Fraud {
        #[command(subcommand)]
        action: FraudAction,
    },

    /// Export reports (admin)
    Report {
        /// Report to generate
        kind: ReportKind,
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
        /// Output file; prints to stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Bucket size for the time series
        #[arg(long, default_value = "week")]
        period: PeriodArg,
        /// Row limit for top users and statements
        #[arg(long)]
        limit: Option<i64>,
        /// Player for the statement (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a player
    Register {
        username: String,
        email: String,
        password: String,
        full_name: String,
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Check credentials
    Login { username: String, password: String },
    /// Show a user (defaults to the acting user)
    Show { username: Option<String> },
    /// List users (admin)
    List,
    /// Create another admin (admin)
    CreateAdmin {
        username: String,
        email: String,
        password: String,
        full_name: String,
    },
    /// Suspend a user (admin)
    Suspend { username: String },
    /// Reactivate a user (admin)
    Activate { username: String },
    /// Delete a player and their data (admin)
    Delete { username: String },
}

#[derive(Subcommand)]
pub enum WalletAction {
    /// Simulated deposit
    Deposit {
        #[arg(value_parser = parse_amount)]
        amount: Decimal,
        #[arg(long, default_value = "pix")]
        method: PaymentMethodArg,
        /// Target player (admin only, defaults to the acting user)
        #[arg(long)]
        user: Option<String>,
    },
    /// Request a withdrawal via PIX
    Withdraw {
        #[arg(value_parser = parse_amount)]
        amount: Decimal,
        #[arg(long)]
        user: Option<String>,
    },
    /// Place a bet
    Bet {
        game: GameTypeArg,
        #[arg(value_parser = parse_amount)]
        amount: Decimal,
        #[arg(long)]
        game_id: Option<String>,
        /// Lottery numbers (comma-separated)
        #[arg(long, value_delimiter = ',')]
        numbers: Option<Vec<u8>>,
        /// Jogo do Bicho animal
        #[arg(long)]
        animal: Option<String>,
        /// Jogo do Bicho modality
        #[arg(long, default_value = "grupo")]
        modality: String,
        /// Casino table
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Balance and bet totals
    Balance {
        #[arg(long)]
        user: Option<String>,
    },
    /// Latest ledger entries
    History {
        #[arg(long, default_value_t = pandaloto_business::DEFAULT_HISTORY_LIMIT)]
        limit: i64,
        #[arg(long)]
        user: Option<String>,
    },
    /// Latest bets
    Bets {
        #[arg(long, default_value_t = pandaloto_business::DEFAULT_HISTORY_LIMIT)]
        limit: i64,
        #[arg(long)]
        user: Option<String>,
    },
    /// Withdrawals waiting for processing (admin)
    Pending,
    /// Move a withdrawal to a new status (admin)
    Process {
        transaction_id: String,
        status: WithdrawalStatusArg,
    },
}

#[derive(Subcommand)]
pub enum KycAction {
    /// Submit a document URL
    Upload {
        document_type: DocumentTypeArg,
        file_url: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Documents on file and what is missing
    Status {
        #[arg(long)]
        user: Option<String>,
    },
    /// Review queue (admin)
    Pending,
    /// Approve or reject a document (admin)
    Review {
        document_id: String,
        #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
        approve: bool,
        #[arg(long)]
        reject: bool,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PromoAction {
    /// Redeem a promo code
    Apply {
        code: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Publish a promotion (admin)
    Create {
        #[arg(long)]
        code: String,
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
        /// Amount to wager before the bonus can be withdrawn
        #[arg(long, default_value = "0")]
        wager: Decimal,
        #[arg(long, default_value = "promotion")]
        bonus_type: BonusTypeArg,
        #[arg(long)]
        description: String,
        /// Days until the code expires
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// Bonuses of a player with wagering progress
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Every bonus and template (admin)
    All,
}

#[derive(Subcommand)]
pub enum FraudAction {
    /// List alerts
    List {
        #[arg(long)]
        status: Option<AlertStatusArg>,
    },
    /// Review an alert
    Review {
        alert_id: String,
        status: AlertStatusArg,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Latest audit log entries
    Audit {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

// ============================================================================
// Argument enums
// ============================================================================

#[derive(Clone, Copy, ValueEnum)]
pub enum PaymentMethodArg {
    Pix,
    CreditCard,
    DebitCard,
    Crypto,
}

impl PaymentMethodArg {
    pub fn to_core(self) -> PaymentMethod {
        match self {
            PaymentMethodArg::Pix => PaymentMethod::Pix,
            PaymentMethodArg::CreditCard => PaymentMethod::CreditCard,
            PaymentMethodArg::DebitCard => PaymentMethod::DebitCard,
            PaymentMethodArg::Crypto => PaymentMethod::Crypto,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GameTypeArg {
    Casino,
    Lottery,
    JogoBicho,
}

impl GameTypeArg {
    pub fn to_core(self) -> GameType {
        match self {
            GameTypeArg::Casino => GameType::Casino,
            GameTypeArg::Lottery => GameType::Lottery,
            GameTypeArg::JogoBicho => GameType::JogoBicho,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DocumentTypeArg {
    IdFront,
    IdBack,
    ProofAddress,
    Selfie,
}

impl DocumentTypeArg {
    pub fn to_core(self) -> DocumentType {
        match self {
            DocumentTypeArg::IdFront => DocumentType::IdFront,
            DocumentTypeArg::IdBack => DocumentType::IdBack,
            DocumentTypeArg::ProofAddress => DocumentType::ProofAddress,
            DocumentTypeArg::Selfie => DocumentType::Selfie,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AlertStatusArg {
    Pending,
    Investigating,
    Resolved,
    FalsePositive,
}

impl AlertStatusArg {
    pub fn to_core(self) -> AlertStatus {
        match self {
            AlertStatusArg::Pending => AlertStatus::Pending,
            AlertStatusArg::Investigating => AlertStatus::Investigating,
            AlertStatusArg::Resolved => AlertStatus::Resolved,
            AlertStatusArg::FalsePositive => AlertStatus::FalsePositive,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum WithdrawalStatusArg {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl WithdrawalStatusArg {
    pub fn to_core(self) -> TransactionStatus {
        match self {
            WithdrawalStatusArg::Processing => TransactionStatus::Processing,
            WithdrawalStatusArg::Completed => TransactionStatus::Completed,
            WithdrawalStatusArg::Failed => TransactionStatus::Failed,
            WithdrawalStatusArg::Cancelled => TransactionStatus::Cancelled,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BonusTypeArg {
    Promotion,
    DepositMatch,
    Cashback,
}

impl BonusTypeArg {
    pub fn to_core(self) -> BonusType {
        match self {
            BonusTypeArg::Promotion => BonusType::Promotion,
            BonusTypeArg::DepositMatch => BonusType::DepositMatch,
            BonusTypeArg::Cashback => BonusType::Cashback,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Month,
}

impl PeriodArg {
    pub fn to_core(self) -> TimePeriod {
        match self {
            PeriodArg::Day => TimePeriod::Day,
            PeriodArg::Week => TimePeriod::Week,
            PeriodArg::Month => TimePeriod::Month,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Markdown,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportKind {
    Overview,
    TopUsers,
    TimeSeries,
    Statement,
    Fraud,
    UserRisk,
}

fn init_tracing(config: &PlatformConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PlatformConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = &cli.db {
        config = config.with_database_url(url);
    }
    init_tracing(&config);
    tracing::debug!(db = %config.database.url, "configuration loaded");

    let result = run(cli, config).await;
    if let Err(err) = &result {
        if let Some(business) = err.downcast_ref::<BusinessError>() {
            eprintln!("❌ {}", business.user_message());
        }
    }
    result
}

async fn run(cli: Cli, config: PlatformConfig) -> Result<()> {
    let actor = cli.acting_as.as_deref();

    match cli.command {
        Commands::Init {
            force,
            admin,
            admin_email,
            admin_password,
            admin_name,
        } => {
            let bootstrap = match (admin, admin_email, admin_password) {
                (Some(username), Some(email), Some(password)) => {
                    Some(db::AdminBootstrap {
                        username,
                        email,
                        password,
                        full_name: admin_name,
                    })
                }
                _ => None,
            };
            db::init(&config, force, bootstrap).await?;
        }

        Commands::Status => {
            let app = db::App::open(&config).await?;
            db::show_status(&app).await?;
            app.close().await;
        }

        Commands::User { action } => {
            let app = db::App::open(&config).await?;
            account::handle(&app, actor, action).await?;
            app.close().await;
        }

        Commands::Wallet { action } => {
            let app = db::App::open(&config).await?;
            wallet::handle(&app, actor, action).await?;
            app.close().await;
        }

        Commands::Kyc { action } => {
            let app = db::App::open(&config).await?;
            kyc::handle(&app, actor, action).await?;
            app.close().await;
        }

        Commands::Promo { action } => {
            let app = db::App::open(&config).await?;
            promo::handle(&app, actor, action).await?;
            app.close().await;
        }

        Commands::Fraud { action } => {
            let app = db::App::open(&config).await?;
            audit::handle(&app, actor, action).await?;
            app.close().await;
        }

        Commands::Report {
            kind,
            format,
            output,
            period,
            limit,
            user,
        } => {
            let app = db::App::open(&config).await?;
            let request = report::ReportRequest {
                kind,
                format,
                output,
                period: period.to_core(),
                limit,
                user,
            };
            report::generate(&app, actor, request).await?;
            app.close().await;
        }
    }

    Ok(())
}
