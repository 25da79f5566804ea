//! Database lifecycle and session resolution

use anyhow::{anyhow, bail, Context, Result};
use pandaloto_business::{AccountService, NewUser, PlatformConfig, ServiceContext};
use pandaloto_core::{format_brl, RequestContext, User};
use pandaloto_persistence::{AnalyticsRepo, Database, UserRepo};
use std::path::Path;

/// First admin created by `pandaloto init`
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Open database plus the service context built on it
pub struct App {
    db: Database,
    pub ctx: ServiceContext,
}

impl App {
    /// Open the configured database, applying any pending migrations
    pub async fn open(config: &PlatformConfig) -> Result<Self> {
        let db = Database::init(
            &config.database.url,
            config.database.max_connections,
            config.database.busy_timeout(),
        )
        .await
        .with_context(|| format!("Failed to open {}", config.database.url))?;
        let ctx = ServiceContext::new(&db, config.clone());
        Ok(Self { db, ctx })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    pub async fn find_user(&self, username: &str) -> Result<User> {
        UserRepo::find_by_username(self.ctx.pool(), username)
            .await?
            .ok_or_else(|| anyhow!("User not found: {}", username))
    }

    /// Resolve `--as` into the acting user
    pub async fn session(&self, acting_as: Option<&str>) -> Result<(User, RequestContext)> {
        let Some(username) = acting_as else {
            bail!("This command needs an acting user: pass --as <USERNAME>");
        };
        let user = self.find_user(username).await?;
        let req = RequestContext::for_user(&user).with_user_agent("pandaloto-cli");
        Ok((user, req))
    }

    /// Target of a per-user command: `--user` when given, else the actor
    pub async fn target(&self, actor: &User, user: Option<&str>) -> Result<User> {
        match user {
            Some(username) => self.find_user(username).await,
            None => Ok(actor.clone()),
        }
    }
}

/// Strip the `sqlite:` scheme and query string to get the file path
fn database_file(url: &str) -> Option<&Path> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

/// Create the database, apply migrations and optionally add the first admin
pub async fn init(config: &PlatformConfig, force: bool, admin: Option<AdminBootstrap>) -> Result<()> {
    if force {
        if let Some(path) = database_file(&config.database.url).filter(|p| p.exists()) {
            std::fs::remove_file(path).context("Failed to remove existing database")?;
            println!("🗑️  Removed existing database");
        }
    }

    let db = Database::init(
        &config.database.url,
        config.database.max_connections,
        config.database.busy_timeout(),
    )
    .await
    .context("Failed to initialize database")?;
    println!("✅ Database ready: {}", config.database.url);

    if let Some(admin) = admin {
        let ctx = ServiceContext::new(&db, config.clone());
        let new_user = NewUser::new(&admin.username, &admin.email, &admin.password, &admin.full_name);
        let user = AccountService::new(&ctx).create_admin(None, new_user).await?;
        println!("👤 Admin created: {} ({})", user.username, user.id);
    }

    db.close().await;
    Ok(())
}

/// Print platform counters
pub async fn show_status(app: &App) -> Result<()> {
    let pool = app.ctx.pool();
    let users = AnalyticsRepo::user_counts(pool).await?;
    let stats = AnalyticsRepo::platform_stats(pool, app.ctx.now()).await?;
    let transactions = AnalyticsRepo::transaction_stats(pool).await?;

    println!("📊 Pandaloto Status");
    println!("   Database:       {}", app.ctx.config().database.url);
    println!();
    println!("   Users:          {} ({} active, {} admins)", users.total_users, users.active_users, users.admin_users);
    println!("   KYC approved:   {}", users.kyc_approved_users);
    println!("   KYC pending:    {}", stats.pending_kyc_count);
    println!("   Transactions:   {}", transactions.total_transactions);
    println!("   Open bets:      {}", stats.active_bets);
    println!("   Revenue today:  {}", format_brl(stats.today_revenue));

    Ok(())
}
