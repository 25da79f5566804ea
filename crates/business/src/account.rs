//! Account operations - registration, login, admin bootstrap
//!
//! Passwords are stored as argon2 PHC strings. Registration grants the
//! configured welcome bonus in the same transaction that creates the user.

use crate::bonus::grant_welcome;
use crate::error::{BusinessError, BusinessResult};
use crate::services::{require_admin, ServiceContext};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pandaloto_core::user::is_valid_cpf;
use pandaloto_core::{AuditAction, AuditLog, Bonus, EntityType, RequestContext, Role, User};
use pandaloto_persistence::{AuditLogRepo, UserRepo};
use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration input
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
}

impl NewUser {
    pub fn new(username: &str, email: &str, password: &str, full_name: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
            cpf: None,
            phone: None,
        }
    }

    pub fn with_cpf(mut self, cpf: &str) -> Self {
        self.cpf = Some(cpf.to_string());
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    /// Trim fields, keep CPF digits only, and check shapes
    fn validated(self) -> BusinessResult<Self> {
        let username = self.username.trim().to_string();
        if username.len() < 3
            || username.len() > 32
            || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(BusinessError::Validation(format!("invalid username: {}", username)));
        }

        let email = self.email.trim().to_ascii_lowercase();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(BusinessError::Validation(format!("invalid email: {}", email))),
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BusinessError::Validation(format!(
                "password must have at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(BusinessError::Validation("full name is required".to_string()));
        }

        let cpf = match self.cpf {
            Some(raw) => {
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                if !is_valid_cpf(&digits) {
                    return Err(BusinessError::Validation(format!("invalid CPF: {}", raw)));
                }
                Some(digits)
            }
            None => None,
        };

        Ok(Self {
            username,
            email,
            password: self.password,
            full_name,
            cpf,
            phone: self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        })
    }
}

/// Freshly registered user and the welcome bonus, if one was granted
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub welcome_bonus: Option<Bonus>,
}

#[derive(Serialize)]
struct Registered<'a> {
    username: &'a str,
    email: &'a str,
    welcome_bonus: bool,
}

#[derive(Serialize)]
struct LoggedIn<'a> {
    username: &'a str,
}

fn hash_password(password: &str) -> BusinessResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BusinessError::Validation(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Account Service - handles registration and authentication
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a player and grant the welcome bonus
    pub async fn register(&self, new_user: NewUser) -> BusinessResult<Registration> {
        let new_user = new_user.validated()?;
        self.ensure_available(&new_user).await?;

        let now = self.ctx.now();
        let user = User::new(self.ctx.next_id(), &new_user.username, &new_user.email, &new_user.full_name)
            .with_password_hash(hash_password(&new_user.password)?)
            .with_cpf(new_user.cpf)
            .with_phone(new_user.phone)
            .with_created_at(now);

        let mut tx = self.ctx.pool().begin().await?;
        UserRepo::insert(&mut *tx, &user).await?;

        let welcome = grant_welcome(&mut tx, self.ctx, &self.ctx.config().bonus, &user.id, now).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::UserRegistered, now)
            .by(&RequestContext::for_user(&user))
            .on(EntityType::User, &user.id)
            .with_details(&Registered {
                username: &user.username,
                email: &user.email,
                welcome_bonus: welcome.is_some(),
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %user.id, username = %user.username, "user registered");

        let user = UserRepo::get_by_id(self.ctx.pool(), &user.id).await?;
        Ok(Registration {
            user,
            welcome_bonus: welcome.map(|(bonus, _)| bonus),
        })
    }

    /// Check a username / password pair. Suspended accounts are refused.
    pub async fn authenticate(&self, username: &str, password: &str) -> BusinessResult<User> {
        let user = UserRepo::find_by_username(self.ctx.pool(), username.trim())
            .await?
            .filter(|u| verify_password(password, &u.password_hash))
            .ok_or_else(|| {
                tracing::warn!(username = %username, "login failed");
                BusinessError::InvalidCredentials
            })?;

        if !user.is_active {
            tracing::warn!(user = %user.id, "login refused: account suspended");
            return Err(BusinessError::AccountInactive(user.id));
        }

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::UserLogin, self.ctx.now())
            .by(&RequestContext::for_user(&user))
            .on(EntityType::User, &user.id)
            .with_details(&LoggedIn {
                username: &user.username,
            });
        AuditLogRepo::insert(self.ctx.pool(), &audit).await?;

        tracing::info!(user = %user.id, "user logged in");
        Ok(user)
    }

    /// Create an admin account.
    ///
    /// Without `req` this only works while no admin exists (bootstrap).
    /// Otherwise the caller must be an admin.
    pub async fn create_admin(&self, req: Option<&RequestContext>, new_user: NewUser) -> BusinessResult<User> {
        match req {
            Some(req) => require_admin(req)?,
            None => {
                if UserRepo::count_by_role(self.ctx.pool(), Role::Admin).await? > 0 {
                    return Err(BusinessError::forbidden("an admin already exists"));
                }
            }
        }

        let new_user = new_user.validated()?;
        self.ensure_available(&new_user).await?;

        let now = self.ctx.now();
        let admin = User::new(self.ctx.next_id(), &new_user.username, &new_user.email, &new_user.full_name)
            .with_password_hash(hash_password(&new_user.password)?)
            .with_role(Role::Admin)
            .with_cpf(new_user.cpf)
            .with_phone(new_user.phone)
            .with_created_at(now);

        let actor = match req {
            Some(req) => req.clone(),
            None => RequestContext::for_user(&admin),
        };

        let mut tx = self.ctx.pool().begin().await?;
        UserRepo::insert(&mut *tx, &admin).await?;
        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::AdminCreated, now)
            .by(&actor)
            .on(EntityType::User, &admin.id)
            .with_details(&Registered {
                username: &admin.username,
                email: &admin.email,
                welcome_bonus: false,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %admin.id, username = %admin.username, "admin created");
        Ok(admin)
    }

    async fn ensure_available(&self, new_user: &NewUser) -> BusinessResult<()> {
        if UserRepo::find_by_username(self.ctx.pool(), &new_user.username)
            .await?
            .is_some()
        {
            return Err(BusinessError::UsernameTaken(new_user.username.clone()));
        }
        if UserRepo::find_by_email(self.ctx.pool(), &new_user.email)
            .await?
            .is_some()
        {
            return Err(BusinessError::EmailTaken(new_user.email.clone()));
        }
        Ok(())
    }
}
