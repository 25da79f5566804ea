//! User commands: registration, login and administration

use anyhow::Result;
use pandaloto_business::{AccountService, AdminService, NewUser};
use pandaloto_core::{format_brl, User};

use crate::db::App;
use crate::UserAction;

pub async fn handle(app: &App, actor: Option<&str>, action: UserAction) -> Result<()> {
    match action {
        UserAction::Register {
            username,
            email,
            password,
            full_name,
            cpf,
            phone,
        } => {
            let mut new_user = NewUser::new(&username, &email, &password, &full_name);
            if let Some(cpf) = &cpf {
                new_user = new_user.with_cpf(cpf);
            }
            if let Some(phone) = &phone {
                new_user = new_user.with_phone(phone);
            }

            let registration = AccountService::new(&app.ctx).register(new_user).await?;
            println!("✅ User registered!");
            print_user(&registration.user);
            if let Some(bonus) = registration.welcome_bonus {
                println!(
                    "   🎁 Welcome bonus: {} (wager {} to unlock)",
                    format_brl(bonus.amount),
                    format_brl(bonus.wager_requirement)
                );
            }
        }

        UserAction::Login { username, password } => {
            let user = AccountService::new(&app.ctx).authenticate(&username, &password).await?;
            println!("✅ Welcome back, {}!", user.full_name);
            println!("   Balance: {}", format_brl(user.balance));
        }

        UserAction::Show { username } => {
            let (me, req) = app.session(actor).await?;
            let user = app.target(&me, username.as_deref()).await?;
            if !req.can_act_on(&user.id) {
                anyhow::bail!("You may only view your own account");
            }
            print_user(&user);
        }

        UserAction::List => {
            let (_, req) = app.session(actor).await?;
            let users = AdminService::new(&app.ctx).list_users(&req).await?;

            println!("👥 Users ({})", users.len());
            println!(
                "{:<20} {:<28} {:<6} {:>14} {:<13} {:<9}",
                "USERNAME", "EMAIL", "ROLE", "BALANCE", "KYC", "STATUS"
            );
            for user in users {
                println!(
                    "{:<20} {:<28} {:<6} {:>14} {:<13} {:<9}",
                    user.username,
                    user.email,
                    user.role,
                    format_brl(user.balance),
                    user.kyc_status,
                    if user.is_active { "active" } else { "suspended" }
                );
            }
        }

        UserAction::CreateAdmin {
            username,
            email,
            password,
            full_name,
        } => {
            let (_, req) = app.session(actor).await?;
            let new_user = NewUser::new(&username, &email, &password, &full_name);
            let user = AccountService::new(&app.ctx).create_admin(Some(&req), new_user).await?;
            println!("✅ Admin created: {} ({})", user.username, user.id);
        }

        UserAction::Suspend { username } => {
            let (_, req) = app.session(actor).await?;
            let target = app.find_user(&username).await?;
            let user = AdminService::new(&app.ctx).suspend_user(&req, &target.id).await?;
            println!("⛔ User suspended: {}", user.username);
        }

        UserAction::Activate { username } => {
            let (_, req) = app.session(actor).await?;
            let target = app.find_user(&username).await?;
            let user = AdminService::new(&app.ctx).activate_user(&req, &target.id).await?;
            println!("✅ User activated: {}", user.username);
        }

        UserAction::Delete { username } => {
            let (_, req) = app.session(actor).await?;
            let target = app.find_user(&username).await?;
            AdminService::new(&app.ctx).delete_user(&req, &target.id).await?;
            println!("🗑️  User deleted: {}", target.username);
        }
    }

    Ok(())
}

fn print_user(user: &User) {
    println!("   ID:        {}", user.id);
    println!("   Username:  {}", user.username);
    println!("   Name:      {}", user.full_name);
    println!("   Email:     {}", user.email);
    if let Some(cpf) = &user.cpf {
        println!("   CPF:       {}", cpf);
    }
    println!("   Role:      {}", user.role);
    println!("   Balance:   {}", format_brl(user.balance));
    println!("   KYC:       {}", user.kyc_status);
    println!("   Active:    {}", user.is_active);
}
