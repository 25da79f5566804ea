//! Integration tests for Pandaloto business services
//!
//! Each test runs against a fresh SQLite file with a manual clock, so
//! fraud windows can be crossed deterministically.

use chrono::{DateTime, Duration, Utc};
use pandaloto_business::{
    AccountService, AdminService, BetRequest, BonusService, BusinessError, Clock, KycService,
    ManualClock, NewUser, PlatformConfig, ServiceContext, WalletService,
};
use pandaloto_core::ledger::verify_continuity;
use pandaloto_core::{
    AlertDetails, AlertStatus, AlertType, AuditAction, BonusType, DocumentType, GameType,
    KycStatus, PaymentMethod, PromotionDraft, RequestContext, Severity, TransactionStatus,
    TransactionType, User, MAX_AMOUNT,
};
use pandaloto_persistence::{
    AuditLogRepo, Database, FraudAlertRepo, TimePeriod, TransactionRepo, UserRepo,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    ctx: ServiceContext,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    "2026-03-01T12:00:00Z".parse().unwrap()
}

fn no_welcome() -> PlatformConfig {
    let mut config = PlatformConfig::default();
    config.bonus.welcome_amount = Decimal::ZERO;
    config
}

async fn setup(config: PlatformConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("pandaloto.db").display());
    let db = Database::init(&url, 5, std::time::Duration::from_secs(5))
        .await
        .unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let ctx = ServiceContext::new(&db, config).with_clock(clock.clone());
    Harness {
        _dir: dir,
        ctx,
        clock,
    }
}

async fn register(h: &Harness, username: &str) -> (User, RequestContext) {
    let registration = AccountService::new(&h.ctx)
        .register(NewUser::new(
            username,
            &format!("{}@example.com", username),
            "segredo123",
            "Jogador Teste",
        ))
        .await
        .unwrap();
    let req = RequestContext::for_user(&registration.user);
    (registration.user, req)
}

async fn bootstrap_admin(h: &Harness) -> RequestContext {
    let admin = AccountService::new(&h.ctx)
        .create_admin(
            None,
            NewUser::new("admin", "admin@pandaloto.com", "admin123", "Administrador"),
        )
        .await
        .unwrap();
    RequestContext::for_user(&admin)
}

async fn approve_kyc(h: &Harness, user: &User, req: &RequestContext, admin: &RequestContext) {
    let kyc = KycService::new(&h.ctx);
    for document_type in DocumentType::REQUIRED {
        kyc.upload_document(
            req,
            &user.id,
            document_type,
            &format!("https://files.pandaloto.com/{}/{}.jpg", user.id, document_type),
        )
        .await
        .unwrap();
    }
    for document in kyc.documents(req, &user.id).await.unwrap() {
        kyc.review_document(admin, &document.id, true, None).await.unwrap();
    }
}

async fn assert_ledger_consistent(h: &Harness, user_id: &str) {
    let balance = UserRepo::get_balance(h.ctx.pool(), user_id).await.unwrap();
    let sum = TransactionRepo::sum_by_user(h.ctx.pool(), user_id).await.unwrap();
    assert_eq!(balance, sum, "balance must equal the sum of ledger amounts");

    let history = TransactionRepo::history(h.ctx.pool(), user_id).await.unwrap();
    verify_continuity(&history).unwrap();
    if let Some(last) = history.last() {
        assert_eq!(last.balance_after, balance);
    }
}

/// Test: register -> welcome bonus -> deposit -> bet -> ledger checks
#[tokio::test]
async fn test_registration_and_wallet_flow() {
    let h = setup(PlatformConfig::default()).await;
    let (user, req) = register(&h, "maria").await;

    // 1. Welcome bonus credited on registration
    assert_eq!(user.balance, dec!(50.00));
    assert_eq!(user.kyc_status, KycStatus::Pending);

    // 2. Deposit
    let wallet = WalletService::new(&h.ctx);
    let result = wallet
        .deposit(&req, &user.id, dec!(200), PaymentMethod::Pix)
        .await
        .unwrap();
    assert_eq!(result.new_balance, dec!(250.00));
    assert_eq!(result.transaction.status, TransactionStatus::Completed);
    assert_eq!(result.transaction.balance_before, dec!(50.00));

    // 3. Bet
    let bet = wallet
        .place_bet(&req, &user.id, BetRequest::new(GameType::Lottery, dec!(30)))
        .await
        .unwrap();
    assert_eq!(bet.new_balance, dec!(220.00));
    assert_eq!(bet.bet.potential_win, dec!(60.00));
    assert_eq!(bet.transaction.tx_type, TransactionType::BetStake);
    assert_eq!(bet.transaction.amount, dec!(-30.00));

    let stats = wallet.user_stats(&req, &user.id).await.unwrap();
    assert_eq!(stats.balance, dec!(220.00));
    assert_eq!(stats.total_wagered, dec!(30.00));

    assert_ledger_consistent(&h, &user.id).await;

    // 4. Login and audit trail
    let logged_in = AccountService::new(&h.ctx)
        .authenticate("maria", "segredo123")
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let actions: Vec<AuditAction> = AuditLogRepo::list_by_user(h.ctx.pool(), &user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|log| log.action)
        .collect();
    assert!(actions.contains(&AuditAction::UserRegistered));
    assert!(actions.contains(&AuditAction::DepositCompleted));
    assert!(actions.contains(&AuditAction::BetPlaced));
    assert!(actions.contains(&AuditAction::UserLogin));
}

#[tokio::test]
async fn test_authentication_failures() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, _) = register(&h, "joao").await;
    let accounts = AccountService::new(&h.ctx);

    let err = accounts.authenticate("joao", "errada").await.unwrap_err();
    assert!(matches!(err, BusinessError::InvalidCredentials));

    let err = accounts.authenticate("ninguem", "segredo123").await.unwrap_err();
    assert!(matches!(err, BusinessError::InvalidCredentials));

    AdminService::new(&h.ctx).suspend_user(&admin, &user.id).await.unwrap();
    let err = accounts.authenticate("joao", "segredo123").await.unwrap_err();
    assert!(matches!(err, BusinessError::AccountInactive(_)));

    let err = accounts
        .register(NewUser::new("joao", "outro@example.com", "segredo123", "Outro"))
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::UsernameTaken(_)));

    // a second bootstrap is refused
    let err = accounts
        .create_admin(None, NewUser::new("root2", "root2@example.com", "segredo123", "Root"))
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::Forbidden(_)));
}

#[tokio::test]
async fn test_insufficient_funds_leaves_state_unchanged() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "ana").await;
    approve_kyc(&h, &user, &req, &admin).await;

    let wallet = WalletService::new(&h.ctx);
    wallet
        .deposit(&req, &user.id, dec!(100), PaymentMethod::Pix)
        .await
        .unwrap();

    let err = wallet.withdraw(&req, &user.id, dec!(150)).await.unwrap_err();
    match err {
        BusinessError::InsufficientFunds {
            required,
            available,
        } => {
            assert_eq!(required, dec!(150.00));
            assert_eq!(available, dec!(100.00));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = wallet
        .place_bet(&req, &user.id, BetRequest::new(GameType::Casino, dec!(100.01)))
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::InsufficientFunds { .. }));

    let err = wallet
        .deposit(&req, &user.id, dec!(0), PaymentMethod::Pix)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::InvalidAmount(_)));

    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(100.00));
    assert_eq!(TransactionRepo::history(h.ctx.pool(), &user.id).await.unwrap().len(), 1);
    assert_ledger_consistent(&h, &user.id).await;
}

#[tokio::test]
async fn test_withdrawal_requires_kyc() {
    let h = setup(no_welcome()).await;
    let (user, req) = register(&h, "carlos").await;
    let wallet = WalletService::new(&h.ctx);

    wallet
        .deposit(&req, &user.id, dec!(1000), PaymentMethod::CreditCard)
        .await
        .unwrap();

    let err = wallet.withdraw(&req, &user.id, dec!(100)).await.unwrap_err();
    assert!(matches!(
        err,
        BusinessError::KycRequired {
            status: KycStatus::Pending
        }
    ));
    assert_eq!(err.status_code(), 403);
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(1000.00));
}

#[tokio::test]
async fn test_kyc_aggregation() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "beatriz").await;
    let kyc = KycService::new(&h.ctx);

    // 1. Three of four documents: still pending
    for document_type in [DocumentType::IdFront, DocumentType::IdBack, DocumentType::ProofAddress] {
        kyc.upload_document(&req, &user.id, document_type, "https://files.pandaloto.com/doc.jpg")
            .await
            .unwrap();
    }
    let status = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap().kyc_status;
    assert_eq!(status, KycStatus::Pending);
    assert_eq!(
        kyc.missing_documents(&req, &user.id).await.unwrap(),
        vec![DocumentType::Selfie]
    );

    // 2. Fourth document: under review
    kyc.upload_document(&req, &user.id, DocumentType::Selfie, "https://files.pandaloto.com/selfie.jpg")
        .await
        .unwrap();
    let status = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap().kyc_status;
    assert_eq!(status, KycStatus::UnderReview);
    assert_eq!(kyc.pending_documents(&admin).await.unwrap().len(), 4);

    // 3. Three approvals: still under review
    let documents = kyc.documents(&req, &user.id).await.unwrap();
    for document in &documents[..3] {
        kyc.review_document(&admin, &document.id, true, None).await.unwrap();
    }
    let status = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap().kyc_status;
    assert_eq!(status, KycStatus::UnderReview);

    // 4. Rejecting the fourth: rejected, with the default reason
    let rejected = kyc
        .review_document(&admin, &documents[3].id, false, None)
        .await
        .unwrap();
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Documento ilegível ou inválido")
    );
    let status = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap().kyc_status;
    assert_eq!(status, KycStatus::Rejected);

    // 5. Approving it on a second look brings the user to approved
    kyc.review_document(&admin, &documents[3].id, true, None)
        .await
        .unwrap();
    let status = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap().kyc_status;
    assert_eq!(status, KycStatus::Approved);

    // players cannot review
    let err = kyc
        .review_document(&req, &documents[0].id, true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::Forbidden(_)));

    let err = kyc
        .upload_document(&req, &user.id, DocumentType::Selfie, "ftp://nope")
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::Validation(_)));
}

#[tokio::test]
async fn test_single_approved_document_does_not_unlock_withdrawals() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "joana").await;
    let kyc = KycService::new(&h.ctx);

    let document = kyc
        .upload_document(&req, &user.id, DocumentType::IdFront, "https://files.pandaloto.com/front.jpg")
        .await
        .unwrap();
    let reviewed = kyc
        .review_document(&admin, &document.id, true, None)
        .await
        .unwrap();
    assert_eq!(reviewed.status, KycStatus::Approved);

    let status = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap().kyc_status;
    assert_eq!(status, KycStatus::Pending);

    let wallet = WalletService::new(&h.ctx);
    wallet
        .deposit(&req, &user.id, dec!(100), PaymentMethod::Pix)
        .await
        .unwrap();
    let err = wallet.withdraw(&req, &user.id, dec!(50)).await.unwrap_err();
    assert!(matches!(
        err,
        BusinessError::KycRequired {
            status: KycStatus::Pending
        }
    ));
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(100.00));
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected_without_panicking() {
    let h = setup(no_welcome()).await;
    let (user, req) = register(&h, "bruno").await;
    let wallet = WalletService::new(&h.ctx);

    // 1. Beyond the per-transaction maximum
    for _ in 0..2 {
        let err = wallet
            .deposit(&req, &user.id, dec!(50000000000000000000000000000), PaymentMethod::Pix)
            .await
            .unwrap_err();
        assert!(matches!(err, BusinessError::InvalidAmount(_)));
    }
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(0.00));
    assert!(TransactionRepo::history(h.ctx.pool(), &user.id).await.unwrap().is_empty());

    // 2. A balance that cannot absorb another credit
    let huge = Decimal::MAX;
    UserRepo::update_balance(h.ctx.pool(), &user.id, huge, h.clock.now())
        .await
        .unwrap();
    let err = wallet
        .deposit(&req, &user.id, MAX_AMOUNT, PaymentMethod::Pix)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::InvalidAmount(_)));
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), huge);
    assert!(TransactionRepo::history(h.ctx.pool(), &user.id).await.unwrap().is_empty());
}

/// Test: concurrent stakes on one balance serialize on the user row lock
#[tokio::test]
async fn test_concurrent_bets_never_overdraw() {
    let mut config = no_welcome();
    config.fraud.velocity_max_transactions = 100;
    let h = setup(config.clone()).await;
    let (user, req) = register(&h, "paulo").await;

    WalletService::new(&h.ctx)
        .deposit(&req, &user.id, dec!(100), PaymentMethod::Pix)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = ServiceContext::from_parts(h.ctx.pool().clone(), config.clone())
            .with_clock(h.clock.clone());
        let req = req.clone();
        let user_id = user.id.clone();
        handles.push(tokio::spawn(async move {
            WalletService::new(&ctx)
                .place_bet(&req, &user_id, BetRequest::new(GameType::Casino, dec!(30)))
                .await
        }));
    }

    let mut placed = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => {
                assert!(result.new_balance >= Decimal::ZERO);
                placed += 1;
            }
            Err(BusinessError::InsufficientFunds { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(placed, 3);
    assert_eq!(refused, 5);

    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(10.00));
    let history = TransactionRepo::history(h.ctx.pool(), &user.id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|entry| entry.balance_after >= Decimal::ZERO));
    assert_ledger_consistent(&h, &user.id).await;
}

#[tokio::test]
async fn test_rapid_deposits_then_velocity_block() {
    let h = setup(no_welcome()).await;
    let (user, req) = register(&h, "rafael").await;
    let wallet = WalletService::new(&h.ctx);

    // 1. Four deposits: nothing yet
    for _ in 0..4 {
        let result = wallet
            .deposit(&req, &user.id, dec!(10), PaymentMethod::Pix)
            .await
            .unwrap();
        assert!(result.alerts.is_empty());
    }

    // 2. Fifth deposit raises rapid_deposits
    let result = wallet
        .deposit(&req, &user.id, dec!(10), PaymentMethod::Pix)
        .await
        .unwrap();
    assert_eq!(result.alerts.len(), 1);
    let alert = &result.alerts[0];
    assert_eq!(alert.alert_type, AlertType::RapidDeposits);
    assert_eq!(alert.severity, Severity::High);
    assert!(matches!(
        alert.details,
        AlertDetails::RapidDeposits { count: 5, total_amount, .. } if total_amount == dec!(50.00)
    ));

    // 3. Sixth deposit inside the minute is refused before any mutation
    let err = wallet
        .deposit(&req, &user.id, dec!(10), PaymentMethod::Pix)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::TooManyRequests { count: 6 }));
    assert_eq!(err.status_code(), 429);

    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(50.00));
    assert_eq!(TransactionRepo::history(h.ctx.pool(), &user.id).await.unwrap().len(), 5);

    let alerts = FraudAlertRepo::list_by_user(h.ctx.pool(), &user.id).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts
        .iter()
        .any(|a| a.alert_type == AlertType::TransactionVelocity
            && matches!(a.details, AlertDetails::Velocity { count: 6, .. })));

    // 4. After the window the next deposit goes through
    h.clock.advance(Duration::seconds(61));
    wallet
        .deposit(&req, &user.id, dec!(10), PaymentMethod::Pix)
        .await
        .unwrap();
    assert_ledger_consistent(&h, &user.id).await;
}

#[tokio::test]
async fn test_rapid_deposits_alert_on_every_deposit_past_threshold() {
    let mut config = no_welcome();
    config.fraud.velocity_max_transactions = 100;
    let h = setup(config).await;
    let (user, req) = register(&h, "lucas").await;
    let wallet = WalletService::new(&h.ctx);

    for _ in 0..6 {
        wallet
            .deposit(&req, &user.id, dec!(20), PaymentMethod::DebitCard)
            .await
            .unwrap();
    }

    let counts: Vec<usize> = FraudAlertRepo::list_by_user(h.ctx.pool(), &user.id)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|a| match a.details {
            AlertDetails::RapidDeposits { count, .. } => Some(count),
            _ => None,
        })
        .collect();
    let mut counts = counts;
    counts.sort_unstable();
    assert_eq!(counts, vec![5, 6]);
}

#[tokio::test]
async fn test_round_trip_alert() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "pedro").await;
    approve_kyc(&h, &user, &req, &admin).await;
    let wallet = WalletService::new(&h.ctx);

    wallet
        .deposit(&req, &user.id, dec!(500), PaymentMethod::Pix)
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(10));

    let result = wallet.withdraw(&req, &user.id, dec!(500)).await.unwrap();
    assert_eq!(result.transaction.status, TransactionStatus::Pending);
    assert_eq!(result.new_balance, dec!(0.00));

    let round_trip = result
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::RoundTripTransaction)
        .expect("round trip alert");
    assert_eq!(round_trip.severity, Severity::Critical);
    match &round_trip.details {
        AlertDetails::RoundTrip {
            deposit_amount,
            withdraw_amount,
            time_diff_minutes,
        } => {
            assert_eq!(*deposit_amount, dec!(500.00));
            assert_eq!(*withdraw_amount, dec!(500.00));
            assert_eq!(*time_diff_minutes, 10);
        }
        other => panic!("unexpected details: {other:?}"),
    }

    // admin review
    let admin_service = AdminService::new(&h.ctx);
    let reviewed = admin_service
        .review_fraud_alert(&admin, &round_trip.id, AlertStatus::Investigating, Some("verificar".into()))
        .await
        .unwrap();
    assert_eq!(reviewed.status, AlertStatus::Investigating);
    assert_eq!(reviewed.reviewed_by.as_deref(), Some(admin.actor_id.as_str()));

    let open = admin_service
        .list_fraud_alerts(&admin, Some(AlertStatus::Investigating))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);

    // close, then reopen
    admin_service
        .review_fraud_alert(&admin, &round_trip.id, AlertStatus::FalsePositive, None)
        .await
        .unwrap();
    let reopened = admin_service
        .review_fraud_alert(&admin, &round_trip.id, AlertStatus::Pending, Some("reabrir".into()))
        .await
        .unwrap();
    assert_eq!(reopened.status, AlertStatus::Pending);
    assert_eq!(reopened.notes.as_deref(), Some("reabrir"));

    let stored = FraudAlertRepo::get_by_id(h.ctx.pool(), &round_trip.id).await.unwrap();
    assert_eq!(stored.status, AlertStatus::Pending);
    let pending = admin_service
        .list_fraud_alerts(&admin, Some(AlertStatus::Pending))
        .await
        .unwrap();
    assert!(pending.iter().any(|alert| alert.id == round_trip.id));
}

#[tokio::test]
async fn test_promo_code_single_use_per_user() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (alice, alice_req) = register(&h, "alice").await;
    let (bruno, bruno_req) = register(&h, "bruno").await;
    let bonuses = BonusService::new(&h.ctx);

    bonuses
        .create_promotion(
            &admin,
            PromotionDraft {
                bonus_type: BonusType::Promotion,
                amount: dec!(25),
                wager_requirement: dec!(50),
                code: Some("panda25".to_string()),
                description: "Promo de carnaval".to_string(),
                expires_at: None,
            },
        )
        .await
        .unwrap();

    // 1. Alice redeems in lower case
    let bonus = bonuses.apply_promo_code(&alice_req, &alice.id, "panda25").await.unwrap();
    assert_eq!(bonus.code.as_deref(), Some("PANDA25"));
    assert_eq!(bonus.user_id, alice.id);
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &alice.id).await.unwrap(), dec!(25.00));

    // 2. A second redemption is refused and changes nothing
    let err = bonuses
        .apply_promo_code(&alice_req, &alice.id, "PANDA25")
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::PromoCodeAlreadyUsed(_)));
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &alice.id).await.unwrap(), dec!(25.00));

    // 3. Bruno can still use it
    bonuses.apply_promo_code(&bruno_req, &bruno.id, "PANDA25").await.unwrap();
    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &bruno.id).await.unwrap(), dec!(25.00));

    let err = bonuses
        .apply_promo_code(&bruno_req, &bruno.id, "NAOEXISTE")
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::PromoCodeNotFound(_)));

    let progress = bonuses.progress(&alice_req, &bonus.id).await.unwrap();
    assert_eq!(progress.progress, dec!(0.00));
    assert_ledger_consistent(&h, &alice.id).await;
}

#[tokio::test]
async fn test_expired_promotion_is_not_claimable() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "clara").await;
    let bonuses = BonusService::new(&h.ctx);

    bonuses
        .create_promotion(
            &admin,
            PromotionDraft {
                bonus_type: BonusType::Cashback,
                amount: dec!(10),
                wager_requirement: dec!(0),
                code: Some("RAPIDO".to_string()),
                description: "Cashback relâmpago".to_string(),
                expires_at: Some(start() + Duration::hours(1)),
            },
        )
        .await
        .unwrap();

    h.clock.advance(Duration::hours(2));
    let err = bonuses.apply_promo_code(&req, &user.id, "RAPIDO").await.unwrap_err();
    assert!(matches!(err, BusinessError::PromoCodeNotFound(_)));
}

#[tokio::test]
async fn test_withdrawal_cancel_refunds() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "fernanda").await;
    approve_kyc(&h, &user, &req, &admin).await;
    let wallet = WalletService::new(&h.ctx);
    let admin_service = AdminService::new(&h.ctx);

    wallet
        .deposit(&req, &user.id, dec!(300), PaymentMethod::Pix)
        .await
        .unwrap();
    let withdrawal = wallet.withdraw(&req, &user.id, dec!(100)).await.unwrap().transaction;
    assert_eq!(admin_service.open_withdrawals(&admin).await.unwrap().len(), 1);

    // 1. Cancel: funds come back as an adjustment
    let update = admin_service
        .update_withdrawal_status(&admin, &withdrawal.id, TransactionStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(update.withdrawal.status, TransactionStatus::Cancelled);
    assert!(update.withdrawal.completed_at.is_some());
    let refund = update.refund.expect("refund entry");
    assert_eq!(refund.tx_type, TransactionType::Adjustment);
    assert_eq!(refund.amount, dec!(100.00));
    assert_eq!(refund.balance_after, dec!(300.00));

    // 2. Final states cannot move again
    let err = admin_service
        .update_withdrawal_status(&admin, &withdrawal.id, TransactionStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::InvalidStatusTransition { .. }));

    // 3. Completed withdrawal keeps the funds out
    let second = wallet.withdraw(&req, &user.id, dec!(50)).await.unwrap().transaction;
    let update = admin_service
        .update_withdrawal_status(&admin, &second.id, TransactionStatus::Completed)
        .await
        .unwrap();
    assert!(update.refund.is_none());
    assert!(admin_service.open_withdrawals(&admin).await.unwrap().is_empty());

    assert_eq!(UserRepo::get_balance(h.ctx.pool(), &user.id).await.unwrap(), dec!(250.00));
    assert_ledger_consistent(&h, &user.id).await;
}

#[tokio::test]
async fn test_admin_operations_are_forbidden_to_players() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "gustavo").await;
    let (other, _) = register(&h, "helena").await;
    let admin_service = AdminService::new(&h.ctx);

    assert!(matches!(
        admin_service.list_users(&req).await.unwrap_err(),
        BusinessError::Forbidden(_)
    ));
    assert!(matches!(
        admin_service.suspend_user(&req, &other.id).await.unwrap_err(),
        BusinessError::Forbidden(_)
    ));
    assert!(matches!(
        admin_service.analytics_overview(&req).await.unwrap_err(),
        BusinessError::Forbidden(_)
    ));

    // players only act on themselves
    let err = WalletService::new(&h.ctx)
        .deposit(&req, &other.id, dec!(10), PaymentMethod::Pix)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::Forbidden(_)));

    // admins cannot be deleted, players can
    let err = admin_service
        .delete_user(&admin, &admin.actor_id)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::Forbidden(_)));

    admin_service.delete_user(&admin, &user.id).await.unwrap();
    let err = UserRepo::get_by_id(h.ctx.pool(), &user.id).await.unwrap_err();
    assert!(matches!(BusinessError::from(err), BusinessError::UserNotFound(_)));
    assert_eq!(admin_service.list_users(&admin).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_suspended_user_cannot_move_money() {
    let h = setup(no_welcome()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "igor").await;
    let admin_service = AdminService::new(&h.ctx);
    let wallet = WalletService::new(&h.ctx);

    let suspended = admin_service.suspend_user(&admin, &user.id).await.unwrap();
    assert!(!suspended.is_active);

    let err = wallet
        .deposit(&req, &user.id, dec!(10), PaymentMethod::Pix)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::AccountInactive(_)));

    admin_service.activate_user(&admin, &user.id).await.unwrap();
    wallet
        .deposit(&req, &user.id, dec!(10), PaymentMethod::Pix)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_analytics() {
    let h = setup(PlatformConfig::default()).await;
    let admin = bootstrap_admin(&h).await;
    let (user, req) = register(&h, "julia").await;
    let wallet = WalletService::new(&h.ctx);

    wallet
        .deposit(&req, &user.id, dec!(100), PaymentMethod::Pix)
        .await
        .unwrap();
    wallet
        .place_bet(&req, &user.id, BetRequest::new(GameType::JogoBicho, dec!(40)))
        .await
        .unwrap();

    let admin_service = AdminService::new(&h.ctx);
    let overview = admin_service.analytics_overview(&admin).await.unwrap();
    assert_eq!(overview.users.total_users, 2);
    assert_eq!(overview.bets.total_bets, 1);

    let top = admin_service.top_users(&admin, 500).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].username, "julia");
    assert_eq!(top[0].total_wagered, dec!(40.00));

    let series = admin_service
        .transaction_time_series(&admin, TimePeriod::Day)
        .await
        .unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].period, "2026-03-01 12:00");
    assert_eq!(series[0].deposits, dec!(100.00));
    assert_eq!(series[0].withdrawals, Decimal::ZERO);

    let stats = admin_service.platform_stats(&admin).await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.active_bets, 1);

    let trail = admin_service.audit_trail(&admin, 10).await.unwrap();
    assert!(!trail.is_empty());
    assert_eq!(
        AuditLogRepo::count(h.ctx.pool()).await.unwrap() as usize,
        trail.len()
    );
}
