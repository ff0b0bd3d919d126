//! Integration tests for withdraw requests against earned balances.

use referral_hub::auth::{AdminSignupRequest, AuthManager, Principal};
use referral_hub::db::{FaultPoint, MemoryStore, Repositories, UserRepository};
use referral_hub::verification::{SignupRequest, VerificationManager};
use referral_hub::withdraw::{
    MIN_WITHDRAWAL, WithdrawError, WithdrawManager, WithdrawMethod, WithdrawStatus,
};

/// Sign up a member and approve their proof so they hold the 50.00 reward
async fn funded_member(store: &MemoryStore) -> i64 {
    let repos = Repositories::from_store(store.clone());
    let auth = AuthManager::new(
        &repos,
        "integration_pepper".to_string(),
        "integration_jwt_secret_0123456789abcdef".to_string(),
    );
    let verification = VerificationManager::new(&repos, auth.hasher().clone());

    let admin = auth
        .register_admin(AdminSignupRequest {
            name: "Payout Admin".to_string(),
            email: "payout@example.com".to_string(),
            password: "admin123".to_string(),
        })
        .await
        .unwrap();
    let receipt = verification
        .submit(SignupRequest {
            name: "Saver".to_string(),
            email: "saver@example.com".to_string(),
            phone: "+251933456789".to_string(),
            telegram_username: None,
            password: "saver123".to_string(),
            image_url: "/uploads/saver.png".to_string(),
            referral_code: None,
        })
        .await
        .unwrap();
    verification
        .resolve_proof(&Principal::from(&admin), receipt.proof_id, "approved", None)
        .await
        .unwrap();

    receipt.user_id
}

#[tokio::test]
async fn test_valid_request_does_not_debit_balance() {
    let store = MemoryStore::new();
    let user_id = funded_member(&store).await;
    let withdrawals = WithdrawManager::new(&Repositories::from_store(store.clone()));

    let request = withdrawals
        .request(user_id, "telebirr", 2_500, "  0911234567 ")
        .await
        .expect("Withdrawal failed");

    assert_eq!(request.method, WithdrawMethod::Telebirr);
    assert_eq!(request.amount, 2_500);
    assert_eq!(request.account_info, "0911234567");
    assert_eq!(request.status, WithdrawStatus::Pending);

    let user = store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.balance, 5_000);
    assert_eq!(user.total_earnings, 5_000);
}

#[tokio::test]
async fn test_boundaries() {
    let store = MemoryStore::new();
    let user_id = funded_member(&store).await;
    let withdrawals = WithdrawManager::new(&Repositories::from_store(store.clone()));

    assert!(matches!(
        withdrawals
            .request(user_id, "cbe", MIN_WITHDRAWAL - 1, "1000123456789")
            .await,
        Err(WithdrawError::BelowMinimum { .. })
    ));
    assert!(matches!(
        withdrawals
            .request(user_id, "cbe", 5_001, "1000123456789")
            .await,
        Err(WithdrawError::InsufficientBalance { available: 5_000 })
    ));

    withdrawals
        .request(user_id, "CBE", MIN_WITHDRAWAL, "1000123456789")
        .await
        .expect("Minimum withdrawal should be accepted");
    withdrawals
        .request(user_id, "cbe", 5_000, "1000123456789")
        .await
        .expect("Full-balance withdrawal should be accepted");

    let listed = withdrawals.list_for_user(user_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].amount, 5_000);
}

#[tokio::test]
async fn test_failed_insert_leaves_nothing() {
    let store = MemoryStore::new();
    let user_id = funded_member(&store).await;
    let withdrawals = WithdrawManager::new(&Repositories::from_store(store.clone()));
    store.fail_at(FaultPoint::WithdrawInsert);

    assert!(matches!(
        withdrawals
            .request(user_id, "telebirr", 2_000, "0911234567")
            .await,
        Err(WithdrawError::Store(_))
    ));
    assert!(withdrawals.list_for_user(user_id).await.unwrap().is_empty());
}
