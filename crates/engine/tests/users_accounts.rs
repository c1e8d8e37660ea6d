mod common;

use engine::{
    AccountKind, Currency, EngineError, NewAccountCmd, NewCategoryCmd, NewTransactionCmd,
    UpdateAccountCmd, UpdateCategoryCmd,
};

use common::{balance, checking, date, engine_with_db, register, system_category};

#[tokio::test]
async fn register_normalizes_email_and_authenticates() {
    let (engine, _db) = engine_with_db().await;

    let user = engine
        .register("  Alice@Example.COM ", "correct horse", Some("Alice"), None)
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.currency, Currency::Eur);
    assert_eq!(user.name.as_deref(), Some("Alice"));

    let logged = engine
        .authenticate("alice@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(logged.id, user.id);

    assert!(matches!(
        engine.authenticate("alice@example.com", "wrong password").await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        engine.authenticate("nobody@example.com", "correct horse").await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        engine.authenticate("not-an-email", "correct horse").await,
        Err(EngineError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn register_rejects_duplicates_and_weak_passwords() {
    let (engine, _db) = engine_with_db().await;
    register(&engine, "bob@example.com").await;

    assert!(matches!(
        engine
            .register("BOB@example.com", "another pass", None, None)
            .await,
        Err(EngineError::ExistingKey(_))
    ));
    assert!(matches!(
        engine.register("carol@example.com", "short", None, None).await,
        Err(EngineError::InvalidName(_))
    ));
    assert!(matches!(
        engine
            .register("not-an-email", "correct horse", None, None)
            .await,
        Err(EngineError::InvalidName(_))
    ));
}

#[tokio::test]
async fn profile_and_password_updates() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "dave@example.com").await;

    let updated = engine
        .update_profile(user.id, Some("Dave"), Some(Currency::Usd))
        .await
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("Dave"));
    assert_eq!(updated.currency, Currency::Usd);

    let cleared = engine.update_profile(user.id, Some(""), None).await.unwrap();
    assert_eq!(cleared.name, None);
    assert_eq!(cleared.currency, Currency::Usd);

    assert!(matches!(
        engine
            .change_password(user.id, "wrong one", "brand new pass")
            .await,
        Err(EngineError::Unauthorized(_))
    ));
    engine
        .change_password(user.id, "correct horse", "brand new pass")
        .await
        .unwrap();
    engine
        .authenticate("dave@example.com", "brand new pass")
        .await
        .unwrap();
}

#[tokio::test]
async fn account_names_are_unique_per_user() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice@example.com").await;
    let bob = register(&engine, "bob@example.com").await;

    checking(&engine, alice.id, "Main", 0).await;
    assert!(matches!(
        engine
            .new_account(
                alice.id,
                NewAccountCmd::new("  main ", AccountKind::Savings, Currency::Eur),
            )
            .await,
        Err(EngineError::ExistingKey(_))
    ));
    // Another user may reuse the name.
    checking(&engine, bob.id, "Main", 0).await;
}

#[tokio::test]
async fn accounts_of_other_users_are_not_found() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice@example.com").await;
    let bob = register(&engine, "bob@example.com").await;
    let account_id = checking(&engine, alice.id, "Main", 1_000).await;

    assert!(matches!(
        engine.account(bob.id, account_id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_account(bob.id, account_id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn inactive_accounts_are_hidden_by_default_and_reconcile_sets_sync_time() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "erin@example.com").await;
    let main = checking(&engine, user.id, "Main", 1_000).await;
    let old = checking(&engine, user.id, "Old", 0).await;

    engine
        .update_account(
            user.id,
            old,
            UpdateAccountCmd {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let visible = engine.accounts(user.id, false).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, main);
    assert_eq!(engine.accounts(user.id, true).await.unwrap().len(), 2);

    let reconciled = engine
        .update_account(
            user.id,
            main,
            UpdateAccountCmd {
                balance_minor: Some(4_200),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reconciled.balance_minor, 4_200);
    assert!(reconciled.last_sync_at.is_some());
}

#[tokio::test]
async fn deleting_an_account_keeps_its_transactions() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "frank@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let tx = engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(500, date(2026, 3, 1)).account(main),
        )
        .await
        .unwrap();

    engine.delete_account(user.id, main).await.unwrap();

    let tx = engine.transaction(user.id, tx.id).await.unwrap();
    assert_eq!(tx.account_id, None);
    assert_eq!(tx.currency, Currency::Eur);
}

#[tokio::test]
async fn system_categories_are_seeded_and_read_only() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "gina@example.com").await;

    let categories = engine.categories(user.id).await.unwrap();
    assert!(categories.iter().filter(|c| c.is_system).count() >= 12);

    let food = system_category(&engine, user.id, "Food & Dining").await;
    assert!(matches!(
        engine
            .update_category(
                user.id,
                food.id,
                UpdateCategoryCmd {
                    name: Some("Food".to_string()),
                    ..Default::default()
                },
            )
            .await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine.delete_category(user.id, food.id).await,
        Err(EngineError::Forbidden(_))
    ));
}

#[tokio::test]
async fn user_categories_nest_one_level_and_stay_private() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice@example.com").await;
    let bob = register(&engine, "bob@example.com").await;
    let food = system_category(&engine, alice.id, "Food & Dining").await;

    let coffee = engine
        .new_category(alice.id, NewCategoryCmd::new("Coffee").parent(food.id))
        .await
        .unwrap();
    assert_eq!(coffee.parent_id, Some(food.id));
    assert!(!coffee.is_system);

    assert!(matches!(
        engine
            .new_category(alice.id, NewCategoryCmd::new("Espresso").parent(coffee.id))
            .await,
        Err(EngineError::InvalidName(_))
    ));
    assert!(matches!(
        engine.new_category(alice.id, NewCategoryCmd::new("coffee")).await,
        Err(EngineError::ExistingKey(_))
    ));

    let bobs = engine.categories(bob.id).await.unwrap();
    assert!(bobs.iter().all(|c| c.id != coffee.id));
    assert!(matches!(
        engine.delete_category(bob.id, coffee.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_category_uncategorizes_transactions() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "hank@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let parent = engine
        .new_category(user.id, NewCategoryCmd::new("Hobbies"))
        .await
        .unwrap();
    let child = engine
        .new_category(user.id, NewCategoryCmd::new("Climbing").parent(parent.id))
        .await
        .unwrap();
    let tx = engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(2_500, date(2026, 2, 10))
                .account(main)
                .category(child.id),
        )
        .await
        .unwrap();

    assert!(matches!(
        engine.delete_category(user.id, parent.id).await,
        Err(EngineError::InUse(_))
    ));
    engine.delete_category(user.id, child.id).await.unwrap();
    engine.delete_category(user.id, parent.id).await.unwrap();

    let tx = engine.transaction(user.id, tx.id).await.unwrap();
    assert_eq!(tx.category_id, None);
    assert_eq!(balance(&engine, user.id, main).await, -2_500);
}
