mod common;

use engine::{
    AccountKind, Currency, EngineError, InvestmentKind, NewAccountCmd, NewCategoryCmd,
    NewInvestmentCmd, NewTransactionCmd, TransactionKind, UNCATEGORIZED,
};

use common::{checking, date, engine_with_db, register, system_category};

#[tokio::test]
async fn summary_and_monthly_ignore_transfers() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "alice@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let savings = checking(&engine, user.id, "Savings", 0).await;

    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::income(300_000, date(2026, 1, 31)).account(main),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(45_000, date(2026, 1, 5)).account(main),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(12_000, date(2026, 3, 9)).account(main),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::transfer(main, savings, 100_000, date(2026, 2, 1)),
        )
        .await
        .unwrap();

    let summary = engine
        .summary(user.id, None, None, Currency::Eur)
        .await
        .unwrap();
    assert_eq!(summary.income_minor, 300_000);
    assert_eq!(summary.expense_minor, 57_000);
    assert_eq!(summary.net_minor, 243_000);
    assert_eq!(summary.count, 3);

    let months = engine
        .monthly(user.id, date(2026, 1, 1), date(2026, 4, 1), Currency::Eur)
        .await
        .unwrap();
    let keys: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(keys, vec!["2026-01", "2026-02", "2026-03"]);
    assert_eq!(months[0].net_minor, 255_000);
    assert_eq!(months[1].income_minor, 0);
    assert_eq!(months[1].expense_minor, 0);
    assert_eq!(months[2].expense_minor, 12_000);

    assert!(matches!(
        engine
            .monthly(user.id, date(2026, 4, 1), date(2026, 1, 1), Currency::Eur)
            .await,
        Err(EngineError::InvalidDate(_))
    ));
}

#[tokio::test]
async fn breakdown_rolls_subcategories_into_their_parent() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "bob@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let food = system_category(&engine, user.id, "Food & Dining").await;
    let transport = system_category(&engine, user.id, "Transport").await;
    let coffee = engine
        .new_category(user.id, NewCategoryCmd::new("Coffee").parent(food.id))
        .await
        .unwrap();

    for (amount, category) in [
        (3_000, Some(food.id)),
        (1_000, Some(coffee.id)),
        (2_000, Some(transport.id)),
        (2_000, None),
    ] {
        let mut cmd = NewTransactionCmd::expense(amount, date(2026, 2, 14)).account(main);
        if let Some(category) = category {
            cmd = cmd.category(category);
        }
        engine.new_transaction(user.id, cmd).await.unwrap();
    }

    let breakdown = engine
        .category_breakdown(user.id, None, None, TransactionKind::Expense, Currency::Eur)
        .await
        .unwrap();
    assert_eq!(breakdown.len(), 3);
    assert_eq!(breakdown[0].category_id, Some(food.id));
    assert_eq!(breakdown[0].total_minor, 4_000);
    assert_eq!(breakdown[0].count, 2);
    assert_eq!(breakdown[0].percent, 50.0);
    assert!(breakdown.iter().any(|c| c.name == UNCATEGORIZED && c.category_id.is_none()));
}

#[tokio::test]
async fn net_worth_counts_debt_and_investments() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "carol@example.com").await;
    checking(&engine, user.id, "Main", 500_000).await;
    engine
        .new_account(
            user.id,
            NewAccountCmd::new("Visa", AccountKind::CreditCard, Currency::Eur)
                .balance_minor(-80_000),
        )
        .await
        .unwrap();
    engine
        .new_investment(
            user.id,
            NewInvestmentCmd::new("VWCE", InvestmentKind::Etf, 2.0, 10_000, Currency::Eur),
        )
        .await
        .unwrap();

    let worth = engine.net_worth(user.id).await.unwrap();
    assert_eq!(worth.len(), 1);
    assert_eq!(worth[0].assets_minor, 520_000);
    assert_eq!(worth[0].liabilities_minor, 80_000);
    assert_eq!(worth[0].net_minor, 440_000);
}

#[tokio::test]
async fn csv_export_names_accounts_and_categories() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "dan@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let health = system_category(&engine, user.id, "Health").await;

    let empty = engine.export_csv(user.id, None, None).await.unwrap();
    assert_eq!(
        empty.trim_end(),
        "date,kind,amount,currency,account,to_account,category,description,tags"
    );

    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(1_250, date(2026, 7, 1))
                .account(main)
                .category(health.id)
                .description("Pharmacy, downtown")
                .tags(["health", "receipt"]),
        )
        .await
        .unwrap();

    let csv = engine.export_csv(user.id, None, None).await.unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(",expense,12.50,EUR,Main,,Health,\"Pharmacy, downtown\",health;receipt"));
}

#[tokio::test]
async fn oversized_amounts_are_rejected_and_large_sums_stay_exact() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "alice@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;

    let err = engine
        .new_transaction(
            user.id,
            NewTransactionCmd::income(i64::MAX / 2 + 1, date(2026, 1, 1)).account(main),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .new_account(
            user.id,
            NewAccountCmd::new("Vault", AccountKind::Savings, Currency::Eur).balance_minor(i64::MIN),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    for day in 1..=3 {
        engine
            .new_transaction(
                user.id,
                NewTransactionCmd::income(engine::MAX_AMOUNT_MINOR, date(2026, 1, day)).account(main),
            )
            .await
            .unwrap();
    }
    let summary = engine
        .summary(user.id, None, None, Currency::Eur)
        .await
        .unwrap();
    assert_eq!(summary.income_minor, 3 * engine::MAX_AMOUNT_MINOR);
    assert_eq!(
        common::balance(&engine, user.id, main).await,
        3 * engine::MAX_AMOUNT_MINOR
    );
}
