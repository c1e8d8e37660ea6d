mod common;

use engine::{
    AccountKind, Currency, EngineError, NewAccountCmd, NewAttachmentCmd, NewTransactionCmd,
    TransactionKind, TransactionListFilter, UpdateTransactionCmd,
};

use common::{balance, checking, date, engine_with_db, register, system_category};

#[tokio::test]
async fn income_expense_and_transfer_move_balances() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "alice@example.com").await;
    let main = checking(&engine, user.id, "Main", 10_000).await;
    let savings = checking(&engine, user.id, "Savings", 0).await;

    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::income(250_000, date(2026, 1, 31)).account(main),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(4_550, date(2026, 2, 1)).account(main),
        )
        .await
        .unwrap();
    let transfer = engine
        .new_transaction(
            user.id,
            NewTransactionCmd::transfer(main, savings, 50_000, date(2026, 2, 2)),
        )
        .await
        .unwrap();
    assert_eq!(transfer.kind, TransactionKind::Transfer);

    assert_eq!(balance(&engine, user.id, main).await, 10_000 + 250_000 - 4_550 - 50_000);
    assert_eq!(balance(&engine, user.id, savings).await, 50_000);
}

#[tokio::test]
async fn update_and_delete_keep_balances_consistent() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "bob@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let other = checking(&engine, user.id, "Other", 0).await;

    let tx = engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(1_000, date(2026, 3, 3))
                .account(main)
                .description("groceries"),
        )
        .await
        .unwrap();
    assert_eq!(balance(&engine, user.id, main).await, -1_000);

    let updated = engine
        .update_transaction(
            user.id,
            tx.id,
            UpdateTransactionCmd::default()
                .amount_minor(1_500)
                .account(Some(other)),
        )
        .await
        .unwrap();
    assert_eq!(updated.amount_minor, 1_500);
    assert_eq!(updated.description.as_deref(), Some("groceries"));
    assert_eq!(balance(&engine, user.id, main).await, 0);
    assert_eq!(balance(&engine, user.id, other).await, -1_500);

    engine.delete_transaction(user.id, tx.id).await.unwrap();
    assert_eq!(balance(&engine, user.id, other).await, 0);
    assert!(matches!(
        engine.transaction(user.id, tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn invalid_transactions_are_rejected_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "carol@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let dollars = engine
        .new_account(
            user.id,
            NewAccountCmd::new("Dollars", AccountKind::Savings, Currency::Usd),
        )
        .await
        .unwrap()
        .id;

    assert!(matches!(
        engine
            .new_transaction(user.id, NewTransactionCmd::expense(0, date(2026, 1, 1)).account(main))
            .await,
        Err(EngineError::InvalidAmount(_))
    ));
    assert!(matches!(
        engine
            .new_transaction(
                user.id,
                NewTransactionCmd::transfer(main, main, 100, date(2026, 1, 1)),
            )
            .await,
        Err(EngineError::InvalidKind(_))
    ));
    assert!(matches!(
        engine
            .new_transaction(
                user.id,
                NewTransactionCmd::transfer(main, dollars, 100, date(2026, 1, 1)),
            )
            .await,
        Err(EngineError::CurrencyMismatch(_))
    ));
    assert!(matches!(
        engine
            .new_transaction(
                user.id,
                NewTransactionCmd::expense(100, date(2026, 1, 1))
                    .account(main)
                    .currency(Currency::Usd),
            )
            .await,
        Err(EngineError::CurrencyMismatch(_))
    ));

    assert_eq!(balance(&engine, user.id, main).await, 0);
    assert_eq!(balance(&engine, user.id, dollars).await, 0);
}

#[tokio::test]
async fn transactions_cannot_touch_foreign_accounts() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "alice@example.com").await;
    let mallory = register(&engine, "mallory@example.com").await;
    let main = checking(&engine, alice.id, "Main", 0).await;

    assert!(matches!(
        engine
            .new_transaction(
                mallory.id,
                NewTransactionCmd::expense(100, date(2026, 1, 1)).account(main),
            )
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn transaction_without_account_uses_user_currency() {
    let (engine, _db) = engine_with_db().await;
    let user = engine
        .register("dan@example.com", "correct horse", None, Some(Currency::Gbp))
        .await
        .unwrap();

    let tx = engine
        .new_transaction(user.id, NewTransactionCmd::expense(300, date(2026, 1, 5)))
        .await
        .unwrap();
    assert_eq!(tx.currency, Currency::Gbp);
    assert_eq!(tx.account_id, None);
}

#[tokio::test]
async fn list_paginates_newest_first_with_cursor() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "erin@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;

    for day in 1..=5 {
        engine
            .new_transaction(
                user.id,
                NewTransactionCmd::expense(100 * i64::from(day), date(2026, 4, day)).account(main),
            )
            .await
            .unwrap();
    }

    let filter = TransactionListFilter::default();
    let (first, cursor) = engine
        .list_transactions(user.id, &filter, 2, None)
        .await
        .unwrap();
    assert_eq!(
        first.iter().map(|t| t.amount_minor).collect::<Vec<_>>(),
        vec![500, 400]
    );
    let cursor = cursor.unwrap();

    let (second, cursor) = engine
        .list_transactions(user.id, &filter, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(
        second.iter().map(|t| t.amount_minor).collect::<Vec<_>>(),
        vec![300, 200]
    );

    let (last, cursor) = engine
        .list_transactions(user.id, &filter, 2, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].amount_minor, 100);
    assert!(cursor.is_none());

    assert!(matches!(
        engine
            .list_transactions(user.id, &filter, 2, Some("garbage"))
            .await,
        Err(EngineError::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn list_filters_by_kind_tag_search_and_parent_category() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "fay@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let food = system_category(&engine, user.id, "Food & Dining").await;
    let coffee = engine
        .new_category(user.id, engine::NewCategoryCmd::new("Coffee").parent(food.id))
        .await
        .unwrap();

    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(350, date(2026, 5, 1))
                .account(main)
                .category(coffee.id)
                .description("Flat white")
                .tags(["Morning", "work"]),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(4_000, date(2026, 5, 2))
                .account(main)
                .category(food.id)
                .description("Dinner"),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::income(100_000, date(2026, 5, 3)).account(main),
        )
        .await
        .unwrap();

    let user_id = user.id;
    let list = |filter: TransactionListFilter| {
        let engine = &engine;
        async move {
            engine
                .list_transactions(user_id, &filter, 50, None)
                .await
                .unwrap()
                .0
        }
    };

    let by_parent = list(TransactionListFilter {
        category_id: Some(food.id),
        ..Default::default()
    })
    .await;
    assert_eq!(by_parent.len(), 2);

    let incomes = list(TransactionListFilter {
        kind: Some(TransactionKind::Income),
        ..Default::default()
    })
    .await;
    assert_eq!(incomes.len(), 1);

    let tagged = list(TransactionListFilter {
        tag: Some("morning".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].tags, vec!["morning".to_string(), "work".to_string()]);

    let searched = list(TransactionListFilter {
        search: Some("dinner".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].amount_minor, 4_000);

    let ranged = list(TransactionListFilter {
        from: Some(date(2026, 5, 2)),
        to: Some(date(2026, 5, 3)),
        ..Default::default()
    })
    .await;
    assert_eq!(ranged.len(), 1);
}

#[tokio::test]
async fn tag_and_search_filters_match_literally() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "gus@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;

    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(500, date(2026, 5, 1))
                .account(main)
                .description("cost 500 eur")
                .tags(["abc", "abcd"]),
        )
        .await
        .unwrap();
    engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(700, date(2026, 5, 2))
                .account(main)
                .description("50% off")
                .tags(["a_c"]),
        )
        .await
        .unwrap();

    let user_id = user.id;
    let list = |filter: TransactionListFilter| {
        let engine = &engine;
        async move {
            engine
                .list_transactions(user_id, &filter, 50, None)
                .await
                .unwrap()
                .0
        }
    };

    let underscore = list(TransactionListFilter {
        tag: Some("a_c".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].amount_minor, 700);

    let percent = list(TransactionListFilter {
        search: Some("50%".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].amount_minor, 700);

    // A whole element, not a prefix of a longer tag.
    let prefix = list(TransactionListFilter {
        tag: Some("abc".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(prefix.len(), 1);
    assert_eq!(prefix[0].amount_minor, 500);

    let none = list(TransactionListFilter {
        tag: Some("%".to_string()),
        ..Default::default()
    })
    .await;
    assert!(none.is_empty());
}

#[tokio::test]
async fn attachments_follow_their_transaction() {
    let (engine, _db) = engine_with_db().await;
    let user = register(&engine, "gil@example.com").await;
    let main = checking(&engine, user.id, "Main", 0).await;
    let tx = engine
        .new_transaction(
            user.id,
            NewTransactionCmd::expense(9_900, date(2026, 6, 1)).account(main),
        )
        .await
        .unwrap();

    let attachment = engine
        .add_attachment(
            user.id,
            tx.id,
            NewAttachmentCmd {
                file_name: "receipt.pdf".to_string(),
                url: "https://files.example.com/receipt.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                size_bytes: Some(12_345),
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        engine
            .add_attachment(
                user.id,
                tx.id,
                NewAttachmentCmd {
                    file_name: "x".to_string(),
                    url: "ftp://nope".to_string(),
                    content_type: None,
                    size_bytes: None,
                },
            )
            .await,
        Err(EngineError::InvalidName(_))
    ));

    let loaded = engine.transaction(user.id, tx.id).await.unwrap();
    assert_eq!(loaded.attachments.len(), 1);
    assert_eq!(loaded.attachments[0].id, attachment.id);

    engine
        .remove_attachment(user.id, tx.id, attachment.id)
        .await
        .unwrap();
    assert!(matches!(
        engine.remove_attachment(user.id, tx.id, attachment.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}
