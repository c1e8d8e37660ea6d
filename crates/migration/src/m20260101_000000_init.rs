//! Initial schema.
//!
//! - `users`: login, display name and default currency
//! - `accounts`: where money is held, with a cached balance
//! - `categories`: system (shared) and per-user categories, nestable
//! - `transactions`: income, expense and transfer records
//! - `transaction_attachments`: receipt and invoice metadata
//! - `recurring_rules` / `recurring_jobs`: recurrence definitions and the
//!   persistent work queue that materializes them
//! - `goals`, `investments`, `subscriptions`
//!
//! Ids are 16-byte blobs, timestamps are UTC and amounts are minor units.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    Currency,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    Kind,
    Provider,
    BalanceMinor,
    Currency,
    IsActive,
    LastSyncAt,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum Categories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    Icon,
    Color,
    ParentId,
    IsSystem,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    AccountId,
    ToAccountId,
    CategoryId,
    Kind,
    AmountMinor,
    Currency,
    Description,
    OccurredAt,
    Tags,
    RecurringRuleId,
    CreatedAt,
}

#[derive(Iden)]
enum TransactionAttachments {
    Table,
    Id,
    TransactionId,
    FileName,
    Url,
    ContentType,
    SizeBytes,
    CreatedAt,
}

#[derive(Iden)]
enum RecurringRules {
    Table,
    Id,
    UserId,
    TemplateTransactionId,
    Frequency,
    Interval,
    StartsAt,
    EndDate,
    Occurrences,
    NextRunAt,
    IsActive,
    LastRunAt,
    CreatedAt,
}

#[derive(Iden)]
enum RecurringJobs {
    Table,
    Id,
    RuleId,
    Status,
    Attempts,
    MaxAttempts,
    RunAt,
    LastError,
    CreatedAt,
    UpdatedAt,
    FinishedAt,
}

#[derive(Iden)]
enum Goals {
    Table,
    Id,
    UserId,
    Name,
    Kind,
    TargetAmountMinor,
    CurrentAmountMinor,
    Currency,
    TargetDate,
    CreatedAt,
}

#[derive(Iden)]
enum Investments {
    Table,
    Id,
    UserId,
    Symbol,
    Name,
    Kind,
    Quantity,
    AveragePriceMinor,
    CurrentPriceMinor,
    Currency,
    Broker,
    Sector,
    PriceUpdatedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    AccountId,
    CategoryId,
    Name,
    AmountMinor,
    Currency,
    Frequency,
    Interval,
    StartsAt,
    PaymentsMade,
    NextPaymentDate,
    IsActive,
    CreatedAt,
}

fn owner_fk(
    table: impl IntoIden + 'static,
    column: impl IntoIden + 'static,
    name: &str,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Users::Table, Users::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(
                        ColumnDef::new(Users::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. Accounts
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::UserId).blob().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::NameNorm).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(ColumnDef::new(Accounts::Provider).string())
                    .col(
                        ColumnDef::new(Accounts::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Accounts::LastSyncAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(
                        Accounts::Table,
                        Accounts::UserId,
                        "fk-accounts-user_id",
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id-name_norm-unique")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .col(Accounts::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 3. Categories (user_id NULL marks a system category)
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Categories::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Categories::UserId).blob())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Icon).string())
                    .col(ColumnDef::new(Categories::Color).string())
                    .col(ColumnDef::new(Categories::ParentId).blob())
                    .col(
                        ColumnDef::new(Categories::IsSystem)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(&mut owner_fk(
                        Categories::Table,
                        Categories::UserId,
                        "fk-categories-user_id",
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id-name_norm")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::NameNorm)
                    .to_owned(),
            )
            .await?;

        // 4. Transactions
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).blob().not_null())
                    .col(ColumnDef::new(Transactions::AccountId).blob())
                    .col(ColumnDef::new(Transactions::ToAccountId).blob())
                    .col(ColumnDef::new(Transactions::CategoryId).blob())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string().not_null())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Tags)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Transactions::RecurringRuleId).blob())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(
                        Transactions::Table,
                        Transactions::UserId,
                        "fk-transactions-user_id",
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-to_account_id")
                            .from(Transactions::Table, Transactions::ToAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-recurring_rule_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::RecurringRuleId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // 5. Attachments
        manager
            .create_table(
                Table::create()
                    .table(TransactionAttachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionAttachments::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionAttachments::TransactionId)
                            .blob()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionAttachments::FileName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionAttachments::Url).string().not_null())
                    .col(ColumnDef::new(TransactionAttachments::ContentType).string())
                    .col(ColumnDef::new(TransactionAttachments::SizeBytes).big_integer())
                    .col(
                        ColumnDef::new(TransactionAttachments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_attachments-transaction_id")
                            .from(
                                TransactionAttachments::Table,
                                TransactionAttachments::TransactionId,
                            )
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transaction_attachments-transaction_id")
                    .table(TransactionAttachments::Table)
                    .col(TransactionAttachments::TransactionId)
                    .to_owned(),
            )
            .await?;

        // 6. Recurring rules and their job queue
        manager
            .create_table(
                Table::create()
                    .table(RecurringRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringRules::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringRules::UserId).blob().not_null())
                    .col(
                        ColumnDef::new(RecurringRules::TemplateTransactionId)
                            .blob()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::Frequency).string().not_null())
                    .col(ColumnDef::new(RecurringRules::Interval).integer().not_null())
                    .col(
                        ColumnDef::new(RecurringRules::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::EndDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(RecurringRules::Occurrences)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RecurringRules::NextRunAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(RecurringRules::LastRunAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(RecurringRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(
                        RecurringRules::Table,
                        RecurringRules::UserId,
                        "fk-recurring_rules-user_id",
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_rules-is_active-next_run_at")
                    .table(RecurringRules::Table)
                    .col(RecurringRules::IsActive)
                    .col(RecurringRules::NextRunAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringJobs::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringJobs::RuleId).blob().not_null())
                    .col(ColumnDef::new(RecurringJobs::Status).string().not_null())
                    .col(
                        ColumnDef::new(RecurringJobs::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RecurringJobs::MaxAttempts)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringJobs::RunAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringJobs::LastError).string())
                    .col(
                        ColumnDef::new(RecurringJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringJobs::FinishedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_jobs-rule_id")
                            .from(RecurringJobs::Table, RecurringJobs::RuleId)
                            .to(RecurringRules::Table, RecurringRules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_jobs-status-run_at")
                    .table(RecurringJobs::Table)
                    .col(RecurringJobs::Status)
                    .col(RecurringJobs::RunAt)
                    .to_owned(),
            )
            .await?;

        // 7. Goals
        manager
            .create_table(
                Table::create()
                    .table(Goals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Goals::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Goals::UserId).blob().not_null())
                    .col(ColumnDef::new(Goals::Name).string().not_null())
                    .col(ColumnDef::new(Goals::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Goals::TargetAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Goals::CurrentAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Goals::Currency).string().not_null())
                    .col(ColumnDef::new(Goals::TargetDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Goals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(Goals::Table, Goals::UserId, "fk-goals-user_id"))
                    .to_owned(),
            )
            .await?;

        // 8. Investments
        manager
            .create_table(
                Table::create()
                    .table(Investments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Investments::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Investments::UserId).blob().not_null())
                    .col(ColumnDef::new(Investments::Symbol).string().not_null())
                    .col(ColumnDef::new(Investments::Name).string())
                    .col(ColumnDef::new(Investments::Kind).string().not_null())
                    .col(ColumnDef::new(Investments::Quantity).double().not_null())
                    .col(
                        ColumnDef::new(Investments::AveragePriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Investments::CurrentPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Investments::Currency).string().not_null())
                    .col(ColumnDef::new(Investments::Broker).string())
                    .col(ColumnDef::new(Investments::Sector).string())
                    .col(ColumnDef::new(Investments::PriceUpdatedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Investments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(
                        Investments::Table,
                        Investments::UserId,
                        "fk-investments-user_id",
                    ))
                    .to_owned(),
            )
            .await?;

        // 9. Subscriptions
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::UserId).blob().not_null())
                    .col(ColumnDef::new(Subscriptions::AccountId).blob())
                    .col(ColumnDef::new(Subscriptions::CategoryId).blob())
                    .col(ColumnDef::new(Subscriptions::Name).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::Currency).string().not_null())
                    .col(ColumnDef::new(Subscriptions::Frequency).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::Interval)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PaymentsMade)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::NextPaymentDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(
                        Subscriptions::Table,
                        Subscriptions::UserId,
                        "fk-subscriptions-user_id",
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subscriptions-account_id")
                            .from(Subscriptions::Table, Subscriptions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subscriptions-category_id")
                            .from(Subscriptions::Table, Subscriptions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-subscriptions-user_id-next_payment_date")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .col(Subscriptions::NextPaymentDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Investments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Goals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringRules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionAttachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
