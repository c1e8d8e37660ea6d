//! Moneta engine: domain types, storage models and every business operation
//! of the personal-finance backend.
//!
//! All operations live on [`Engine`] and are scoped to a user id: whatever
//! belongs to someone else is reported as [`EngineError::KeyNotFound`].

pub use accounts::{Account, AccountKind};
pub use attachments::Attachment;
pub use categories::Category;
pub use commands::{
    NewAccountCmd, NewAttachmentCmd, NewCategoryCmd, NewGoalCmd, NewInvestmentCmd,
    NewSubscriptionCmd, NewTransactionCmd, RecurrenceSpec, UpdateAccountCmd, UpdateCategoryCmd,
    UpdateGoalCmd, UpdateInvestmentCmd, UpdateSubscriptionCmd, UpdateTransactionCmd,
};
pub use currency::Currency;
pub use error::EngineError;
pub use goals::{Goal, GoalKind, GoalProgress};
pub use investments::{
    AllocationSlice, HoldingValue, Investment, InvestmentKind, PortfolioSummary,
};
pub use money::Money;
pub use ops::{DEFAULT_JOB_LEASE_SECS, Engine, EngineBuilder, TransactionListFilter};
pub use password::DEFAULT_ITERATIONS;
pub use recurrence::{Frequency, occurrence};
pub use recurring_jobs::{JobStatus, QueueStats, RecurringJob, RunReport};
pub use recurring_rules::RecurringRule;
pub use reports::{CategoryTotal, MonthlyEntry, NetWorth, Summary, UNCATEGORIZED};
pub use subscriptions::{Subscription, SubscriptionSummary};
pub use transactions::{Transaction, TransactionKind};
pub use users::User;
pub use util::MAX_AMOUNT_MINOR;

mod accounts;
mod attachments;
mod categories;
mod commands;
mod currency;
mod error;
mod goals;
mod investments;
mod money;
mod ops;
mod password;
mod recurrence;
mod recurring_jobs;
mod recurring_rules;
mod reports;
mod subscriptions;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
