//! Mapping between wire enums and engine enums.

use api_types::{
    Currency as ApiCurrency, Frequency as ApiFrequency, account::AccountKind as ApiAccountKind,
    goal::GoalKind as ApiGoalKind, investment::InvestmentKind as ApiInvestmentKind,
    transaction::TransactionKind as ApiTransactionKind,
};
use engine::{AccountKind, Currency, Frequency, GoalKind, InvestmentKind, TransactionKind};

pub(crate) fn currency_to_api(currency: Currency) -> ApiCurrency {
    match currency {
        Currency::Eur => ApiCurrency::Eur,
        Currency::Usd => ApiCurrency::Usd,
        Currency::Gbp => ApiCurrency::Gbp,
        Currency::Chf => ApiCurrency::Chf,
        Currency::Jpy => ApiCurrency::Jpy,
    }
}

pub(crate) fn currency_from_api(currency: ApiCurrency) -> Currency {
    match currency {
        ApiCurrency::Eur => Currency::Eur,
        ApiCurrency::Usd => Currency::Usd,
        ApiCurrency::Gbp => Currency::Gbp,
        ApiCurrency::Chf => Currency::Chf,
        ApiCurrency::Jpy => Currency::Jpy,
    }
}

pub(crate) fn frequency_to_api(frequency: Frequency) -> ApiFrequency {
    match frequency {
        Frequency::Daily => ApiFrequency::Daily,
        Frequency::Weekly => ApiFrequency::Weekly,
        Frequency::Monthly => ApiFrequency::Monthly,
        Frequency::Yearly => ApiFrequency::Yearly,
    }
}

pub(crate) fn frequency_from_api(frequency: ApiFrequency) -> Frequency {
    match frequency {
        ApiFrequency::Daily => Frequency::Daily,
        ApiFrequency::Weekly => Frequency::Weekly,
        ApiFrequency::Monthly => Frequency::Monthly,
        ApiFrequency::Yearly => Frequency::Yearly,
    }
}

pub(crate) fn account_kind_to_api(kind: AccountKind) -> ApiAccountKind {
    match kind {
        AccountKind::Checking => ApiAccountKind::Checking,
        AccountKind::Savings => ApiAccountKind::Savings,
        AccountKind::CreditCard => ApiAccountKind::CreditCard,
        AccountKind::Investment => ApiAccountKind::Investment,
    }
}

pub(crate) fn account_kind_from_api(kind: ApiAccountKind) -> AccountKind {
    match kind {
        ApiAccountKind::Checking => AccountKind::Checking,
        ApiAccountKind::Savings => AccountKind::Savings,
        ApiAccountKind::CreditCard => AccountKind::CreditCard,
        ApiAccountKind::Investment => AccountKind::Investment,
    }
}

pub(crate) fn transaction_kind_to_api(kind: TransactionKind) -> ApiTransactionKind {
    match kind {
        TransactionKind::Income => ApiTransactionKind::Income,
        TransactionKind::Expense => ApiTransactionKind::Expense,
        TransactionKind::Transfer => ApiTransactionKind::Transfer,
    }
}

pub(crate) fn transaction_kind_from_api(kind: ApiTransactionKind) -> TransactionKind {
    match kind {
        ApiTransactionKind::Income => TransactionKind::Income,
        ApiTransactionKind::Expense => TransactionKind::Expense,
        ApiTransactionKind::Transfer => TransactionKind::Transfer,
    }
}

pub(crate) fn goal_kind_to_api(kind: GoalKind) -> ApiGoalKind {
    match kind {
        GoalKind::Savings => ApiGoalKind::Savings,
        GoalKind::DebtPayoff => ApiGoalKind::DebtPayoff,
        GoalKind::EmergencyFund => ApiGoalKind::EmergencyFund,
        GoalKind::Investment => ApiGoalKind::Investment,
        GoalKind::Purchase => ApiGoalKind::Purchase,
        GoalKind::Other => ApiGoalKind::Other,
    }
}

pub(crate) fn goal_kind_from_api(kind: ApiGoalKind) -> GoalKind {
    match kind {
        ApiGoalKind::Savings => GoalKind::Savings,
        ApiGoalKind::DebtPayoff => GoalKind::DebtPayoff,
        ApiGoalKind::EmergencyFund => GoalKind::EmergencyFund,
        ApiGoalKind::Investment => GoalKind::Investment,
        ApiGoalKind::Purchase => GoalKind::Purchase,
        ApiGoalKind::Other => GoalKind::Other,
    }
}

pub(crate) fn investment_kind_to_api(kind: InvestmentKind) -> ApiInvestmentKind {
    match kind {
        InvestmentKind::Stock => ApiInvestmentKind::Stock,
        InvestmentKind::Etf => ApiInvestmentKind::Etf,
        InvestmentKind::Bond => ApiInvestmentKind::Bond,
        InvestmentKind::Crypto => ApiInvestmentKind::Crypto,
        InvestmentKind::Fund => ApiInvestmentKind::Fund,
        InvestmentKind::Other => ApiInvestmentKind::Other,
    }
}

pub(crate) fn investment_kind_from_api(kind: ApiInvestmentKind) -> InvestmentKind {
    match kind {
        ApiInvestmentKind::Stock => InvestmentKind::Stock,
        ApiInvestmentKind::Etf => InvestmentKind::Etf,
        ApiInvestmentKind::Bond => InvestmentKind::Bond,
        ApiInvestmentKind::Crypto => InvestmentKind::Crypto,
        ApiInvestmentKind::Fund => InvestmentKind::Fund,
        ApiInvestmentKind::Other => InvestmentKind::Other,
    }
}
