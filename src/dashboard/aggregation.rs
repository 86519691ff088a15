//! Transaction data aggregation for the dashboard.
//!
//! These functions are pure, they work on a slice of transactions that the
//! caller has already loaded for a single user.

use std::collections::HashMap;

use time::{Date, Month};

use crate::{
    category::CategoryId,
    transaction::{Transaction, TransactionType},
};

/// The total income and expenses over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// Income minus expenses.
    pub balance: f64,
    pub income: f64,
    pub expense: f64,
}

/// The income and expenses for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyStat {
    /// The month formatted as "YYYY-MM", e.g. "2025-01".
    pub month: String,
    pub income: f64,
    pub expense: f64,
}

/// Sum the income and expenses in `transactions`.
pub fn compute_totals(transactions: &[Transaction]) -> Totals {
    let mut totals = Totals::default();

    for transaction in transactions {
        match transaction.transaction_type {
            TransactionType::Income => totals.income += transaction.amount,
            TransactionType::Expense => totals.expense += transaction.amount,
        }
    }

    totals.balance = totals.income - totals.expense;
    totals
}

/// Sum the income and expenses per calendar month for the transactions dated on or after `since`.
///
/// # Returns
/// One entry per month that has at least one transaction, sorted from oldest to newest.
pub fn compute_monthly_stats(transactions: &[Transaction], since: Date) -> Vec<MonthlyStat> {
    let mut totals: HashMap<(i32, Month), (f64, f64)> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.date >= since) {
        let month = (transaction.date.year(), transaction.date.month());
        let (income, expense) = totals.entry(month).or_insert((0.0, 0.0));

        match transaction.transaction_type {
            TransactionType::Income => *income += transaction.amount,
            TransactionType::Expense => *expense += transaction.amount,
        }
    }

    let mut months: Vec<_> = totals.into_iter().collect();
    months.sort_by_key(|((year, month), _)| (*year, *month as u8));

    months
        .into_iter()
        .map(|((year, month), (income, expense))| MonthlyStat {
            month: format!("{year:04}-{:02}", month as u8),
            income,
            expense,
        })
        .collect()
}

/// Find the category used by the most transactions.
///
/// Transactions without a category are ignored. Ties go to the category that
/// appears first in `transactions`.
///
/// # Returns
/// `None` if no transaction has a category.
pub fn most_used_category(transactions: &[Transaction]) -> Option<CategoryId> {
    // (count, index of first occurrence)
    let mut counts: HashMap<CategoryId, (usize, usize)> = HashMap::new();

    for (index, category_id) in transactions
        .iter()
        .enumerate()
        .filter_map(|(index, transaction)| transaction.category_id.map(|id| (index, id)))
    {
        counts.entry(category_id).or_insert((0, index)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(category_id, _)| category_id)
}

/// The same calendar day one year before `date`.
///
/// 29 February maps to 28 February of the previous year.
pub fn one_year_before(date: Date) -> Date {
    let year = date.year() - 1;

    date.replace_year(year)
        .or_else(|_| date.replace_day(28).and_then(|date| date.replace_year(year)))
        .unwrap_or(Date::MIN)
}
