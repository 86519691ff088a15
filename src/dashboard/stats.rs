//! Loads a user's transactions and summarises them for the dashboard.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    category::{Category, get_category},
    transaction::get_transactions_since,
    user::UserID,
};

use super::aggregation::{
    MonthlyStat, Totals, compute_monthly_stats, compute_totals, most_used_category,
    one_year_before,
};

/// The totals over all of the user's transactions.
///
/// # Errors
/// Returns an [Error::SqlError] if the transactions could not be loaded.
pub fn get_dashboard_stats(user_id: UserID, connection: &Connection) -> Result<Totals, Error> {
    let transactions = get_transactions_since(user_id, None, connection)?;

    Ok(compute_totals(&transactions))
}

/// The per-month income and expenses for the year up to and including `today`.
///
/// # Errors
/// Returns an [Error::SqlError] if the transactions could not be loaded.
pub fn get_monthly_stats(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<MonthlyStat>, Error> {
    let since = one_year_before(today);
    let transactions = get_transactions_since(user_id, Some(since), connection)?;

    Ok(compute_monthly_stats(&transactions, since))
}

/// The category with the most transactions, or `None` if the user has not categorised any.
///
/// # Errors
/// Returns an [Error::SqlError] if the transactions or category could not be loaded.
pub fn get_most_used_category(
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    let mut transactions = get_transactions_since(user_id, None, connection)?;
    // Ties go to the category used first.
    transactions.reverse();

    most_used_category(&transactions)
        .map(|category_id| get_category(category_id, user_id, connection))
        .transpose()
}
