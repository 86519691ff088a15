//! Database query helpers for listing a user's transactions.

use rusqlite::{Connection, ToSql, params_from_iter};
use time::Date;

use crate::{Error, category::CategoryId, user::UserID};

use super::core::{TRANSACTION_COLUMNS, Transaction, TransactionType, map_transaction_row};

/// Optional conditions that narrow down a transaction listing.
///
/// Conditions that are set are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only include transactions whose description contains this text.
    pub description: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<CategoryId>,
    /// Inclusive lower bound on the transaction date.
    pub start_date: Option<Date>,
    /// Inclusive upper bound on the transaction date.
    pub end_date: Option<Date>,
}

/// Get the transactions owned by `user_id` that match `filter`.
///
/// Transactions are sorted by date, newest first, and then by ID so that the
/// order of transactions on the same day is stable.
/// `limit` and `offset` page through the sorted results. No limit returns
/// every remaining transaction.
///
/// # Errors
/// Returns [Error::SqlError] if:
/// - SQL query preparation or execution fails
/// - Transaction row mapping fails
pub fn query_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    limit: Option<u32>,
    offset: Option<u32>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut conditions = vec!["user_id = ?".to_owned()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.as_i64())];

    if let Some(description) = &filter.description {
        conditions.push("description LIKE ? ESCAPE '\\'".to_owned());
        params.push(Box::new(format!("%{}%", escape_like(description))));
    }

    if let Some(transaction_type) = filter.transaction_type {
        conditions.push("type = ?".to_owned());
        params.push(Box::new(transaction_type));
    }

    if let Some(category_id) = filter.category_id {
        conditions.push("category_id = ?".to_owned());
        params.push(Box::new(category_id));
    }

    if let Some(start_date) = filter.start_date {
        conditions.push("date >= ?".to_owned());
        params.push(Box::new(start_date));
    }

    if let Some(end_date) = filter.end_date {
        conditions.push("date <= ?".to_owned());
        params.push(Box::new(end_date));
    }

    // SQLite only accepts OFFSET after a LIMIT, -1 means no limit.
    params.push(Box::new(limit.map(i64::from).unwrap_or(-1)));
    params.push(Box::new(i64::from(offset.unwrap_or(0))));

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" \
        WHERE {} \
        ORDER BY date DESC, id DESC \
        LIMIT ? OFFSET ?",
        conditions.join(" AND ")
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get every transaction owned by `user_id` dated on or after `since`, or all of them if
/// `since` is `None`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_transactions_since(
    user_id: UserID,
    since: Option<Date>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let filter = TransactionFilter {
        start_date: since,
        ..Default::default()
    };

    query_transactions(user_id, &filter, None, None, connection)
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
