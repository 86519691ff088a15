//! Defines the core data models and database queries for transactions.

use async_graphql::Enum;
use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::{CategoryId, check_category_owner},
    db::timestamp_now,
    user::UserID,
};

/// Database identifier for a transaction.
pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money was earned, e.g. a salary payment.
    Income,
    /// Money was spent, e.g. a grocery shop.
    Expense,
}

impl TransactionType {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(FromSqlError::Other(
                format!("unknown transaction type \"{other}\"").into(),
            )),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned in this transaction.
    ///
    /// Whether the money was spent or earned is decided by `transaction_type`,
    /// not by the sign of the amount.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// Whether money was earned or spent.
    pub transaction_type: TransactionType,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, transaction_type: TransactionType) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            transaction_type,
            description: None,
            category_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```
/// use time::macros::date;
///
/// use financy_rs::{Transaction, TransactionType};
///
/// let builder = Transaction::build(45.99, date!(2025 - 01 - 15), TransactionType::Expense)
///     .description(Some("Coffee shop purchase".to_owned()))
///     .category_id(Some(3));
///
/// assert_eq!(builder.category_id, Some(3));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    pub amount: f64,

    /// The date when the transaction occurred.
    pub date: Date,

    /// Whether money was earned or spent.
    pub transaction_type: TransactionType,

    /// An optional human-readable description of the transaction.
    ///
    /// # Examples
    /// - `"Salary - January 2025"`
    /// - `"Starbucks #1234 - Downtown"`
    pub description: Option<String>,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    ///
    /// The category must belong to the same user as the transaction.
    pub category_id: Option<CategoryId>,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }
}

/// A partial update to a transaction.
///
/// Fields set to `None` are left unchanged. The nested options on
/// `description` and `category_id` allow `Some(None)` to clear the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    /// The new amount.
    pub amount: Option<f64>,
    /// The new date.
    pub date: Option<Date>,
    /// The new description, `Some(None)` removes it.
    pub description: Option<Option<String>>,
    /// Whether the transaction is now income or an expense.
    pub transaction_type: Option<TransactionType>,
    /// The new category, `Some(None)` removes the transaction from its category.
    pub category_id: Option<Option<CategoryId>>,
}

impl TransactionUpdate {
    fn apply(self, mut transaction: Transaction) -> Transaction {
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }

        if let Some(date) = self.date {
            transaction.date = date;
        }

        if let Some(description) = self.description {
            transaction.description = description;
        }

        if let Some(transaction_type) = self.transaction_type {
            transaction.transaction_type = transaction_type;
        }

        if let Some(category_id) = self.category_id {
            transaction.category_id = category_id;
        }

        transaction
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(super) const TRANSACTION_COLUMNS: &str = "id, amount, date, description, type, category_id, user_id, created_at, updated_at";

/// Create a new transaction owned by `user_id` in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a category owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(category_id) = builder.category_id {
        check_category_owner(category_id, user_id, connection)?;
    }

    let now = timestamp_now();

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (amount, date, description, type, category_id, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                builder.amount,
                builder.date,
                builder.description,
                builder.transaction_type,
                builder.category_id,
                user_id.as_i64(),
                now,
            ),
            map_transaction_row,
        )
        .map_err(|error| map_foreign_key_error(error, builder.category_id))
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Apply `update` to a transaction and return the updated transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction owned by `user_id`,
/// - [Error::InvalidCategory] if the new category ID does not refer to a category owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingTransaction,
        error => error,
    })?;

    if let Some(Some(category_id)) = update.category_id {
        check_category_owner(category_id, user_id, connection)?;
    }

    let transaction = update.apply(transaction);

    connection
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET amount = ?1, date = ?2, description = ?3, type = ?4, category_id = ?5, updated_at = ?6
             WHERE id = ?7 AND user_id = ?8
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                transaction.amount,
                transaction.date,
                transaction.description,
                transaction.transaction_type,
                transaction.category_id,
                timestamp_now(),
                id,
                user_id.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => map_foreign_key_error(error, transaction.category_id),
        })
}

/// Delete a transaction by its `id`.
///
/// # Errors
/// This function will return an [Error::DeleteMissingTransaction] if `id` does not refer to a
/// transaction owned by `user_id`.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the number of transactions owned by `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(user_id: UserID, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1;",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT,
                type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
                category_id INTEGER,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Composite index used by the transaction list and the dashboard.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub(super) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        transaction_type: row.get(4)?,
        category_id: row.get(5)?,
        user_id: UserID::new(row.get(6)?),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// A category may be deleted between the ownership check and the write.
fn map_foreign_key_error(error: rusqlite::Error, category_id: Option<CategoryId>) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(category_id),
        error => error.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, UserID,
        category::{CategoryName, NewCategory, create_category},
        test_utils::{get_test_connection, insert_test_user},
        transaction::{
            Transaction, TransactionType, TransactionUpdate, count_transactions,
            create_transaction, delete_transaction, get_transaction, update_transaction,
        },
    };

    fn setup() -> (Connection, UserID, UserID) {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let other_user = insert_test_user("bar@baz.qux", &connection);

        (connection, user.id, other_user.id)
    }

    fn create_test_category(user_id: UserID, connection: &Connection) -> i64 {
        create_category(
            NewCategory {
                name: CategoryName::new_unchecked("Food"),
                description: None,
                icon: "Utensils".to_owned(),
                color: "#cc3629".to_owned(),
            },
            user_id,
            connection,
        )
        .expect("Could not create category")
        .id
    }

    #[test]
    fn create_succeeds() {
        let (conn, user_id, _) = setup();
        let amount = 12.3;

        let result = create_transaction(
            Transaction::build(amount, date!(2025 - 10 - 05), TransactionType::Income)
                .description(Some("Pocket money".to_owned())),
            user_id,
            &conn,
        );

        match result {
            Ok(transaction) => {
                assert_eq!(transaction.amount, amount);
                assert_eq!(transaction.date, date!(2025 - 10 - 05));
                assert_eq!(transaction.transaction_type, TransactionType::Income);
                assert_eq!(transaction.description, Some("Pocket money".to_owned()));
                assert_eq!(transaction.user_id, user_id);
            }
            Err(error) => panic!("Unexpected error: {error}"),
        }
    }

    #[test]
    fn create_with_own_category_succeeds() {
        let (conn, user_id, _) = setup();
        let category_id = create_test_category(user_id, &conn);

        let transaction = create_transaction(
            Transaction::build(5.0, date!(2025 - 10 - 04), TransactionType::Expense)
                .category_id(Some(category_id)),
            user_id,
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.category_id, Some(category_id));
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let (conn, user_id, _) = setup();
        let category_id = Some(42);

        let result = create_transaction(
            Transaction::build(123.45, date!(2025 - 10 - 04), TransactionType::Expense)
                .category_id(category_id),
            user_id,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(category_id)));
    }

    #[test]
    fn create_fails_on_other_users_category() {
        let (conn, user_id, other_user_id) = setup();
        let category_id = create_test_category(other_user_id, &conn);

        let result = create_transaction(
            Transaction::build(123.45, date!(2025 - 10 - 04), TransactionType::Expense)
                .category_id(Some(category_id)),
            user_id,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(category_id))));
        assert_eq!(count_transactions(user_id, &conn), Ok(0));
    }

    #[test]
    fn get_transaction_of_other_user_returns_not_found() {
        let (conn, user_id, other_user_id) = setup();
        let transaction = create_transaction(
            Transaction::build(1.0, date!(2025 - 10 - 04), TransactionType::Expense),
            user_id,
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transaction(transaction.id, user_id, &conn),
            Ok(transaction.clone())
        );
        assert_eq!(
            get_transaction(transaction.id, other_user_id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_changes_only_given_fields() {
        let (conn, user_id, _) = setup();
        let category_id = create_test_category(user_id, &conn);
        let transaction = create_transaction(
            Transaction::build(10.0, date!(2025 - 10 - 04), TransactionType::Expense)
                .description(Some("Lunch".to_owned()))
                .category_id(Some(category_id)),
            user_id,
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            transaction.id,
            user_id,
            TransactionUpdate {
                amount: Some(12.0),
                transaction_type: Some(TransactionType::Income),
                ..Default::default()
            },
            &conn,
        )
        .expect("Could not update transaction");

        assert_eq!(updated.amount, 12.0);
        assert_eq!(updated.transaction_type, TransactionType::Income);
        assert_eq!(updated.date, transaction.date);
        assert_eq!(updated.description, transaction.description);
        assert_eq!(updated.category_id, Some(category_id));
        assert_eq!(get_transaction(transaction.id, user_id, &conn), Ok(updated));
    }

    #[test]
    fn update_can_clear_category() {
        let (conn, user_id, _) = setup();
        let category_id = create_test_category(user_id, &conn);
        let transaction = create_transaction(
            Transaction::build(10.0, date!(2025 - 10 - 04), TransactionType::Expense)
                .category_id(Some(category_id)),
            user_id,
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            transaction.id,
            user_id,
            TransactionUpdate {
                category_id: Some(None),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.category_id, None);
    }

    #[test]
    fn update_fails_on_other_users_category() {
        let (conn, user_id, other_user_id) = setup();
        let other_category_id = create_test_category(other_user_id, &conn);
        let transaction = create_transaction(
            Transaction::build(10.0, date!(2025 - 10 - 04), TransactionType::Expense),
            user_id,
            &conn,
        )
        .unwrap();

        let result = update_transaction(
            transaction.id,
            user_id,
            TransactionUpdate {
                category_id: Some(Some(other_category_id)),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(other_category_id))));
        assert_eq!(get_transaction(transaction.id, user_id, &conn), Ok(transaction));
    }

    #[test]
    fn update_fails_on_other_users_transaction() {
        let (conn, user_id, other_user_id) = setup();
        let transaction = create_transaction(
            Transaction::build(10.0, date!(2025 - 10 - 04), TransactionType::Expense),
            user_id,
            &conn,
        )
        .unwrap();

        let result = update_transaction(
            transaction.id,
            other_user_id,
            TransactionUpdate {
                amount: Some(0.0),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_succeeds() {
        let (conn, user_id, _) = setup();
        let transaction = create_transaction(
            Transaction::build(10.0, date!(2025 - 10 - 04), TransactionType::Expense),
            user_id,
            &conn,
        )
        .unwrap();

        assert_eq!(delete_transaction(transaction.id, user_id, &conn), Ok(()));
        assert_eq!(
            get_transaction(transaction.id, user_id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_fails_on_other_users_transaction() {
        let (conn, user_id, other_user_id) = setup();
        let transaction = create_transaction(
            Transaction::build(10.0, date!(2025 - 10 - 04), TransactionType::Expense),
            user_id,
            &conn,
        )
        .unwrap();

        assert_eq!(
            delete_transaction(transaction.id, other_user_id, &conn),
            Err(Error::DeleteMissingTransaction)
        );
        assert!(get_transaction(transaction.id, user_id, &conn).is_ok());
    }

    #[test]
    fn get_count() {
        let (conn, user_id, other_user_id) = setup();
        let today = date!(2025 - 10 - 05);
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(
                Transaction::build(i as f64, today, TransactionType::Expense),
                user_id,
                &conn,
            )
            .expect("Could not create transaction");
        }
        create_transaction(
            Transaction::build(1.0, today, TransactionType::Expense),
            other_user_id,
            &conn,
        )
        .expect("Could not create transaction");

        let got_count = count_transactions(user_id, &conn).expect("Could not get count");

        assert_eq!(want_count, got_count);
    }
}
