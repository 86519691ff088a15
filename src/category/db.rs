//! Database operations for categories.
//!
//! Every query is scoped to a user. A category that belongs to another user is
//! treated exactly like a category that does not exist.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, NewCategory, domain::CategoryUpdate},
    db::timestamp_now,
    user::UserID,
};

const CATEGORY_COLUMNS: &str =
    "id, name, description, icon, color, user_id, created_at, updated_at";

/// Create a category owned by `user_id` and return it with its generated ID.
///
/// # Errors
/// This function will return an [Error::SqlError] if `user_id` does not refer
/// to a registered user or there is some other SQL error.
pub fn create_category(
    new_category: NewCategory,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let now = timestamp_now();

    connection
        .prepare(&format!(
            "INSERT INTO category (name, description, icon, color, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (
                new_category.name.as_ref(),
                new_category.description,
                new_category.icon,
                new_category.color,
                user_id.as_i64(),
                now,
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a single category by ID.
///
/// # Errors
/// Returns an [Error::NotFound] if the category does not exist or belongs to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE id = :id AND user_id = :user_id;"
        ))?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories ordered alphabetically by name.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE user_id = :user_id ORDER BY name ASC, id ASC;"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Apply `update` to a category and return the updated category.
///
/// # Errors
/// Returns an [Error::UpdateMissingCategory] if the category does not exist or belongs to another user.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserID,
    update: CategoryUpdate,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = get_category(category_id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingCategory,
        error => error,
    })?;
    let category = update.apply(category);

    connection
        .prepare(&format!(
            "UPDATE category
             SET name = ?1, description = ?2, icon = ?3, color = ?4, updated_at = ?5
             WHERE id = ?6 AND user_id = ?7
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (
                category.name.as_ref(),
                category.description,
                category.icon,
                category.color,
                timestamp_now(),
                category_id,
                user_id.as_i64(),
            ),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingCategory,
            error => error.into(),
        })
}

/// Delete a category by ID.
///
/// Transactions in the category are kept and lose their category.
///
/// # Errors
/// Returns an [Error::DeleteMissingCategory] if the category does not exist or belongs to another user.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Get the number of categories the user has.
pub fn count_categories(user_id: UserID, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM category WHERE user_id = ?1;",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Check that `category_id` refers to a category owned by `user_id`.
///
/// # Errors
/// Returns an [Error::InvalidCategory] if the category does not exist or belongs to another user.
pub fn check_category_owner(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let count: u32 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE id = ?1 AND user_id = ?2;",
        (category_id, user_id.as_i64()),
        |row| row.get(0),
    )?;

    if count == 0 {
        return Err(Error::InvalidCategory(Some(category_id)));
    }

    Ok(())
}

/// Get the number of transactions in a category.
pub fn count_category_transactions(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE category_id = ?1;",
            [category_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Get the sum of the amounts of the transactions in a category.
///
/// Income and expenses are added together as stored, matching what the client
/// shows as the category's total.
pub fn sum_category_transactions(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM \"transaction\" WHERE category_id = ?1;",
            [category_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            icon TEXT NOT NULL,
            color TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        description: row.get(2)?,
        icon: row.get(3)?,
        color: row.get(4)?,
        user_id: UserID::new(row.get(5)?),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, UserID,
        category::{
            CategoryName, NewCategory, create_category, delete_category, domain::CategoryUpdate,
            get_categories, get_category, update_category,
        },
        test_utils::{get_test_connection, insert_test_user},
        transaction::{Transaction, TransactionType, create_transaction, get_transaction},
    };

    use super::{
        check_category_owner, count_categories, count_category_transactions,
        sum_category_transactions,
    };

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: CategoryName::new_unchecked(name),
            description: None,
            icon: "Tag".to_owned(),
            color: "#ffffff".to_owned(),
        }
    }

    fn setup() -> (Connection, UserID, UserID) {
        let connection = get_test_connection();
        let user = insert_test_user("foo@bar.baz", &connection);
        let other_user = insert_test_user("bar@baz.qux", &connection);

        (connection, user.id, other_user.id)
    }

    #[test]
    fn create_category_succeeds() {
        let (connection, user_id, _) = setup();
        let mut category = new_category("Terrifically a category");
        category.description = Some("Description".to_owned());

        let got_category =
            create_category(category, user_id, &connection).expect("Could not create category");

        assert!(got_category.id > 0);
        assert_eq!(
            got_category.name,
            CategoryName::new_unchecked("Terrifically a category")
        );
        assert_eq!(got_category.description, Some("Description".to_owned()));
        assert_eq!(got_category.user_id, user_id);
    }

    #[test]
    fn create_category_fails_for_missing_user() {
        let connection = get_test_connection();

        let result = create_category(new_category("Foo"), UserID::new(42), &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn get_category_succeeds() {
        let (connection, user_id, _) = setup();
        let inserted_category = create_category(new_category("Foo"), user_id, &connection)
            .expect("Could not create test category");

        let selected_category = get_category(inserted_category.id, user_id, &connection);

        assert_eq!(Ok(inserted_category), selected_category);
    }

    #[test]
    fn deleted_category_ids_are_not_reused() {
        let (connection, user_id, _) = setup();
        let deleted = create_category(new_category("Foo"), user_id, &connection)
            .expect("Could not create test category");
        delete_category(deleted.id, user_id, &connection).expect("Could not delete category");

        let created = create_category(new_category("Bar"), user_id, &connection)
            .expect("Could not create test category");

        assert_ne!(created.id, deleted.id);
        assert_eq!(
            get_category(deleted.id, user_id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let (connection, user_id, _) = setup();
        let inserted_category = create_category(new_category("Foo"), user_id, &connection)
            .expect("Could not create test category");

        let selected_category = get_category(inserted_category.id + 123, user_id, &connection);

        assert_eq!(selected_category, Err(Error::NotFound));
    }

    #[test]
    fn get_category_of_other_user_returns_not_found() {
        let (connection, user_id, other_user_id) = setup();
        let inserted_category = create_category(new_category("Foo"), user_id, &connection)
            .expect("Could not create test category");

        let selected_category = get_category(inserted_category.id, other_user_id, &connection);

        assert_eq!(selected_category, Err(Error::NotFound));
    }

    #[test]
    fn get_categories_returns_only_own_categories_sorted_by_name() {
        let (connection, user_id, other_user_id) = setup();
        let zebra = create_category(new_category("Zebra"), user_id, &connection).unwrap();
        let alpha = create_category(new_category("Alpha"), user_id, &connection).unwrap();
        create_category(new_category("Not mine"), other_user_id, &connection).unwrap();

        let categories = get_categories(user_id, &connection).expect("Could not get categories");

        assert_eq!(categories, vec![alpha, zebra]);
    }

    #[test]
    fn update_category_succeeds() {
        let (connection, user_id, _) = setup();
        let category = create_category(new_category("Original"), user_id, &connection)
            .expect("Could not create test category");

        let update = CategoryUpdate {
            name: Some(CategoryName::new_unchecked("Updated")),
            description: Some(Some("Now with a description".to_owned())),
            ..Default::default()
        };
        let updated_category = update_category(category.id, user_id, update, &connection)
            .expect("Could not update category");

        assert_eq!(updated_category.id, category.id);
        assert_eq!(updated_category.name, CategoryName::new_unchecked("Updated"));
        assert_eq!(
            updated_category.description,
            Some("Now with a description".to_owned())
        );
        assert_eq!(updated_category.icon, category.icon);
        assert_eq!(
            get_category(category.id, user_id, &connection),
            Ok(updated_category)
        );
    }

    #[test]
    fn update_category_with_invalid_id_returns_error() {
        let (connection, user_id, _) = setup();

        let result = update_category(999999, user_id, CategoryUpdate::default(), &connection);

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn update_category_of_other_user_returns_error() {
        let (connection, user_id, other_user_id) = setup();
        let category = create_category(new_category("Mine"), user_id, &connection).unwrap();

        let result = update_category(
            category.id,
            other_user_id,
            CategoryUpdate {
                name: Some(CategoryName::new_unchecked("Stolen")),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingCategory));
        assert_eq!(get_category(category.id, user_id, &connection), Ok(category));
    }

    #[test]
    fn delete_category_succeeds() {
        let (connection, user_id, _) = setup();
        let category = create_category(new_category("ToDelete"), user_id, &connection)
            .expect("Could not create test category");

        let result = delete_category(category.id, user_id, &connection);

        assert!(result.is_ok());
        assert_eq!(
            get_category(category.id, user_id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_category_keeps_transactions() {
        let (connection, user_id, _) = setup();
        let category = create_category(new_category("ToDelete"), user_id, &connection).unwrap();
        let transaction = create_transaction(
            Transaction::build(12.5, date!(2025 - 01 - 01), TransactionType::Expense)
                .category_id(Some(category.id)),
            user_id,
            &connection,
        )
        .unwrap();

        delete_category(category.id, user_id, &connection).unwrap();

        let transaction = get_transaction(transaction.id, user_id, &connection)
            .expect("transaction should survive deleting its category");
        assert_eq!(transaction.category_id, None);
    }

    #[test]
    fn delete_category_with_invalid_id_returns_error() {
        let (connection, user_id, _) = setup();

        let result = delete_category(999999, user_id, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[test]
    fn delete_category_of_other_user_returns_error() {
        let (connection, user_id, other_user_id) = setup();
        let category = create_category(new_category("Mine"), user_id, &connection).unwrap();

        let result = delete_category(category.id, other_user_id, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
        assert!(get_category(category.id, user_id, &connection).is_ok());
    }

    #[test]
    fn count_categories_only_counts_own_categories() {
        let (connection, user_id, other_user_id) = setup();
        create_category(new_category("A"), user_id, &connection).unwrap();
        create_category(new_category("B"), user_id, &connection).unwrap();
        create_category(new_category("C"), other_user_id, &connection).unwrap();

        assert_eq!(count_categories(user_id, &connection), Ok(2));
        assert_eq!(count_categories(other_user_id, &connection), Ok(1));
    }

    #[test]
    fn check_category_owner_rejects_other_users_category() {
        let (connection, user_id, other_user_id) = setup();
        let category = create_category(new_category("Mine"), user_id, &connection).unwrap();

        assert_eq!(check_category_owner(category.id, user_id, &connection), Ok(()));
        assert_eq!(
            check_category_owner(category.id, other_user_id, &connection),
            Err(Error::InvalidCategory(Some(category.id)))
        );
    }

    #[test]
    fn category_transaction_count_and_sum() {
        let (connection, user_id, _) = setup();
        let category = create_category(new_category("Food"), user_id, &connection).unwrap();
        for amount in [10.0, 20.5] {
            create_transaction(
                Transaction::build(amount, date!(2025 - 02 - 01), TransactionType::Expense)
                    .category_id(Some(category.id)),
                user_id,
                &connection,
            )
            .unwrap();
        }
        create_transaction(
            Transaction::build(99.0, date!(2025 - 02 - 01), TransactionType::Expense),
            user_id,
            &connection,
        )
        .unwrap();

        assert_eq!(count_category_transactions(category.id, &connection), Ok(2));
        assert_eq!(sum_category_transactions(category.id, &connection), Ok(30.5));
    }

    #[test]
    fn empty_category_sums_to_zero() {
        let (connection, user_id, _) = setup();
        let category = create_category(new_category("Empty"), user_id, &connection).unwrap();

        assert_eq!(count_category_transactions(category.id, &connection), Ok(0));
        assert_eq!(sum_category_transactions(category.id, &connection), Ok(0.0));
    }
}
