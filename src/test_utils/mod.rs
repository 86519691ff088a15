#![allow(missing_docs)]

pub(crate) mod graphql;

use rusqlite::Connection;

use crate::{
    Email, PasswordHash, User,
    db::initialize,
    user::create_user,
};

/// An in-memory database with all of the tables created.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

/// Insert a user with a dummy password hash, skipping the slow bcrypt step.
#[track_caller]
pub(crate) fn insert_test_user(email: &str, connection: &Connection) -> User {
    create_user(
        "Test User",
        Email::new(email).expect("Invalid test email"),
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .expect("Could not create test user")
}

pub(crate) use graphql::{
    assert_error_code, get_test_server, get_test_state, graphql_request, register_test_user,
};
