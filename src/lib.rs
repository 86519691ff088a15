//! Financy is a personal finance tracker.
//!
//! This library provides a GraphQL API for managing a user's categories and
//! transactions, and for summarising them on a dashboard.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use async_graphql::ErrorExtensions;
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod category;
mod dashboard;
mod db;
mod email;
mod graphql;
mod logging;
mod password;
mod routing;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, TokenDurations};
pub use auth::{Claims, TokenKind, TokenPair};
pub use category::{Category, CategoryId, CategoryName, NewCategory, create_category};
pub use db::initialize as initialize_db;
pub use email::Email;
pub use graphql::{AppSchema, build_schema};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::{GRAPHQL_PATH, build_router};
pub use timezone::get_local_offset;
pub use transaction::{Transaction, TransactionBuilder, TransactionType, create_transaction};
pub use user::{User, UserID, create_user, get_user_by_email};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email and password combination that does not
    /// match a registered user.
    ///
    /// This error does not say which of the two was wrong so that clients
    /// cannot find out which emails are registered.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request did not carry a valid access token.
    #[error("you must be logged in to do this")]
    Unauthenticated,

    /// The access token was valid but has expired.
    ///
    /// Clients should exchange their refresh token for a new access token and
    /// retry the request.
    #[error("the access token has expired")]
    TokenExpired,

    /// The token could not be decoded, has the wrong kind, or refers to a
    /// user that no longer exists.
    #[error("invalid token")]
    InvalidToken,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The user provided a string that is not an email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address is already used by another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// An empty string was used as a user's name.
    #[error("name cannot be empty")]
    EmptyUserName,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The category ID used for a transaction does not refer to a category
    /// owned by the same user.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A JSON Web Token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The requested resource was not found.
    ///
    /// Resources owned by another user are also reported as not found so that
    /// clients cannot tell whether another user's resource exists.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a user that does not exist
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.ends_with("user.email") => Error::DuplicateEmail,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The machine readable code sent to GraphQL clients in the error's `extensions.code`.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidCredentials | Error::Unauthenticated | Error::InvalidToken => {
                "UNAUTHENTICATED"
            }
            Error::TokenExpired => "TOKEN_EXPIRED",
            Error::TooWeak(_)
            | Error::InvalidEmail(_)
            | Error::DuplicateEmail
            | Error::EmptyUserName
            | Error::EmptyCategoryName
            | Error::InvalidCategory(_) => "BAD_USER_INPUT",
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingUser => "NOT_FOUND",
            Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();

        let message = match code {
            // Internal errors are not intended to be shown to the client.
            "INTERNAL_SERVER_ERROR" => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            _ => self.to_string(),
        };

        async_graphql::Error::new(message).extend_with(|_, extensions| extensions.set("code", code))
    }
}
