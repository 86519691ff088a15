//! The log-in, registration and token refresh flows.

use rusqlite::Connection;

use crate::{
    Error,
    app_state::{JwtKeys, TokenDurations},
    auth::token::{TokenKind, TokenPair, decode_token, issue_token_pair},
    email::Email,
    password::PasswordHash,
    user::{User, create_user, get_user_by_email, get_user_by_id, validate_user_name},
};

/// Find the user trying to log in with `raw_email`.
///
/// # Errors
/// Returns an [Error::InvalidCredentials] if the email does not belong to a registered user.
pub fn find_log_in_user(raw_email: &str, connection: &Connection) -> Result<User, Error> {
    let email = Email::new(raw_email).map_err(|_| Error::InvalidCredentials)?;

    get_user_by_email(&email, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCredentials,
        error => error,
    })
}

/// Check `password` against the password hash of the user found by [find_log_in_user].
///
/// This does not need the database, so callers should release the database
/// lock before calling it.
///
/// # Errors
/// Returns an [Error::InvalidCredentials] if the password is wrong and an
/// [Error::HashingError] if the password could not be verified.
pub fn verify_password(user: User, password: &str) -> Result<User, Error> {
    let is_password_correct = user
        .password_hash
        .verify(password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if is_password_correct {
        tracing::info!("User {} logged in", user.id);
        Ok(user)
    } else {
        tracing::debug!("Wrong password for user {}", user.id);
        Err(Error::InvalidCredentials)
    }
}

/// A sign up request whose name and email have been checked but which has
/// not been saved yet.
///
/// Registering takes three steps so that the password is hashed without
/// holding the database lock: [Registration::new] checks the details,
/// [Registration::hash_password] hashes the password and
/// [Registration::save] creates the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    name: String,
    email: Email,
}

impl Registration {
    /// Check a new user's name and email.
    ///
    /// # Errors
    /// Returns:
    /// - [Error::EmptyUserName] if `name` is blank,
    /// - [Error::InvalidEmail] if `raw_email` is not an email address,
    /// - [Error::DuplicateEmail] if the email is already registered,
    /// - or [Error::SqlError] on unexpected failures.
    pub fn new(name: &str, raw_email: &str, connection: &Connection) -> Result<Self, Error> {
        let name = validate_user_name(name)?;
        let email = Email::new(raw_email)?;

        match get_user_by_email(&email, connection) {
            Ok(_) => Err(Error::DuplicateEmail),
            Err(Error::NotFound) => Ok(Self { name, email }),
            Err(error) => Err(error),
        }
    }

    /// Check the strength of `password` and hash it.
    ///
    /// The user's name and email are passed to the strength check so that
    /// passwords built from them are rejected.
    ///
    /// # Errors
    /// Returns an [Error::TooWeak] if the password is too easy to guess and an
    /// [Error::HashingError] if it could not be hashed.
    pub fn hash_password(&self, password: &str, cost: u32) -> Result<PasswordHash, Error> {
        PasswordHash::from_raw_password(password, &[&self.name, self.email.as_ref()], cost)
    }

    /// Create the user.
    ///
    /// # Errors
    /// Returns an [Error::DuplicateEmail] if the email was registered after
    /// [Registration::new] checked it, or [Error::SqlError] on unexpected failures.
    pub fn save(self, password_hash: PasswordHash, connection: &Connection) -> Result<User, Error> {
        let user = create_user(&self.name, self.email, password_hash, connection)?;
        tracing::info!("Registered user {}", user.id);

        Ok(user)
    }
}

/// Exchange a refresh token for a new pair of tokens.
///
/// An expired refresh token cannot be refreshed again, so it is rejected the
/// same way as a forged one and the client has to log in again.
///
/// # Errors
/// Returns an [Error::InvalidToken] if the token is not a valid refresh token, has expired or its
/// user no longer exists.
pub fn refresh_tokens(
    refresh_token: &str,
    keys: &JwtKeys,
    durations: TokenDurations,
    connection: &Connection,
) -> Result<(TokenPair, User), Error> {
    let claims =
        decode_token(refresh_token, TokenKind::Refresh, keys).map_err(|error| match error {
            Error::TokenExpired => Error::InvalidToken,
            error => error,
        })?;

    let user = get_user_by_id(claims.user_id(), connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidToken,
        error => error,
    })?;

    let tokens = issue_token_pair(&user, durations, keys)?;

    Ok((tokens, user))
}
