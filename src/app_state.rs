//! Implements a struct that holds the state of the GraphQL server.

use std::sync::{Arc, Mutex};

use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;
use time::Duration;

use crate::{Error, db::initialize, password::PasswordHash};

/// How long each kind of token stays valid after it is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDurations {
    /// The lifetime of the short-lived token sent with every request.
    pub access: Duration,
    /// The lifetime of the token used to get a new pair of tokens.
    pub refresh: Duration,
}

impl Default for TokenDurations {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::days(1),
        }
    }
}

/// The keys used to sign and verify JSON Web Tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
}

impl JwtKeys {
    /// Derive the signing and verification keys from a shared `secret`.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtKeys { .. }")
    }
}

/// The state of the GraphQL server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The keys for signing and verifying authentication tokens.
    pub jwt_keys: JwtKeys,

    /// How long issued tokens are valid for.
    pub token_durations: TokenDurations,

    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            jwt_keys: JwtKeys::from_secret(jwt_secret),
            token_durations: TokenDurations::default(),
            password_hash_cost: PasswordHash::DEFAULT_COST,
            local_timezone: local_timezone.to_owned(),
            db_connection: connection,
        })
    }

    /// Use `token_durations` for tokens issued from now on.
    pub fn with_token_durations(mut self, token_durations: TokenDurations) -> Self {
        self.token_durations = token_durations;
        self
    }

    /// Use `cost` for hashing passwords from now on.
    pub fn with_password_hash_cost(mut self, cost: u32) -> Self {
        self.password_hash_cost = cost;
        self
    }

    /// Lock the database connection.
    ///
    /// # Errors
    /// Returns [Error::DatabaseLockError] if the lock is poisoned.
    pub fn lock_connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)
    }
}
