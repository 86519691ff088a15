//! Encoding and decoding of the JSON Web Tokens used for authentication.

use jsonwebtoken::{Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, app_state::JwtKeys, app_state::TokenDurations, user::User, user::UserID};

/// What a token may be used for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Sent with each request to authenticate the user.
    Access,
    /// Only accepted by the token refresh exchange.
    Refresh,
}

/// The contents of a JSON Web Token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// Email associated with the token.
    pub email: String,
    /// The time the token was issued as a unix timestamp.
    pub iat: i64,
    /// The expiry time of the token as a unix timestamp.
    pub exp: i64,
    /// What the token may be used for.
    pub kind: TokenKind,
}

impl Claims {
    /// The ID of the user the token was issued to.
    pub fn user_id(&self) -> UserID {
        UserID::new(self.sub)
    }
}

/// An access token and the refresh token that can be exchanged for the next pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// The short-lived token for authenticating requests.
    pub access: String,
    /// The long-lived token for getting a new pair of tokens.
    pub refresh: String,
}

/// Create a signed token of `kind` for `user` that expires `valid_for` after `now`.
///
/// # Errors
/// Returns an [Error::TokenCreation] if the token could not be signed.
pub fn encode_token(
    user: &User,
    kind: TokenKind,
    valid_for: Duration,
    now: OffsetDateTime,
    keys: &JwtKeys,
) -> Result<String, Error> {
    let claims = Claims {
        sub: user.id.as_i64(),
        email: user.email.to_string(),
        iat: now.unix_timestamp(),
        exp: (now + valid_for).unix_timestamp(),
        kind,
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Issue a fresh access and refresh token for `user`.
///
/// # Errors
/// Returns an [Error::TokenCreation] if either token could not be signed.
pub fn issue_token_pair(
    user: &User,
    durations: TokenDurations,
    keys: &JwtKeys,
) -> Result<TokenPair, Error> {
    let now = OffsetDateTime::now_utc();

    Ok(TokenPair {
        access: encode_token(user, TokenKind::Access, durations.access, now, keys)?,
        refresh: encode_token(user, TokenKind::Refresh, durations.refresh, now, keys)?,
    })
}

/// Verify `token` and check that it is a token of the `expected` kind.
///
/// # Errors
/// Returns:
/// - [Error::TokenExpired] if the token was valid but its expiry time has passed,
/// - [Error::InvalidToken] if the token is malformed, has a bad signature or is of the wrong kind.
pub fn decode_token(token: &str, expected: TokenKind, keys: &JwtKeys) -> Result<Claims, Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &keys.decoding, &validation)
        .map_err(|error| match error.kind() {
            ErrorKind::ExpiredSignature => Error::TokenExpired,
            _ => {
                tracing::debug!("Rejected token: {error}");
                Error::InvalidToken
            }
        })?
        .claims;

    if claims.kind != expected {
        tracing::debug!(
            "Rejected {:?} token where a {:?} token was expected",
            claims.kind,
            expected
        );
        return Err(Error::InvalidToken);
    }

    Ok(claims)
}
