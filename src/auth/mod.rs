//! Authentication with JSON Web Tokens.
//!
//! Users log in or register to get a short-lived access token and a longer
//! lived refresh token. The access token is sent as a bearer token with each
//! GraphQL request and the refresh token is exchanged for a new pair once the
//! access token expires.

mod service;
mod token;

pub use service::{Registration, find_log_in_user, refresh_tokens, verify_password};
pub use token::{Claims, TokenKind, TokenPair, decode_token, issue_token_pair};
