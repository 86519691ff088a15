//! The GraphQL schema.
//!
//! Each domain module contributes a query root and a mutation root which are
//! merged into [AppSchema]. Resolvers take the database lock through
//! [with_connection] and find out who is asking with [authenticated_user].

mod category;
mod dashboard;
mod transaction;
mod user;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, ID, MaybeUndefined, MergedObject, Schema,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{TokenKind, decode_token},
    user::UserID,
};

pub use category::CategoryObject;
pub use user::UserObject;

/// All queries the API supports.
#[derive(MergedObject, Default)]
pub struct QueryRoot(
    transaction::TransactionQuery,
    category::CategoryQuery,
    dashboard::DashboardQuery,
    user::UserQuery,
);

/// All mutations the API supports.
#[derive(MergedObject, Default)]
pub struct MutationRoot(
    transaction::TransactionMutation,
    category::CategoryMutation,
    user::UserMutation,
);

/// The finance tracker's GraphQL schema.
pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with `state` available to every resolver.
pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    )
    .data(state)
    .finish()
}

/// The raw bearer token sent with a request, if any.
///
/// The token is only decoded by resolvers that need an authenticated user, so
/// that log in and registration work without one.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub(crate) fn app_state<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a AppState> {
    ctx.data::<AppState>()
}

/// Get the ID of the user the request's access token was issued to.
///
/// # Errors
/// Fails with the code `UNAUTHENTICATED` if there is no valid access token and
/// `TOKEN_EXPIRED` if the access token has expired.
pub(crate) fn authenticated_user(ctx: &Context<'_>) -> async_graphql::Result<UserID> {
    let state = app_state(ctx)?;

    let Some(BearerToken(token)) = ctx.data_opt::<BearerToken>() else {
        return Err(Error::Unauthenticated.extend());
    };

    decode_token(token, TokenKind::Access, &state.jwt_keys)
        .map(|claims| claims.user_id())
        .map_err(|error| match error {
            Error::InvalidToken => Error::Unauthenticated.extend(),
            error => error.extend(),
        })
}

/// Run `query` with the locked database connection and convert its errors for the client.
pub(crate) fn with_connection<T>(
    ctx: &Context<'_>,
    query: impl FnOnce(&Connection) -> Result<T, Error>,
) -> async_graphql::Result<T> {
    let state = app_state(ctx)?;
    let connection = state.lock_connection().map_err(|error| error.extend())?;

    query(&connection).map_err(|error| error.extend())
}

/// Parse a GraphQL ID into a database ID.
///
/// IDs that are not integers cannot refer to anything, so they are reported as not found.
pub(crate) fn parse_id(id: &ID) -> Result<i64, Error> {
    id.parse::<i64>().map_err(|_| Error::NotFound)
}

/// Convert an optional input field into a field update.
///
/// A field that was left out is not changed and an explicit null clears the field.
pub(crate) fn maybe_undefined_to_update<T>(value: MaybeUndefined<T>) -> Option<Option<T>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(value) => Some(Some(value)),
    }
}
