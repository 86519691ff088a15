use async_graphql::{Context, ErrorExtensions, ID, InputObject, Object, SimpleObject};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{Registration, find_log_in_user, issue_token_pair, refresh_tokens, verify_password},
    user::{User, get_user_by_id, update_user_name, validate_user_name},
};

use super::{app_state, authenticated_user, parse_id, with_connection};

/// A user as seen by GraphQL clients. The password hash is never exposed.
pub struct UserObject(pub User);

#[Object(name = "User")]
impl UserObject {
    async fn id(&self) -> ID {
        self.0.id.as_i64().into()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        self.0.email.as_ref()
    }

    async fn created_at(&self) -> OffsetDateTime {
        self.0.created_at
    }

    async fn updated_at(&self) -> OffsetDateTime {
        self.0.updated_at
    }
}

/// The tokens for a user who just logged in, registered or refreshed their tokens.
#[derive(SimpleObject)]
struct AuthPayload {
    /// The access token to send as a bearer token.
    token: String,
    /// Exchange this for a new pair of tokens with `refreshToken`.
    refresh_token: String,
    user: UserObject,
}

fn auth_payload(user: User, state: &AppState) -> async_graphql::Result<AuthPayload> {
    let tokens = issue_token_pair(&user, state.token_durations, &state.jwt_keys)
        .map_err(|error| error.extend())?;

    Ok(AuthPayload {
        token: tokens.access,
        refresh_token: tokens.refresh,
        user: UserObject(user),
    })
}

#[derive(InputObject)]
struct LoginInput {
    email: String,
    password: String,
}

#[derive(InputObject)]
struct RegisterInput {
    name: String,
    email: String,
    password: String,
}

#[derive(InputObject)]
struct UpdateUserInput {
    name: Option<String>,
}

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    /// The user the access token belongs to.
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            get_user_by_id(user_id, connection)
                .map(UserObject)
                .map_err(|error| match error {
                    Error::NotFound => Error::Unauthenticated,
                    error => error,
                })
        })
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        data: LoginInput,
    ) -> async_graphql::Result<AuthPayload> {
        let state = app_state(ctx)?;

        let user = with_connection(ctx, |connection| find_log_in_user(&data.email, connection))?;
        // The database lock is released before the slow password check.
        let user = verify_password(user, &data.password).map_err(|error| error.extend())?;

        auth_payload(user, state)
    }

    async fn register(
        &self,
        ctx: &Context<'_>,
        data: RegisterInput,
    ) -> async_graphql::Result<AuthPayload> {
        let state = app_state(ctx)?;

        let registration = with_connection(ctx, |connection| {
            Registration::new(&data.name, &data.email, connection)
        })?;
        let password_hash = registration
            .hash_password(&data.password, state.password_hash_cost)
            .map_err(|error| error.extend())?;
        let user = with_connection(ctx, |connection| {
            registration.save(password_hash, connection)
        })?;

        auth_payload(user, state)
    }

    /// Exchange a refresh token for a new access token and refresh token.
    async fn refresh_token(
        &self,
        ctx: &Context<'_>,
        token: String,
    ) -> async_graphql::Result<AuthPayload> {
        let state = app_state(ctx)?;

        with_connection(ctx, |connection| {
            let (tokens, user) =
                refresh_tokens(&token, &state.jwt_keys, state.token_durations, connection)
                    .map_err(|error| match error {
                        Error::InvalidToken => Error::Unauthenticated,
                        error => error,
                    })?;

            Ok(AuthPayload {
                token: tokens.access,
                refresh_token: tokens.refresh,
                user: UserObject(user),
            })
        })
    }

    /// Update the logged in user's profile. Users cannot update each other.
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        id: ID,
        data: UpdateUserInput,
    ) -> async_graphql::Result<UserObject> {
        let user_id = authenticated_user(ctx)?;

        if parse_id(&id).ok() != Some(user_id.as_i64()) {
            return Err(Error::UpdateMissingUser.extend());
        }

        with_connection(ctx, |connection| {
            let user = match data.name {
                Some(name) => update_user_name(user_id, &validate_user_name(&name)?, connection)?,
                None => get_user_by_id(user_id, connection).map_err(|error| match error {
                    Error::NotFound => Error::UpdateMissingUser,
                    error => error,
                })?,
            };

            Ok(UserObject(user))
        })
    }
}
