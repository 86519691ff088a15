//! Application router configuration.

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState,
    graphql::{AppSchema, BearerToken, build_schema},
};

/// The route that serves the GraphQL API, and the GraphiQL IDE for GET requests.
pub const GRAPHQL_PATH: &str = "/graphql";
/// The route to request a cup of coffee (experimental).
pub const COFFEE_PATH: &str = "/coffee";

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, get(get_graphiql).post(post_graphql))
        .route(COFFEE_PATH, get(get_coffee))
        .fallback(get_404_not_found)
        .with_state(build_schema(state))
}

/// Execute a GraphQL request.
///
/// The bearer token is passed through to the resolvers untouched, it is only
/// decoded by the operations that need a logged in user.
async fn post_graphql(
    State(schema): State<AppSchema>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();

    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        request = request.data(BearerToken(bearer.token().to_owned()));
    }

    schema.execute(request).await.into()
}

/// Serve the GraphiQL IDE for exploring the API.
async fn get_graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

async fn get_404_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}
