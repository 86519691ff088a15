use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{AppState, GRAPHQL_PATH, build_router};

pub(crate) const TEST_PASSWORD: &str = "thisisaverysecurepassword!!!!";

/// App state backed by an in-memory database with a cheap bcrypt cost.
pub(crate) fn get_test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "foobar", "Etc/UTC")
        .expect("Could not create app state.")
        .with_password_hash_cost(4)
}

pub(crate) fn get_test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).expect("Could not create test server.")
}

/// Send a GraphQL request and return the JSON response body.
pub(crate) async fn graphql_request(
    server: &TestServer,
    query: &str,
    variables: Value,
    token: Option<&str>,
) -> Value {
    let request = server
        .post(GRAPHQL_PATH)
        .json(&json!({ "query": query, "variables": variables }));

    let request = match token {
        Some(token) => request.authorization_bearer(token),
        None => request,
    };

    let response = request.await;
    response.assert_status_ok();

    response.json::<Value>()
}

/// Register a user through the API and return their access token.
pub(crate) async fn register_test_user(server: &TestServer, email: &str) -> String {
    let response = graphql_request(
        server,
        "mutation Register($data: RegisterInput!) {
            register(data: $data) { token refreshToken user { id } }
        }",
        json!({ "data": { "name": "Test User", "email": email, "password": TEST_PASSWORD } }),
        None,
    )
    .await;

    response["data"]["register"]["token"]
        .as_str()
        .unwrap_or_else(|| panic!("Could not register {email}: {response}"))
        .to_owned()
}

/// Check that the response holds exactly one error with the extension `code`.
#[track_caller]
pub(crate) fn assert_error_code(response: &Value, code: &str) {
    let errors = response["errors"]
        .as_array()
        .unwrap_or_else(|| panic!("expected errors in response, got {response}"));

    assert_eq!(errors.len(), 1, "expected one error, got {errors:?}");
    assert_eq!(
        errors[0]["extensions"]["code"], code,
        "unexpected error: {}",
        errors[0]
    );
}
