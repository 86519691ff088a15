//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        request, response,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Request and response bodies longer than this many bytes are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Fields whose string values are replaced with asterisks in logged bodies.
const SECRET_FIELDS: [&str; 3] = ["password", "token", "refreshToken"];

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Passwords and tokens in headers and bodies are replaced with asterisks
/// before logging.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_text = match read_body(body).await {
        Ok(body_text) => body_text,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    log_request(&parts, &redact_secrets(&body_text));

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_text = match read_body(body).await {
        Ok(body_text) => body_text,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    log_response(&parts, &redact_secrets(&body_text));

    Response::from_parts(parts, body_text.into())
}

async fn read_body(body: Body) -> Result<String, axum::Error> {
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await?;

    Ok(String::from_utf8_lossy(&body_bytes).to_string())
}

/// Replace the values of password and token fields with asterisks.
///
/// Handles both JSON fields (`"password": "..."`) and arguments written inline
/// in a GraphQL query that is itself inside a JSON string (`token: \"...\"`).
pub(crate) fn redact_secrets(text: &str) -> String {
    SECRET_FIELDS
        .iter()
        .fold(text.to_owned(), |text, key| redact_field(&text, key))
}

fn redact_field(text: &str, key: &str) -> String {
    let mut redacted = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(key_position) = rest.find(key) {
        let after_key = key_position + key.len();
        redacted.push_str(&rest[..after_key]);
        rest = &rest[after_key..];

        let Some((prefix_length, quote)) = find_value_start(rest) else {
            continue;
        };

        redacted.push_str(&rest[..prefix_length]);
        rest = &rest[prefix_length..];
        redacted.push_str(REDACTED);

        rest = match find_closing_quote(rest, quote) {
            Some(end) => &rest[end..],
            None => "",
        };
    }

    redacted.push_str(rest);
    redacted
}

/// Find where a string value starts after a field name.
///
/// Returns the number of bytes up to and including the value's opening quote,
/// and the quote that closes the value.
fn find_value_start(text: &str) -> Option<(usize, &'static str)> {
    let value = text
        .strip_prefix("\\\"")
        .or_else(|| text.strip_prefix('"'))
        .unwrap_or(text)
        .trim_start()
        .strip_prefix(':')?
        .trim_start();

    let quote = if value.starts_with("\\\"") {
        "\\\""
    } else if value.starts_with('"') {
        "\""
    } else {
        return None;
    };

    Some((text.len() - value.len() + quote.len(), quote))
}

fn find_closing_quote(text: &str, quote: &str) -> Option<usize> {
    if quote != "\"" {
        return text.find(quote);
    }

    let mut is_escaped = false;

    for (index, character) in text.char_indices() {
        match character {
            _ if is_escaped => is_escaped = false,
            '\\' => is_escaped = true,
            '"' => return Some(index),
            _ => {}
        }
    }

    None
}

/// The longest prefix of `body` that fits in [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

/// A copy of `headers` with credentials replaced by asterisks.
fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut redacted = headers.clone();

    for name in [AUTHORIZATION, COOKIE, SET_COOKIE] {
        if redacted.contains_key(&name) {
            redacted.insert(name, HeaderValue::from_static(REDACTED));
        }
    }

    redacted
}

fn log_request(parts: &request::Parts, body: &str) {
    let method = &parts.method;
    let uri = &parts.uri;
    let headers = redact_headers(&parts.headers);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {method} {uri}\nheaders: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {method} {uri}\nheaders: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    let status = parts.status;
    let headers = redact_headers(&parts.headers);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {status}\nheaders: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {status}\nheaders: {headers:#?}\nbody: {body:?}");
    }
}
