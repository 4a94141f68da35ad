//! App access token acquisition.
//!
//! One `POST` to the internal app-token endpoint per run. Tokens are not
//! cached or refreshed; a run that outlives its token fails on the next
//! page request and reports it there.

use serde::Serialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::transport::HttpTransport;

#[derive(Serialize)]
struct TokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

/// Exchange an app id and secret for a bearer token.
pub async fn acquire_token(
    transport: &dyn HttpTransport,
    auth_url: &str,
    app_id: &str,
    app_secret: &str,
) -> Result<String, FetchError> {
    let body = serde_json::to_value(TokenRequest { app_id, app_secret })
        .map_err(|e| FetchError::Auth(e.to_string()))?;

    let response = transport
        .post_json(auth_url, &[], None, &body)
        .await
        .map_err(|e| FetchError::Auth(format!("{:#}", e)))?;

    parse_token_response(&response)
}

fn parse_token_response(response: &Value) -> Result<String, FetchError> {
    let code = response.get("code").and_then(Value::as_i64).unwrap_or(0);
    let token = response.get("app_access_token").and_then(Value::as_str);

    match token {
        Some(token) if code == 0 && !token.is_empty() => Ok(token.to_string()),
        _ => {
            let msg = response
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("response carried no app_access_token");
            Err(FetchError::Auth(format!("{} (code {})", msg, code)))
        }
    }
}
