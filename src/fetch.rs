//! Record search with cursor pagination.
//!
//! # Workflow
//!
//! 1. Acquire an app access token (a failure is logged and the run
//!    continues without one).
//! 2. `POST` the search body to `.../records/search`, adding `page_token`
//!    as a query parameter once the API reports more pages.
//! 3. Append `data.items` of each page until `data.has_more` is false.
//! 4. Normalize the accumulated items.
//!
//! An error payload or a transport failure ends pagination immediately:
//! the failure is surfaced as a notice and the records gathered so far are
//! returned. Nothing is retried.

use serde::Serialize;
use serde_json::Value;

use crate::auth::acquire_token;
use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{RawRecord, RecencyFilter, SourceDescriptor};
use crate::normalize::normalize;
use crate::notice::{Notice, NoticeSink};
use crate::transport::HttpTransport;

/// Column holding "days since last update" in the source table.
pub const UPDATED_IN_FIELD: &str = "UpdatedIn";

#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRequest {
    pub view_id: String,
    pub field_names: Vec<String>,
    pub filter: SearchFilter,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchFilter {
    pub conditions: Vec<Condition>,
    pub conjunction: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Condition {
    pub field_name: String,
    pub operator: String,
    pub value: Vec<String>,
}

/// Body for a search limited to rows updated within the filter's threshold.
pub fn search_request(
    ids: &SourceDescriptor,
    filter: &RecencyFilter,
    field_names: &[String],
) -> SearchRequest {
    SearchRequest {
        view_id: ids.view_id.clone(),
        field_names: field_names.to_vec(),
        filter: SearchFilter {
            conditions: vec![Condition {
                field_name: UPDATED_IN_FIELD.to_string(),
                operator: "isLessEqual".to_string(),
                value: vec![filter.api_value()],
            }],
            conjunction: "and".to_string(),
        },
    }
}

/// One successfully parsed page.
#[derive(Debug, Default)]
struct Page {
    items: Vec<Value>,
    has_more: bool,
    page_token: Option<String>,
}

fn parse_page(response: &Value) -> Result<Page, FetchError> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(FetchError::Api(message));
    }

    let code = response.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let msg = response
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("request rejected");
        return Err(FetchError::Api(format!("{} (code {})", msg, code)));
    }

    let data = response
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| FetchError::Api("response carried no data".to_string()))?;

    Ok(Page {
        items: data
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        has_more: data
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        page_token: data
            .get("page_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    })
}

/// Fetch every page of `url` for `request` and return normalized records.
pub async fn fetch_all(
    transport: &dyn HttpTransport,
    api: &ApiConfig,
    credentials: Credentials<'_>,
    url: &str,
    request: &Value,
    notices: &dyn NoticeSink,
) -> Vec<RawRecord> {
    let token = match acquire_token(
        transport,
        &api.auth_url(),
        credentials.app_id,
        credentials.app_secret,
    )
    .await
    {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!(error = %e, "continuing without an access token");
            None
        }
    };

    let mut items: Vec<Value> = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let mut query = Vec::new();
        if let Some(size) = api.page_size {
            query.push(("page_size".to_string(), size.to_string()));
        }
        if let Some(ref cursor) = page_token {
            query.push(("page_token".to_string(), cursor.clone()));
        }

        let response = match transport
            .post_json(url, &query, token.as_deref(), request)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                notices.notify(Notice::Failure(FetchError::Transport(format!("{:#}", e))));
                break;
            }
        };

        let page = match parse_page(&response) {
            Ok(page) => page,
            Err(e) => {
                notices.notify(Notice::Failure(e));
                break;
            }
        };

        pages += 1;
        tracing::debug!(page = pages, items = page.items.len(), has_more = page.has_more, "fetched page");
        items.extend(page.items);

        if !page.has_more {
            break;
        }
        match page.page_token {
            Some(next) => page_token = Some(next),
            None => {
                tracing::warn!("has_more without page_token; stopping pagination");
                break;
            }
        }
    }

    tracing::info!(pages, items = items.len(), "search finished");
    normalize(&Value::Array(items))
}
