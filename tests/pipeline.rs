//! End-to-end fetch tests against a local mock of the open platform API.
//!
//! The mock serves the app-token endpoint and a two-page record search, so
//! these tests exercise the real `reqwest` transport, pagination over HTTP,
//! normalization, and reconciliation into a temp-dir vault.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use feishu_fetcher::config::{parse_config, Config};
use feishu_fetcher::error::FetchError;
use feishu_fetcher::models::RecencyFilter;
use feishu_fetcher::notice::{CollectedNotices, Notice};
use feishu_fetcher::sync::fetch_source;
use feishu_fetcher::transport::ReqwestTransport;
use feishu_fetcher::vault::LocalVault;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ─── Mock API ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SearchCall {
    app: String,
    table: String,
    page_token: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct MockApi {
    calls: Arc<Mutex<Vec<SearchCall>>>,
    /// Appended to every MD body, so a second run can change content.
    revision: Arc<Mutex<String>>,
}

async fn token(Json(body): Json<Value>) -> Json<Value> {
    if body["app_secret"] == "secret" {
        Json(json!({"code": 0, "msg": "ok", "app_access_token": "t-mock", "expire": 7200}))
    } else {
        Json(json!({"code": 10014, "msg": "app secret invalid"}))
    }
}

async fn search(
    State(api): State<MockApi>,
    Path((app, table)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let page_token = query.get("page_token").cloned();
    api.calls.lock().unwrap().push(SearchCall {
        app,
        table,
        page_token: page_token.clone(),
        body,
    });

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer t-mock");
    if !authorized {
        return Json(json!({
            "code": 99991663,
            "msg": "Invalid access token for authorization",
            "error": {"message": "Invalid access token for authorization"}
        }));
    }

    let rev = api.revision.lock().unwrap().clone();
    match page_token.as_deref() {
        None => Json(json!({
            "code": 0,
            "msg": "success",
            "data": {
                "has_more": true,
                "page_token": "p2",
                "total": 3,
                "items": [
                    {
                        "record_id": "rec1",
                        "fields": {
                            "Title": [{"type": "text", "text": "Alpha"}],
                            "MD": {"type": 1, "value": [{"type": "text", "text": format!("# Alpha{}", rev)}]},
                            "SubFolder": [{"type": "text", "text": "2024"}]
                        }
                    },
                    {
                        "record_id": "rec2",
                        "fields": {
                            "Title": [{"type": "text", "text": "Beta/Gamma"}],
                            "MD": [{"type": "text", "text": format!("beta body{}", rev)}]
                        }
                    }
                ]
            }
        })),
        Some("p2") => Json(json!({
            "code": 0,
            "msg": "success",
            "data": {
                "has_more": false,
                "total": 3,
                "items": [
                    {
                        "record_id": "rec3",
                        "fields": {
                            "Title": "Delta",
                            "MD": format!("delta{}", rev),
                            "SubFolder": "2024/q4"
                        }
                    }
                ]
            }
        })),
        Some(other) => Json(json!({"error": {"message": format!("bad page token {}", other)}})),
    }
}

async fn spawn_mock(api: MockApi) -> String {
    let app = Router::new()
        .route("/open-apis/auth/v3/app_access_token/internal/", post(token))
        .route(
            "/open-apis/bitable/v1/apps/{app}/tables/{table}/records/search",
            post(search),
        )
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/open-apis", addr)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(tmp: &TempDir, base_url: &str, secret: &str) -> Config {
    parse_config(&format!(
        r#"
[vault]
root = "{}"

[api]
base_url = "{}"

[sync]
settle_delay_ms = 0

[[sources]]
name = "Notes"
url = "https://acme.feishu.cn/base/bascnNotes?table=tblNotes&view=vewRecent"
app_id = "cli_test"
app_secret = "{}"
path = "Notes"
"#,
        tmp.path().display(),
        base_url,
        secret
    ))
    .unwrap()
}

async fn run(config: &Config, filter: &str, notices: &CollectedNotices) -> feishu_fetcher::reconcile::SyncReport {
    let vault = LocalVault::open(&config.vault.root).unwrap();
    let source = config.source("Notes").unwrap();
    let filter = RecencyFilter::by_id(filter).unwrap();
    fetch_source(
        config,
        source,
        &filter,
        &ReqwestTransport::new(),
        &vault,
        notices,
    )
    .await
    .unwrap()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn first_run_creates_notes_from_both_pages() {
    let api = MockApi::default();
    let base_url = spawn_mock(api.clone()).await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &base_url, "secret");
    let notices = CollectedNotices::new();

    let report = run(&config, "week", &notices).await;

    assert_eq!(report.created, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(
        fs::read_to_string(tmp.path().join("Notes/2024/Alpha.md")).unwrap(),
        "# Alpha"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("Notes/Beta-Gamma.md")).unwrap(),
        "beta body"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("Notes/2024/q4/Delta.md")).unwrap(),
        "delta"
    );

    let calls = api.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].app, "bascnNotes");
    assert_eq!(calls[0].table, "tblNotes");
    assert_eq!(calls[0].page_token, None);
    assert_eq!(calls[1].page_token.as_deref(), Some("p2"));
    assert_eq!(calls[0].body["view_id"], json!("vewRecent"));
    assert_eq!(
        calls[0].body["filter"],
        json!({
            "conditions": [{"field_name": "UpdatedIn", "operator": "isLessEqual", "value": ["7"]}],
            "conjunction": "and"
        })
    );

    let seen = notices.snapshot();
    assert_eq!(seen.first(), Some(&Notice::ToProcess { total: 3 }));
    assert!(seen.contains(&Notice::Finished));
}

#[tokio::test]
async fn second_run_modifies_existing_notes() {
    let api = MockApi::default();
    let base_url = spawn_mock(api.clone()).await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &base_url, "secret");

    run(&config, "all", &CollectedNotices::new()).await;
    *api.revision.lock().unwrap() = " (edited)".to_string();
    let report = run(&config, "all", &CollectedNotices::new()).await;

    assert_eq!(report.created, 0);
    assert_eq!(report.modified, 3);
    assert_eq!(
        fs::read_to_string(tmp.path().join("Notes/2024/Alpha.md")).unwrap(),
        "# Alpha (edited)"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("Notes/2024/q4/Delta.md")).unwrap(),
        "delta (edited)"
    );
}

#[tokio::test]
async fn bad_secret_surfaces_api_error_and_writes_nothing() {
    let api = MockApi::default();
    let base_url = spawn_mock(api.clone()).await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, &base_url, "wrong");
    let notices = CollectedNotices::new();

    let report = run(&config, "day", &notices).await;

    assert_eq!(report.total(), 0);
    assert_eq!(api.calls.lock().unwrap().len(), 1);
    assert_eq!(
        notices.failures(),
        vec![FetchError::Api(
            "Invalid access token for authorization".to_string()
        )]
    );
    assert!(!tmp.path().join("Notes").exists());
}
