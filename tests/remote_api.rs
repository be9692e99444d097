//! Router tests against a mocked PostgREST record store.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, build_test_state, get, login, send, test_config};
use mockito::{Matcher, Server};
use prompt_wheel::config::{AppConfig, BackendKind};
use prompt_wheel::local_store::LocalStorage;
use serde_json::json;

fn remote_config(server: &Server) -> AppConfig {
    let mut cfg = test_config();
    cfg.progress_backend = BackendKind::Remote;
    cfg.remote.url = Some(server.url());
    cfg.remote.api_key = Some("anon".into());
    cfg
}

const ROW: &str = r#"{"id":"uuid-1","prompt_id":"r1","title":"Remote One","text":"Body","instructions":"Do it",
  "grade":6,"section":"Humanity","background_image":null,"example_image":null,"is_active":true,
  "created_at":"2024-05-01T12:00:00Z","updated_at":null}"#;

#[tokio::test]
async fn admin_lists_and_soft_deletes() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/v1/prompts")
        .match_query(Matcher::UrlEncoded("order".into(), "grade.asc,section.asc,created_at.desc".into()))
        .with_status(200)
        .with_body(format!("[{ROW}]"))
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/rest/v1/prompts")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.uuid-1".into()))
        .match_body(Matcher::PartialJson(json!({ "is_active": false })))
        .with_status(200)
        .with_body(format!("[{}]", ROW.replace(r#""is_active":true"#, r#""is_active":false"#)))
        .create_async()
        .await;

    let app = build_test_app(build_test_state(remote_config(&server), LocalStorage::in_memory()).await);
    login(&app).await;

    let listed = body_json(get(&app, "/api/v1/admin/prompts").await).await;
    assert_eq!(listed[0]["promptId"], "r1");
    assert_eq!(listed[0]["isActive"], true);

    let response = send(&app, Method::DELETE, "/api/v1/admin/prompts/uuid-1", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    patch.assert_async().await;
}

#[tokio::test]
async fn admin_create_validates_the_draft() {
    let server = Server::new_async().await;
    let app = build_test_app(build_test_state(remote_config(&server), LocalStorage::in_memory()).await);
    login(&app).await;

    let draft = json!({
        "promptId": "r2", "title": "  ", "text": "t", "instructions": "i",
        "grade": 7, "section": "Honors"
    });
    let response = send(&app, Method::POST, "/api/v1/admin/prompts", Some(draft)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "title must not be empty");
}

#[tokio::test]
async fn unreachable_store_degrades_to_built_in_prompts() {
    let mut cfg = test_config();
    cfg.progress_backend = BackendKind::Remote;
    cfg.remote.url = Some("http://127.0.0.1:9".into());
    cfg.remote.api_key = Some("anon".into());
    cfg.remote.timeout_ms = 500;
    let app = build_test_app(build_test_state(cfg, LocalStorage::in_memory()).await);
    login(&app).await;

    let listed = body_json(get(&app, "/api/v1/prompts?grade=6&section=Humanity").await).await;
    assert_eq!(listed["total"], 7);
    assert_eq!(listed["finishedCount"], 0);

    // Marking fails quietly and the prompt stays unfinished.
    let response = send(&app, Method::POST, "/api/v1/prompts/6h1/finished", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["finished"], false);

    let me = body_json(get(&app, "/api/v1/me").await).await;
    assert_eq!(me["backend"], "remote");
}
