//! Shared transcript integration tests

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::common::{anonymous_request, authed_request, parse_body, TestApp};

async fn seed_history(app: &TestApp, jwt: &str) -> uuid::Uuid {
    let id = app.create_conversation(jwt).await;
    for content in ["What should I learn next?", "Rust, probably"] {
        app.send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/messages", id),
            jwt,
            Some(json!({"content": content})),
        ))
        .await;
    }
    id
}

#[tokio::test]
async fn test_share_and_fetch_transcript_without_auth() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = seed_history(&app, &jwt).await;

    let resp = app
        .send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/transcripts", id),
            &jwt,
            Some(json!({})),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let shared = parse_body(resp).await;
    let code = shared["share_code"].as_str().unwrap().to_string();
    assert!(!shared["expires_at"].is_null());

    let resp = app
        .send(anonymous_request(
            Method::GET,
            &format!("/v1/transcripts/{}", code),
            None,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = parse_body(resp).await;
    assert_eq!(body["conversation_id"], id.to_string());
    let contents: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["What should I learn next?", "Rust, probably"]);
}

#[tokio::test]
async fn test_transcript_is_a_snapshot() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = seed_history(&app, &jwt).await;

    let shared = parse_body(
        app.send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/transcripts", id),
            &jwt,
            Some(json!({})),
        ))
        .await,
    )
    .await;

    app.send(authed_request(
        Method::POST,
        &format!("/v1/conversations/{}/messages", id),
        &jwt,
        Some(json!({"content": "Added later"})),
    ))
    .await;

    let body = parse_body(
        app.send(anonymous_request(
            Method::GET,
            &format!("/v1/transcripts/{}", shared["share_code"].as_str().unwrap()),
            None,
        ))
        .await,
    )
    .await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_share_records_code_on_conversation() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = seed_history(&app, &jwt).await;

    let shared = parse_body(
        app.send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/transcripts", id),
            &jwt,
            Some(json!({"expire_after_secs": 3600})),
        ))
        .await,
    )
    .await;

    let conv = parse_body(
        app.send(authed_request(
            Method::GET,
            &format!("/v1/conversations/{}", id),
            &jwt,
            None,
        ))
        .await,
    )
    .await;
    assert_eq!(conv["share_code"], shared["share_code"]);
}

#[tokio::test]
async fn test_unknown_share_code_is_not_found() {
    let app = TestApp::new();

    let resp = app
        .send(anonymous_request(
            Method::GET,
            "/v1/transcripts/does-not-exist",
            None,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_conversation_cannot_be_shared() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = seed_history(&app, &jwt).await;
    app.send(authed_request(
        Method::DELETE,
        &format!("/v1/conversations/{}", id),
        &jwt,
        None,
    ))
    .await;

    let resp = app
        .send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/transcripts", id),
            &jwt,
            Some(json!({})),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_huge_negative_lifetime_uses_default_ttl() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = seed_history(&app, &jwt).await;

    let resp = app
        .send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/transcripts", id),
            &jwt,
            Some(json!({"expire_after_secs": i64::MIN + 1})),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = parse_body(resp).await;
    let expires_at: chrono::DateTime<chrono::Utc> =
        body["expires_at"].as_str().unwrap().parse().unwrap();
    let ttl = expires_at - chrono::Utc::now();
    assert!(ttl > chrono::Duration::days(6) && ttl <= chrono::Duration::days(7));
}
