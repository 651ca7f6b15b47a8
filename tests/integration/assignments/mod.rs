//! Agent assignment integration tests

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{authed_request, parse_body, TestApp};

async fn assign(app: &TestApp, jwt: &str, id: Uuid, agent_id: &str) -> (StatusCode, Value) {
    let resp = app
        .send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/assignments", id),
            jwt,
            Some(json!({"agent_id": agent_id})),
        ))
        .await;
    let status = resp.status();
    (status, parse_body(resp).await)
}

#[tokio::test]
async fn test_assign_agent_updates_conversation() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = app.create_conversation(&jwt).await;

    let (status, body) = assign(&app, &jwt, id, "career-coach").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["agent_id"], "career-coach");
    assert_eq!(body["open"], true);

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
    assert_eq!(conv["assigned_agent_id"], "career-coach");
    assert!(!conv["last_assigned_at"].is_null());
}

#[tokio::test]
async fn test_reassign_closes_previous_assignment() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = app.create_conversation(&jwt).await;

    assign(&app, &jwt, id, "career-coach").await;
    assign(&app, &jwt, id, "writing-tutor").await;

    let history = parse_body(
        app.send(authed_request(
            Method::GET,
            &format!("/v1/conversations/{}/assignments", id),
            &jwt,
            None,
        ))
        .await,
    )
    .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);

    let open: Vec<&Value> = history.iter().filter(|a| a["open"] == true).collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["agent_id"], "writing-tutor");
}

#[tokio::test]
async fn test_unassign_closes_and_clears() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = app.create_conversation(&jwt).await;
    assign(&app, &jwt, id, "career-coach").await;

    let resp = app
        .send(authed_request(
            Method::DELETE,
            &format!("/v1/conversations/{}/assignments", id),
            &jwt,
            None,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let closed = parse_body(resp).await;
    assert_eq!(closed["open"], false);
    assert!(!closed["unassigned_at"].is_null());

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
    assert!(conv["assigned_agent_id"].is_null());
}

#[tokio::test]
async fn test_unassign_without_agent_is_not_found() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = app.create_conversation(&jwt).await;

    let resp = app
        .send(authed_request(
            Method::DELETE,
            &format!("/v1/conversations/{}/assignments", id),
            &jwt,
            None,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_agent_is_rejected() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = app.create_conversation(&jwt).await;

    let (status, _) = assign(&app, &jwt, id, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_assignment_does_not_override_reply_agent() {
    let app = TestApp::new();
    let (_, jwt) = app.new_user();
    let id = app.create_conversation(&jwt).await;
    assign(&app, &jwt, id, "career-coach").await;

    app.send(authed_request(
        Method::POST,
        &format!("/v1/conversations/{}/messages", id),
        &jwt,
        Some(json!({"content": "Hi", "generate_reply": true})),
    ))
    .await;

    let requests = app.llm.recorded_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].agent, "general-assistant");
}
