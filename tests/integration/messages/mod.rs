//! Message append and reply integration tests

use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tessera_llm::MockLlmService;

use crate::common::{authed_request, parse_body, wait_for_len, TestApp};

async fn append(app: &TestApp, jwt: &str, conversation_id: uuid::Uuid, body: Value) -> (StatusCode, Value) {
    let resp = app
        .send(authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/messages", conversation_id),
            jwt,
            Some(body),
        ))
        .await;
    let status = resp.status();
    (status, parse_body(resp).await)
}

mod test_append_message {
    use super::*;

    #[tokio::test]
    async fn test_append_without_reply_returns_history() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, body) = append(&app, &jwt, id, json!({"content": "Hi"})).await;
        assert_eq!(status, StatusCode::CREATED);

        let history = body.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[0]["content"], "Hi");
        assert_eq!(history[0]["conversation_id"], id.to_string());
        assert!(app.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_append_order() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        append(&app, &jwt, id, json!({"role": "system", "content": "Be brief"})).await;
        append(&app, &jwt, id, json!({"content": "first"})).await;
        let (_, body) = append(&app, &jwt, id, json!({"content": "second"})).await;

        let contents: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["Be brief", "first", "second"]);
    }

    #[tokio::test]
    async fn test_blank_content_is_rejected() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, _) = append(&app, &jwt, id, json!({"content": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_role_is_rejected() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, body) =
            append(&app, &jwt, id, json!({"role": "moderator", "content": "Hi"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Unknown message role"));
    }

    #[tokio::test]
    async fn test_deleted_conversation_rejects_messages() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;
        app.send(authed_request(
            Method::DELETE,
            &format!("/v1/conversations/{}", id),
            &jwt,
            None,
        ))
        .await;

        let (status, _) = append(&app, &jwt, id, json!({"content": "Hi"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_other_users_conversation_is_not_found() {
        let app = TestApp::new();
        let (_, owner) = app.new_user();
        let (_, stranger) = app.new_user();
        let id = app.create_conversation(&owner).await;

        let (status, _) = append(&app, &stranger, id, json!({"content": "Hi"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod test_one_shot_reply {
    use super::*;

    #[tokio::test]
    async fn test_reply_is_part_of_returned_history() {
        let app = TestApp::with_llm(MockLlmService::with_deltas(["Hel", "lo", " world"]));
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, body) = append(
            &app,
            &jwt,
            id,
            json!({"content": "Hi", "generate_reply": true}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let history = body.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], "Hello world");
    }

    #[tokio::test]
    async fn test_reply_options_reach_the_llm() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        append(
            &app,
            &jwt,
            id,
            json!({
                "content": "Hi",
                "generate_reply": true,
                "agent": "career-coach",
                "model": "test-model",
                "temperature": 0.5
            }),
        )
        .await;

        let requests = app.llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, "career-coach");
        assert_eq!(requests[0].model.as_deref(), Some("test-model"));
        assert_eq!(requests[0].temperature, Some(0.5));
        assert!(requests[0].input.contains("user: Hi"));
    }

    #[tokio::test]
    async fn test_temperature_out_of_range_is_rejected() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, _) = append(
            &app,
            &jwt,
            id,
            json!({"content": "Hi", "generate_reply": true, "temperature": 3.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_llm_failure_keeps_the_user_message() {
        let app = TestApp::with_llm(MockLlmService::failing("upstream unavailable"));
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, body) = append(
            &app,
            &jwt,
            id,
            json!({"content": "Hi", "generate_reply": true}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let history = body.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["role"], "user");
    }
}

mod test_streaming_reply {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_streamed_reply_is_persisted_after_response() {
        let llm = MockLlmService::with_deltas(["Hel", "lo", " world"])
            .with_delta_delay(Duration::from_millis(10));
        let app = TestApp::streaming(llm);
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, body) = append(
            &app,
            &jwt,
            id,
            json!({"content": "Hi", "generate_reply": true}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let uri = format!("/v1/conversations/{}/messages", id);
        let history = wait_for_len(&app, &uri, &jwt, 2).await;
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], "Hello world");
    }

    #[tokio::test]
    async fn test_failed_stream_persists_nothing() {
        let llm = MockLlmService::failing_after(["partial"], "connection reset");
        let app = TestApp::streaming(llm);
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        append(
            &app,
            &jwt,
            id,
            json!({"content": "Hi", "generate_reply": true}),
        )
        .await;

        // Give the background task time to finish
        tokio::time::sleep(Duration::from_millis(100)).await;

        let body = parse_body(
            app.send(authed_request(
                Method::GET,
                &format!("/v1/conversations/{}/messages", id),
                &jwt,
                None,
            ))
            .await,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(app.llm.recorded_requests().len(), 1);
    }
}
