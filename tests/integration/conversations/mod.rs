//! Conversation lifecycle integration tests

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::common::{anonymous_request, authed_request, parse_body, TestApp};

mod test_create_conversation {
    use super::*;

    #[tokio::test]
    async fn test_create_conversation_returns_201() {
        let app = TestApp::new();
        let (user_id, jwt) = app.new_user();

        let resp = app
            .send(authed_request(
                Method::POST,
                "/v1/conversations",
                &jwt,
                Some(json!({"title": "Planning", "description": "Quarterly goals"})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = parse_body(resp).await;
        assert_eq!(body["user_id"], user_id.to_string());
        assert_eq!(body["title"], "Planning");
        assert_eq!(body["state"], "active");
        assert!(body["archived_at"].is_null());
        assert!(body["deleted_at"].is_null());
    }

    #[tokio::test]
    async fn test_title_over_limit_is_rejected() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();

        let resp = app
            .send(authed_request(
                Method::POST,
                "/v1/conversations",
                &jwt,
                Some(json!({"title": "x".repeat(201)})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = TestApp::new();

        let resp = app
            .send(anonymous_request(
                Method::POST,
                "/v1/conversations",
                Some(json!({})),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let app = TestApp::new();

        let resp = app
            .send(authed_request(
                Method::GET,
                "/v1/conversations",
                "not-a-jwt",
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

mod test_read_conversations {
    use super::*;

    #[tokio::test]
    async fn test_get_own_conversation() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let resp = app
            .send(authed_request(
                Method::GET,
                &format!("/v1/conversations/{}", id),
                &jwt,
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(parse_body(resp).await["id"], id.to_string());
    }

    #[tokio::test]
    async fn test_other_users_conversation_is_not_found() {
        let app = TestApp::new();
        let (_, owner) = app.new_user();
        let (_, stranger) = app.new_user();
        let id = app.create_conversation(&owner).await;

        let resp = app
            .send(authed_request(
                Method::GET,
                &format!("/v1/conversations/{}", id),
                &stranger,
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();

        let resp = app
            .send(authed_request(
                Method::GET,
                &format!("/v1/conversations/{}", Uuid::new_v4()),
                &jwt,
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_only_returns_callers_conversations() {
        let app = TestApp::new();
        let (_, alice) = app.new_user();
        let (_, bob) = app.new_user();
        let first = app.create_conversation(&alice).await;
        let second = app.create_conversation(&alice).await;
        app.create_conversation(&bob).await;

        let resp = app
            .send(authed_request(Method::GET, "/v1/conversations", &alice, None))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = parse_body(resp).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.to_string().as_str()));
        assert!(ids.contains(&second.to_string().as_str()));
    }
}

mod test_lifecycle {
    use super::*;

    async fn post(app: &TestApp, jwt: &str, uri: String) -> (StatusCode, serde_json::Value) {
        let resp = app.send(authed_request(Method::POST, &uri, jwt, None)).await;
        let status = resp.status();
        (status, parse_body(resp).await)
    }

    #[tokio::test]
    async fn test_archive_hides_from_default_listing() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, body) = post(&app, &jwt, format!("/v1/conversations/{}/archive", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "archived");
        assert!(!body["archived_at"].is_null());

        let listed = parse_body(
            app.send(authed_request(Method::GET, "/v1/conversations", &jwt, None))
                .await,
        )
        .await;
        assert!(listed.as_array().unwrap().is_empty());

        let listed = parse_body(
            app.send(authed_request(
                Method::GET,
                "/v1/conversations?include_archived=true",
                &jwt,
                None,
            ))
            .await,
        )
        .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_archive_twice_is_rejected() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        post(&app, &jwt, format!("/v1/conversations/{}/archive", id)).await;
        let (status, _) = post(&app, &jwt, format!("/v1/conversations/{}/archive", id)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unarchive_returns_to_active() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        post(&app, &jwt, format!("/v1/conversations/{}/archive", id)).await;
        let (status, body) =
            post(&app, &jwt, format!("/v1/conversations/{}/unarchive", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "active");
        assert!(body["archived_at"].is_null());
    }

    #[tokio::test]
    async fn test_delete_then_restore() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let resp = app
            .send(authed_request(
                Method::DELETE,
                &format!("/v1/conversations/{}", id),
                &jwt,
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        // Soft-deleted conversations remain readable by the owner
        let body = parse_body(
            app.send(authed_request(
                Method::GET,
                &format!("/v1/conversations/{}", id),
                &jwt,
                None,
            ))
            .await,
        )
        .await;
        assert_eq!(body["state"], "deleted");

        let (status, _) = post(&app, &jwt, format!("/v1/conversations/{}/archive", id)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = post(&app, &jwt, format!("/v1/conversations/{}/restore", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "active");
        assert!(body["deleted_at"].is_null());
    }

    #[tokio::test]
    async fn test_restore_active_conversation_is_rejected() {
        let app = TestApp::new();
        let (_, jwt) = app.new_user();
        let id = app.create_conversation(&jwt).await;

        let (status, _) = post(&app, &jwt, format!("/v1/conversations/{}/restore", id)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod test_health {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let app = TestApp::new();

        let resp = app
            .send(anonymous_request(Method::GET, "/health", None))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }
}
