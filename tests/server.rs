//! HTTP surface, driven through the router without binding a socket.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use portfolio_rag::content::{Contact, Profile, StructuredContent};
use portfolio_rag::embedding::DisabledProvider;
use portfolio_rag::error::GenerationError;
use portfolio_rag::llm::{CompletionRequest, LanguageModel};
use portfolio_rag::orchestrator::Assistant;
use portfolio_rag::server::{router, GENERIC_FAILURE};
use portfolio_rag::store::ContextStore;

/// Replies with the last line of the prompt, or fails when asked to.
struct LastLine;

#[async_trait]
impl LanguageModel for LastLine {
    fn model_name(&self) -> &str {
        "last-line"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        if request.user.contains("Question: explode") {
            return Err(GenerationError::Api {
                status: 500,
                body: "internal stack trace".into(),
            });
        }
        Ok(request.user.lines().last().unwrap_or_default().to_string())
    }
}

fn app(model: Option<Arc<dyn LanguageModel>>) -> axum::Router {
    let content = StructuredContent {
        profile: Profile {
            name: "Sam Rivera".into(),
            title: "Backend Engineer".into(),
            bio: "Builds reliable systems.".into(),
            location: None,
        },
        contact: Contact {
            email: "sam@example.com".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let store = ContextStore::new(Arc::new(DisabledProvider), None);
    router(Arc::new(Assistant::new(store, content, model)))
}

async fn post_chat(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn chat_returns_model_response() {
    let (status, body) = post_chat(
        app(Some(Arc::new(LastLine))),
        json!({
            "message": "What do you do?",
            "history": [
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello!" }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Question: What do you do?");
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    let (status, body) = post_chat(app(Some(Arc::new(LastLine))), json!({ "message": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn generation_failure_hides_details() {
    let (status, body) =
        post_chat(app(Some(Arc::new(LastLine))), json!({ "message": "explode" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], GENERIC_FAILURE);
    assert!(!body.to_string().contains("stack trace"));
}

#[tokio::test]
async fn unconfigured_model_still_answers_with_contact() {
    let (status, body) = post_chat(app(None), json!({ "message": "Hello?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().contains("sam@example.com"));
}

#[tokio::test]
async fn health_reports_configuration() {
    let response = app(None)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["configured"], false);
}
