//! Integration tests for the OpenAI-compatible speech API

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::*;

fn speech_request(body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/audio/speech")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["ready"], true);
    assert!(health["model"].is_string());
}

#[tokio::test]
async fn test_health_check_reports_missing_model() {
    let app = create_unready_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["ready"], false);
}

#[tokio::test]
async fn test_list_models() {
    let app = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let models: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(models["object"], "list");
    assert!(!models["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_voices() {
    let app = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/audio/voices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let voices: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let voices = voices["voices"].as_array().unwrap();
    assert_eq!(voices.len(), 8);
    assert!(voices.contains(&json!("expr-voice-5-m")));
}

#[tokio::test]
async fn test_speech_returns_wav() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({
            "input": "Hello, this is a test.",
            "voice": "expr-voice-5-m"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/wav"
    );
    assert_eq!(
        response.headers().get("x-synthesis-warnings").unwrap(),
        "0"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[0..4], b"RIFF");
    assert_eq!(&body[8..12], b"WAVE");
}

#[tokio::test]
async fn test_speech_accepts_text_field_alias() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({
            "text": "I have three apples."
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_speech_uses_configured_default_voice() {
    let app = create_test_app_with(server::config::ServerConfig {
        default_voice: "shimmer".to_string(),
        ..server::config::ServerConfig::default()
    });
    let response = app
        .oneshot(speech_request(&json!({ "input": "Hello." })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_speech_times_out_as_gateway_timeout() {
    let app = create_stalling_app();
    let response = app
        .oneshot(speech_request(&json!({ "input": "Hello." })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], 504);
}

#[tokio::test]
async fn test_speech_resolves_voice_alias() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({
            "input": "Hello.",
            "voice": "shimmer"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_speech_reports_dropped_sentences() {
    let app = create_test_app();
    // The second sentence uses a script the model alphabet cannot
    // express, so it is dropped and counted in the warnings header.
    let response = app
        .oneshot(speech_request(&json!({
            "input": "I have three apples. Привет мир."
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-synthesis-warnings").unwrap(),
        "1"
    );
}

#[tokio::test]
async fn test_speech_unspeakable_text_is_bad_request() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({ "input": "Привет мир." })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_validation_empty_input() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({ "input": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].is_string());
    assert_eq!(error["code"], 400);
}

#[tokio::test]
async fn test_speech_validation_long_input() {
    let app = create_test_app();
    let long_text = "a".repeat(6000);
    let response = app
        .oneshot(speech_request(&json!({ "input": long_text })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_validation_unknown_voice() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({
            "input": "Hello.",
            "voice": "nonexistent-voice"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_validation_unsupported_format() {
    let app = create_test_app();
    let response = app
        .oneshot(speech_request(&json!({
            "input": "Hello.",
            "response_format": "mp3"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_without_model_is_service_unavailable() {
    let app = create_unready_app();
    let response = app
        .oneshot(speech_request(&json!({ "input": "Hello." })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], 503);
}

#[tokio::test]
async fn test_not_found_endpoint() {
    let app = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
