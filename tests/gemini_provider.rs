//! HTTP-level tests for the Google provider against a mock server.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use visionary::{
    AppState, AspectRatio, DataUri, GeminiProvider, GenerationMode, GenerationRequest,
    ImageProvider, SubmitOutcome, ValidationError, VisionaryError,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREDICT_PATH: &str = "/v1beta/models/imagen-4.0-generate-001:predict";
const EDIT_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

fn provider(server: &MockServer) -> GeminiProvider {
    GeminiProvider::builder()
        .api_key("test-key")
        .base_url(format!("{}/v1beta", server.uri()))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn source() -> DataUri {
    DataUri::new("image/png", "iVBORw0KGgo=").unwrap()
}

#[tokio::test]
async fn generate_posts_predict_request_and_wraps_jpeg() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(json!({
            "instances": [{"prompt": "A red balloon over Paris"}],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "16:9",
                "outputOptions": {"mimeType": "image/jpeg"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"bytesBase64Encoded": "/9j/4AAQ", "mimeType": "image/jpeg"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerationRequest::generate("A red balloon over Paris", AspectRatio::Landscape);
    let image = provider(&server).generate(&request).await.unwrap();
    assert_eq!(image.to_string(), "data:image/jpeg;base64,/9j/4AAQ");
}

#[tokio::test]
async fn edit_posts_inline_image_then_instruction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(json!({
            "contents": [{
                "parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}},
                    {"text": "add sunglasses"}
                ]
            }],
            "generationConfig": {"responseModalities": ["IMAGE"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AAAA"}}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerationRequest::edit("add sunglasses", source());
    let image = provider(&server).generate(&request).await.unwrap();
    assert_eq!(image.to_string(), "data:image/png;base64,AAAA");
}

#[tokio::test]
async fn generate_without_image_data_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let request = GenerationRequest::generate("cat", AspectRatio::Square);
    let err = provider(&server).generate(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "No image data returned from the API.");
}

#[tokio::test]
async fn edit_without_image_part_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Sorry"}]}}]
        })))
        .mount(&server)
        .await;

    let request = GenerationRequest::edit("add sunglasses", source());
    let err = provider(&server).generate(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "No image data returned from the editing model.");
}

#[tokio::test]
async fn http_errors_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "API key not valid.", "status": "UNAUTHENTICATED"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let provider = provider(&server);

    let err = provider
        .generate(&GenerationRequest::generate("cat", AspectRatio::Square))
        .await
        .unwrap_err();
    assert!(matches!(err, VisionaryError::Auth(ref msg) if msg == "API key not valid."));

    let err = provider
        .generate(&GenerationRequest::edit("cat", source()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VisionaryError::RateLimited {
            retry_after: Some(d)
        } if d == Duration::from_secs(7)
    ));
}

#[tokio::test]
async fn error_bodies_never_echo_the_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Key test-key has no quota for this model."}
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::generate("cat", AspectRatio::Square))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(!message.contains("test-key"));
    assert_eq!(
        message,
        "API error: 400 - Key [REDACTED] has no quota for this model."
    );
}

#[tokio::test]
async fn failed_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::generate("cat", AspectRatio::Square))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API error: 503 - overloaded");
}

#[tokio::test]
async fn blank_prompt_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::generate("  ", AspectRatio::Square))
        .await
        .unwrap_err();
    assert!(matches!(err, VisionaryError::InvalidRequest(_)));
}

#[tokio::test]
async fn health_check_reports_missing_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/imagen-4.0-generate-001"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider(&server).health_check().await.unwrap_err();
    assert!(matches!(err, VisionaryError::InvalidRequest(_)));
}

#[tokio::test]
async fn health_check_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/imagen-4.0-generate-001"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "models/imagen"})))
        .mount(&server)
        .await;

    provider(&server).health_check().await.unwrap();
}

#[tokio::test]
async fn session_generate_then_quick_edit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"bytesBase64Encoded": "/9j/4AAQ"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .and(body_json(json!({
            "contents": [{
                "parts": [
                    {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/4AAQ"}},
                    {"text": "add sunglasses"}
                ]
            }],
            "generationConfig": {"responseModalities": ["IMAGE"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "BBBB"}}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let mut state = AppState::new();
    state.set_prompt("A red balloon over Paris");
    state.set_aspect_ratio(AspectRatio::Landscape);
    let first = match state.submit(&provider).await.unwrap() {
        SubmitOutcome::Created(id) => id,
        other => panic!("unexpected outcome: {other:?}"),
    };
    let shown = state.current_image().unwrap();
    assert_eq!(shown.id, first);
    assert_eq!(shown.aspect_ratio, Some(AspectRatio::Landscape));

    assert!(state.quick_edit());
    assert_eq!(state.mode(), GenerationMode::Edit);
    assert_eq!(state.prompt(), "");
    assert_eq!(
        state.submit(&provider).await.unwrap_err(),
        ValidationError::BlankPrompt
    );

    state.set_prompt("add sunglasses");
    state.submit(&provider).await.unwrap();

    let prompts: Vec<&str> = state.history().iter().map(|i| i.prompt.as_str()).collect();
    assert_eq!(prompts, vec!["add sunglasses", "A red balloon over Paris"]);
    let edited = state.current_image().unwrap();
    assert_eq!(edited.aspect_ratio, None);
    assert_eq!(edited.image_url.to_string(), "data:image/png;base64,BBBB");
}
