//! HTTP provider tests against a local mock server.

mod common;

use httpmock::prelude::*;
use serde_json::json;

use pdf_qa::config::{Config, EmbeddingConfig, GenerationConfig};
use pdf_qa::embedding::create_provider;
use pdf_qa::error::PipelineError;
use pdf_qa::generation::create_generator;
use pdf_qa::models::{Credential, Upload};
use pdf_qa::session::{handle_query, Interaction, Outcome, Pipeline, SessionState};

fn key() -> Credential {
    Credential::new("test-key").unwrap()
}

fn gemini_embedding(server: &MockServer) -> EmbeddingConfig {
    EmbeddingConfig {
        base_url: Some(server.base_url()),
        ..EmbeddingConfig::default()
    }
}

fn gemini_generation(server: &MockServer) -> GenerationConfig {
    GenerationConfig {
        base_url: Some(server.base_url()),
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn gemini_batch_embed_sends_key_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:batchEmbedContents")
                .header("x-goog-api-key", "test-key")
                .body_includes("\"requests\"")
                .body_includes("RETRIEVAL_DOCUMENT");
            then.status(200).json_body(json!({
                "embeddings": [
                    { "values": [0.5, 0.25] },
                    { "values": [1.0, 0.0] }
                ]
            }));
        })
        .await;

    let provider = create_provider(&gemini_embedding(&server), &key()).unwrap();
    let vectors = provider
        .embed(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors, vec![vec![0.5, 0.25], vec![1.0, 0.0]]);
    assert_eq!(provider.model_name(), "models/embedding-001");
}

#[tokio::test]
async fn gemini_query_embedding_uses_query_task() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:batchEmbedContents")
                .body_includes("RETRIEVAL_QUERY")
                .body_includes("What is Beta?");
            then.status(200)
                .json_body(json!({ "embeddings": [{ "values": [0.0, 1.0] }] }));
        })
        .await;

    let provider = create_provider(&gemini_embedding(&server), &key()).unwrap();
    let vector = provider.embed_query("What is Beta?").await.unwrap();

    mock.assert_async().await;
    assert_eq!(vector, vec![0.0, 1.0]);
}

#[tokio::test]
async fn gemini_rejected_key_is_embedding_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:batchEmbedContents");
            then.status(400).json_body(json!({
                "error": { "code": 400, "message": "API key not valid. Please pass a valid API key." }
            }));
        })
        .await;

    let provider = create_provider(&gemini_embedding(&server), &key()).unwrap();
    let err = provider.embed(&["text".to_string()]).await.unwrap_err();

    match err {
        PipelineError::EmbeddingService(message) => {
            assert!(message.contains("400"), "{}", message);
            assert!(message.contains("API key not valid"), "{}", message);
        }
        other => panic!("expected embedding error, got {:?}", other),
    }
}

#[tokio::test]
async fn gemini_generate_sends_temperature_and_returns_text() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .header("x-goog-api-key", "test-key")
                .body_includes("\"temperature\":0.3");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Beta is " }, { "text": "second." }] },
                    "finishReason": "STOP"
                }]
            }));
        })
        .await;

    let generator = create_generator(&gemini_generation(&server), &key()).unwrap();
    let text = generator.generate("prompt").await.unwrap();

    mock.assert_async().await;
    assert_eq!(text, "Beta is second.");
}

#[tokio::test]
async fn openai_compatible_endpoints_use_bearer_auth() {
    let server = MockServer::start_async().await;
    let embed_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .header("authorization", "Bearer test-key");
            then.status(200).json_body(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            }));
        })
        .await;
    let chat_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .body_includes("\"model\":\"gpt-4o-mini\"");
            then.status(200).json_body(json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "ok" } }]
            }));
        })
        .await;

    let embedding = EmbeddingConfig {
        provider: "openai".into(),
        model: "text-embedding-3-small".into(),
        base_url: Some(server.base_url()),
        ..EmbeddingConfig::default()
    };
    let generation = GenerationConfig {
        provider: "openai".into(),
        model: "gpt-4o-mini".into(),
        base_url: Some(server.base_url()),
        ..GenerationConfig::default()
    };

    let provider = create_provider(&embedding, &key()).unwrap();
    let vectors = provider
        .embed(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

    let generator = create_generator(&generation, &key()).unwrap();
    assert_eq!(generator.generate("prompt").await.unwrap(), "ok");

    embed_mock.assert_async().await;
    chat_mock.assert_async().await;
}

#[tokio::test]
async fn full_interaction_over_http() {
    let server = MockServer::start_async().await;
    let document_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:batchEmbedContents")
                .body_includes("RETRIEVAL_DOCUMENT");
            then.status(200)
                .json_body(json!({ "embeddings": [{ "values": [0.1, 0.2, 0.3] }] }));
        })
        .await;
    let query_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:batchEmbedContents")
                .body_includes("RETRIEVAL_QUERY");
            then.status(200)
                .json_body(json!({ "embeddings": [{ "values": [0.3, 0.2, 0.1] }] }));
        })
        .await;
    let generate_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .body_includes("Gamma.");
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Beta comes second." }] } }]
            }));
        })
        .await;

    let config = Config {
        embedding: gemini_embedding(&server),
        generation: gemini_generation(&server),
        ..Config::default()
    };
    let pipeline = Pipeline::http(config);
    let doc = Upload::new("alphabet.pdf", common::pdf_with_pages(&["Alpha. Beta. Gamma."]));
    let interaction = Interaction::new()
        .credential(Some(key()))
        .document(Some(doc))
        .query("What is Beta?");

    let (state, outcome) = handle_query(&pipeline, SessionState::new(), interaction).await;

    match outcome {
        Outcome::Answered { answer, sources } => {
            assert_eq!(answer, "Beta comes second.");
            assert_eq!(sources.len(), 1);
        }
        other => panic!("expected an answer, got {:?}", other),
    }
    document_mock.assert_hits_async(1).await;
    query_mock.assert_hits_async(1).await;
    generate_mock.assert_async().await;
    assert_eq!(state.history.len(), 1);
}
