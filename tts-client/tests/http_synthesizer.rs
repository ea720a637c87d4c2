//! Mock HTTP server tests for `HttpSynthesizer::synthesize()`.
//!
//! Uses [`wiremock`] to stand up a local endpoint that behaves like the
//! synthesis proxy: JSON `{"text": ...}` in, raw audio bytes out.

use std::time::Duration;

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tts_client::{
    ClientConfig, HttpSynthesizer, SpeechSynthesizer, SynthesisError, SynthesisRequest,
    get_synthesizer,
};

fn synthesizer_for(server: &MockServer) -> HttpSynthesizer {
    let config = ClientConfig::with_endpoint(format!("{}/api/tts/generate", server.uri()));
    HttpSynthesizer::new(config).unwrap()
}

#[tokio::test]
async fn synthesize_returns_audio_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tts/generate"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(serde_json::json!({ "text": "Hello world." })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "audio/mpeg")
                .set_body_bytes(vec![0xFF, 0xFB, 0x90, 0x00]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let synth = synthesizer_for(&server);
    let audio = synth
        .synthesize(SynthesisRequest::new("Hello world."))
        .await
        .unwrap();

    assert_eq!(audio.bytes, vec![0xFF, 0xFB, 0x90, 0x00]);
    assert_eq!(audio.content_type, "audio/mpeg");
    assert_eq!(audio.extension(), "mp3");
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({ "error": "Failed to generate speech" })),
        )
        .mount(&server)
        .await;

    let err = synthesizer_for(&server)
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Status { status_code: 500 }));
    assert!(err.is_server_error());
}

#[tokio::test]
async fn client_error_maps_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = synthesizer_for(&server)
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Status { status_code: 404 }));
    assert!(!err.is_server_error());
}

#[tokio::test]
async fn json_success_body_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "success": true, "message": "Test response" })),
        )
        .mount(&server)
        .await;

    let err = synthesizer_for(&server)
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    match err {
        SynthesisError::UnexpectedContentType(ct) => assert!(ct.starts_with("application/json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_audio_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "audio/mpeg"))
        .mount(&server)
        .await;

    let err = synthesizer_for(&server)
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::EmptyAudio));
}

#[tokio::test]
async fn oversized_audio_body_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "audio/wav")
                .set_body_bytes(vec![0u8; 64]),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        max_audio_bytes: 16,
        ..ClientConfig::with_endpoint(format!("{}/api/tts/generate", server.uri()))
    };
    let err = HttpSynthesizer::new(config)
        .unwrap()
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::TooLarge { limit: 16 }));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "audio/mpeg")
                .set_body_bytes(vec![1, 2, 3])
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        timeout_secs: 1,
        ..ClientConfig::with_endpoint(format!("{}/api/tts/generate", server.uri()))
    };
    let err = HttpSynthesizer::new(config)
        .unwrap()
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Timeout { seconds: 1 }));
}

#[tokio::test]
async fn connection_refused_is_a_request_error() {
    // Bind then drop a listener to get a port nothing is serving on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let synth = get_synthesizer(&ClientConfig::with_endpoint(format!(
        "http://127.0.0.1:{port}/api/tts/generate"
    )))
    .unwrap();
    let err = synth
        .synthesize(SynthesisRequest::new("Hello."))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Request(_)));
}

#[test]
fn get_synthesizer_validates_config() {
    let result = get_synthesizer(&ClientConfig::with_endpoint("localhost:5001"));
    assert!(matches!(result, Err(SynthesisError::Config(_))));
}
