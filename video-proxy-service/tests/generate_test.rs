mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{test_config, TestApp, PROVIDER_PATH, TEST_API_KEY};
use serde_json::{json, Value};
use std::time::Duration;
use video_proxy_service::config::{AuthScheme, BinaryPolicy};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

async fn provider() -> MockServer {
    MockServer::start().await
}

async fn json_body(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    (status, response.json().await.expect("Failed to parse JSON"))
}

#[tokio::test]
async fn blank_prompt_is_rejected_without_calling_the_provider() {
    let server = provider().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    for body in [json!({}), json!({ "prompt": "   " }), json!({ "prompt": "" })] {
        let (status, body) = json_body(app.generate(&body).await).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "prompt_required");
    }
}

#[tokio::test]
async fn malformed_body_is_a_json_bad_request() {
    let server = provider().await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    let response = app
        .client
        .post(format!("{}/generate", app.address))
        .header("content-type", "application/json")
        .body("{\"prompt\": ")
        .send()
        .await
        .unwrap();

    let (status, body) = json_body(response).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_json");
}

#[tokio::test]
async fn array_body_is_rejected_without_calling_the_provider() {
    let server = provider().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    let (status, body) = json_body(app.generate(&json!(["a fox", 99])).await).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_json");
}

#[tokio::test]
async fn missing_key_is_reported_without_calling_the_provider() {
    let server = provider().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut config = test_config(&server.uri());
    config.provider.api_key = None;
    let app = TestApp::spawn(config).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "missing_fal_key");
}

#[tokio::test]
async fn prompt_is_checked_before_configuration() {
    let server = provider().await;
    let mut config = test_config(&server.uri());
    config.provider.api_key = None;
    let app = TestApp::spawn(config).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": " " })).await).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "prompt_required");
}

#[tokio::test]
async fn provider_failure_status_and_text_are_relayed() {
    let server = provider().await;
    Mock::given(method("POST"))
        .and(path(PROVIDER_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is warming up"))
        .expect(1)
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "provider_error");
    assert_eq!(body["status"], 503);
    assert_eq!(body["detail"], "model is warming up");
}

#[tokio::test]
async fn payload_carries_defaults_clamped_duration_and_options() {
    let server = provider().await;
    Mock::given(method("POST"))
        .and(path(PROVIDER_PATH))
        .and(header("content-type", "application/json"))
        .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
        .and(body_partial_json(json!({
            "model": "pika-v2.2",
            "prompt": "a fox in the snow",
            "duration": 30,
            "style": "cinematic",
            "aspect_ratio": "16:9",
            "options": { "voice": "calm", "seed": 11 }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "video_url": "https://cdn/v.mp4" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    let (status, body) = json_body(
        app.generate(&json!({
            "prompt": "  a fox in the snow ",
            "duration": 99,
            "voice": "calm",
            "options": { "seed": 11 }
        }))
        .await,
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["video"], "https://cdn/v.mp4");
}

#[tokio::test]
async fn unknown_top_level_fields_are_not_forwarded() {
    let server = provider().await;
    Mock::given(method("POST"))
        .and(path(PROVIDER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "video": "https://v" })))
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    app.generate(&json!({ "prompt": "x", "webhook": "https://evil" }))
        .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(sent.get("webhook").is_none());
    assert_eq!(sent["duration"], 8);
}

#[tokio::test]
async fn key_auth_scheme_is_configurable() {
    let server = provider().await;
    Mock::given(method("POST"))
        .and(header("authorization", format!("Key {}", TEST_API_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "video_url": "https://v" })))
        .expect(1)
        .mount(&server)
        .await;
    let mut config = test_config(&server.uri());
    config.provider.auth_scheme = AuthScheme::Key;
    let app = TestApp::spawn(config).await;

    let (status, _) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 200);
}

#[tokio::test]
async fn nested_video_url_is_returned_with_raw_json() {
    let server = provider().await;
    let provider_json = json!({ "result": { "video_url": "https://x/y.mp4" }, "id": "job-1" });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_json.clone()))
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 200);
    assert_eq!(body["video"], "https://x/y.mp4");
    assert_eq!(body["raw"], provider_json);
}

#[tokio::test]
async fn json_without_video_url_yields_null_video() {
    let server = provider().await;
    let provider_json = json!({ "status": "IN_QUEUE", "request_id": "abc" });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_json.clone()))
        .mount(&server)
        .await;
    let app = TestApp::spawn(test_config(&server.uri())).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "video": null, "raw": provider_json }));
}

#[tokio::test]
async fn binary_video_becomes_a_data_uri_for_every_size() {
    for len in [0usize, 1, 4096, 300_001] {
        let server = provider().await;
        let video: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(video.clone(), "video/mp4"))
            .mount(&server)
            .await;
        let app = TestApp::spawn(test_config(&server.uri())).await;

        let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

        assert_eq!(status, 200);
        let uri = body["video"].as_str().unwrap();
        let encoded = uri.strip_prefix("data:video/mp4;base64,").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded.len(), len);
        assert_eq!(decoded, video);
    }
}

#[tokio::test]
async fn stream_mode_forwards_exact_bytes() {
    for len in [0usize, 10, 250_000] {
        let server = provider().await;
        let video = vec![0xABu8; len];
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(video.clone(), "video/mp4"))
            .mount(&server)
            .await;
        let mut config = test_config(&server.uri());
        config.provider.binary_policy = BinaryPolicy::Stream;
        let app = TestApp::spawn(config).await;

        let response = app.generate(&json!({ "prompt": "a fox" })).await;

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.headers()["content-type"], "video/mp4");
        assert!(response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment"));
        let bytes = response.bytes().await.unwrap();
        assert_eq!(bytes.len(), len);
        assert_eq!(bytes.as_ref(), video.as_slice());
    }
}

#[tokio::test]
async fn stream_mode_still_wraps_json_replies() {
    let server = provider().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "video_url": "https://v" })))
        .mount(&server)
        .await;
    let mut config = test_config(&server.uri());
    config.provider.binary_policy = BinaryPolicy::Stream;
    let app = TestApp::spawn(config).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 200);
    assert_eq!(body["video"], "https://v");
}

#[tokio::test]
async fn slow_provider_times_out_as_provider_error() {
    let server = provider().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "video_url": "https://late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let mut config = test_config(&server.uri());
    config.provider.timeout = Duration::from_millis(300);
    let app = TestApp::spawn(config).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "provider_error");
    assert!(body.get("status").is_none());
}

#[tokio::test]
async fn unreachable_provider_is_a_server_error() {
    // Nothing listens on the discard port.
    let app = TestApp::spawn(test_config("http://127.0.0.1:9")).await;

    let (status, body) = json_body(app.generate(&json!({ "prompt": "a fox" })).await).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "server_error");
    assert!(body["detail"].as_str().is_some());

    // The server keeps serving after a failed request.
    assert_eq!(app.get("/ping").await.status().as_u16(), 200);
}

/// Answers with a URL derived from the prompt it received.
struct EchoPrompt;

impl Respond for EchoPrompt {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let prompt = body["prompt"].as_str().unwrap_or("missing");
        ResponseTemplate::new(200)
            .set_body_json(json!({ "video_url": format!("https://cdn/{}.mp4", prompt) }))
            .set_delay(Duration::from_millis(20))
    }
}

#[tokio::test]
async fn concurrent_requests_get_their_own_responses() {
    let server = provider().await;
    Mock::given(method("POST"))
        .respond_with(EchoPrompt)
        .expect(32)
        .mount(&server)
        .await;
    let app = std::sync::Arc::new(TestApp::spawn(test_config(&server.uri())).await);

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let prompt = format!("clip-{}", i);
                let (status, body) = json_body(app.generate(&json!({ "prompt": prompt })).await).await;
                (prompt, status, body)
            })
        })
        .collect();

    for task in tasks {
        let (prompt, status, body) = task.await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body["video"], format!("https://cdn/{}.mp4", prompt));
    }
}
