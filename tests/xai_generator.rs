//! XaiGenerator against a local chat-completions stand-in.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use gist_ai::{
    config::Config,
    generator::{NewsGenerator, XaiGenerator},
    NewsError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct MockXai {
    headlines_reply: Arc<String>,
    fail_articles: bool,
    reply_delay: Option<Duration>,
    requests: Arc<AtomicUsize>,
}

fn reply(content: &str) -> Json<Value> {
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

async fn chat_completions(
    State(mock): State<MockXai>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = mock.reply_delay {
        tokio::time::sleep(delay).await;
    }

    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    assert_eq!(request["search_parameters"]["mode"], "on");

    let prompt = request["messages"][0]["content"].as_str().unwrap_or_default();
    if prompt.contains("JSON array") {
        return reply(&mock.headlines_reply).into_response();
    }
    if mock.fail_articles {
        return (StatusCode::SERVICE_UNAVAILABLE, "overloaded").into_response();
    }
    reply("  Opening paragraph.\n\nClosing paragraph.\n").into_response()
}

/// Serves the mock on an ephemeral port and returns its base URL.
async fn spawn_mock(mock: MockXai) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn generator_for(base_url: &str, api_key: &str) -> XaiGenerator {
    generator_with_timeout(base_url, api_key, 10)
}

fn generator_with_timeout(base_url: &str, api_key: &str, timeout_secs: u64) -> XaiGenerator {
    let config = Config::from_lookup(|key| match key {
        "XAI_BASE_URL" => Some(base_url.to_string()),
        "XAI_HEADLINE_COUNT" => Some("3".to_string()),
        "XAI_ARTICLE_CONCURRENCY" => Some("2".to_string()),
        "XAI_TIMEOUT_SECS" => Some(timeout_secs.to_string()),
        "XAI_REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    });
    XaiGenerator::from_config(&config, api_key.to_string()).unwrap()
}

fn mock(headlines_reply: &str, fail_articles: bool) -> MockXai {
    MockXai {
        headlines_reply: Arc::new(headlines_reply.to_string()),
        fail_articles,
        reply_delay: None,
        requests: Arc::new(AtomicUsize::new(0)),
    }
}

#[tokio::test]
async fn test_generates_one_article_per_headline() {
    let server = mock(
        "```json\n[\
         {\"id\": \"article-1\", \"title\": \"Markets rally\", \"category\": \"Business\"},\
         {\"id\": 2, \"title\": \"Storm makes landfall\"},\
         {\"title\": \"Parliament votes\", \"category\": \"Politics\"}\
         ]\n```",
        false,
    );
    let requests = server.requests.clone();
    let base_url = spawn_mock(server).await;

    let snapshot = generator_for(&base_url, "test-key").generate().await.unwrap();

    let ids: Vec<&str> = snapshot.headlines().iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["article-1", "2", "article-3"]);
    assert_eq!(snapshot.headlines()[1].category, "News");
    assert_eq!(snapshot.articles().len(), 3);

    let article = snapshot.article("article-3").unwrap();
    assert_eq!(article.headline.title, "Parliament votes");
    assert_eq!(article.content, "Opening paragraph.\n\nClosing paragraph.");
    assert!(!article.headline.published_at.is_empty());

    // One headline call plus one call per article.
    assert_eq!(requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_article_failure_fails_the_whole_batch() {
    let base_url = spawn_mock(mock(
        r#"[{"id": "a", "title": "One"}, {"id": "b", "title": "Two"}]"#,
        true,
    ))
    .await;

    let err = generator_for(&base_url, "test-key").generate().await.unwrap_err();
    match err {
        NewsError::GenerationFailed(detail) => assert!(detail.contains("503")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_key_is_a_generation_failure() {
    let base_url = spawn_mock(mock("[]", false)).await;

    let err = generator_for(&base_url, "wrong-key").generate().await.unwrap_err();
    assert!(matches!(err, NewsError::GenerationFailed(_)));
}

#[tokio::test]
async fn test_reply_without_headlines_is_malformed() {
    let base_url = spawn_mock(mock("Sorry, I can't help with that.", false)).await;

    let err = generator_for(&base_url, "test-key").generate().await.unwrap_err();
    assert!(matches!(err, NewsError::MalformedOutput(_)));
}

#[tokio::test]
async fn test_slow_upstream_hits_the_generation_timeout() {
    let base_url = spawn_mock(MockXai {
        reply_delay: Some(Duration::from_secs(5)),
        ..mock(r#"[{"id": "a", "title": "One"}]"#, false)
    })
    .await;

    let started = Instant::now();
    let err = generator_with_timeout(&base_url, "test-key", 1)
        .generate()
        .await
        .unwrap_err();

    assert!(matches!(err, NewsError::GenerationTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_citation_markers_before_the_array_are_ignored() {
    let base_url = spawn_mock(mock(
        "Top stories today [1][2]:\n```json\n[{\"id\": \"a\", \"title\": \"One\"}]\n```\nSources: [1] wire, [2] paper",
        false,
    ))
    .await;

    let snapshot = generator_for(&base_url, "test-key").generate().await.unwrap();
    assert_eq!(snapshot.headlines().len(), 1);
    assert_eq!(snapshot.headlines()[0].title, "One");
}
