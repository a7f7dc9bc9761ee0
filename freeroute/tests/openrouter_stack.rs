//! End-to-end waterfall runs against a local OpenRouter-shaped HTTP server.
//!
//! The server answers `GET /api/v1/models[?category=..]` and `POST /api/v1/chat/completions`,
//! replying per model id, so catalog fetch, ranking, disk caching and the gateway all run
//! through their real HTTP implementations.


use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use freeroute::{CompletionOptions, Message, Waterfall, WaterfallError};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn read_http_request(stream: &mut TcpStream) -> (String, String) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = stream.read(&mut tmp).await.unwrap();
        if n == 0 {
            return (String::from_utf8_lossy(&buf).to_string(), String::new());
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let header_end = pos + 4;
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            let mut body = buf[header_end..].to_vec();
            while body.len() < content_length {
                let m = stream.read(&mut tmp).await.unwrap();
                if m == 0 {
                    break;
                }
                body.extend_from_slice(&tmp[..m]);
            }
            return (head, String::from_utf8_lossy(&body).to_string());
        }
    }
}

async fn write_http_response(stream: &mut TcpStream, status: &str, body: &str) {
    let resp = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(resp.as_bytes()).await.unwrap();
}

/// Canned upstream. `None` catalogs answer 500; chat replies default to 503.
#[derive(Clone, Default)]
struct Upstream {
    tagged: Option<Value>,
    all: Option<Value>,
    replies: HashMap<String, String>,
}

struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    async fn start(upstream: Upstream) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let (head, body) = read_http_request(&mut stream).await;
                let line = head.lines().next().unwrap_or_default().to_string();
                let (status, reply) = route(&upstream, &line, &body);
                log.lock().unwrap().push(summarize(&line, &body));
                write_http_response(&mut stream, status, &reply).await;
            }
        });
        Self {
            base_url: format!("http://{}/api/v1", addr),
            requests,
            handle,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn route(upstream: &Upstream, line: &str, body: &str) -> (&'static str, String) {
    let catalog = |data: &Option<Value>| match data {
        Some(models) => ("200 OK", json!({ "data": models }).to_string()),
        None => ("500 Internal Server Error", r#"{"error":"down"}"#.to_string()),
    };
    if line.starts_with("GET /api/v1/models?category=") {
        return catalog(&upstream.tagged);
    }
    if line.starts_with("GET /api/v1/models ") {
        return catalog(&upstream.all);
    }
    if line.starts_with("POST /api/v1/chat/completions") {
        let model = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["model"].as_str().map(str::to_string))
            .unwrap_or_default();
        return match upstream.replies.get(&model) {
            Some(text) => (
                "200 OK",
                json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
                    .to_string(),
            ),
            None => ("503 Service Unavailable", r#"{"error":"busy"}"#.to_string()),
        };
    }
    ("404 Not Found", "{}".to_string())
}

/// `GET /models?category=roleplay`, `GET /models` or `POST chat <model>`.
fn summarize(line: &str, body: &str) -> String {
    let target = line.split_whitespace().nth(1).unwrap_or_default();
    if line.starts_with("POST") {
        let model = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["model"].as_str().map(str::to_string))
            .unwrap_or_default();
        format!("POST chat {}", model)
    } else {
        format!("GET {}", target.trim_start_matches("/api/v1"))
    }
}

fn free_text_model(id: &str, created: i64, context_length: u64) -> Value {
    json!({
        "id": id,
        "created": created,
        "context_length": context_length,
        "pricing": { "prompt": "0", "completion": "0" },
        "architecture": { "output_modalities": ["text"] }
    })
}

fn waterfall(server: &MockServer, cache_path: &Path, api_key: Option<&str>) -> Waterfall {
    let mut env: HashMap<&str, String> = HashMap::new();
    env.insert(env_config::ENV_BASE_URL, server.base_url.clone());
    env.insert(env_config::ENV_CACHE_PATH, cache_path.display().to_string());
    env.insert(env_config::ENV_FALLBACK_MODEL, "backup/model:free".into());
    env.insert(env_config::ENV_TIMEOUT_SECS, "5".into());
    if let Some(key) = api_key {
        env.insert(env_config::ENV_API_KEY, key.to_string());
    }
    let settings = env_config::Settings::from_lookup(|k| env.get(k).cloned());
    Waterfall::from_settings(&settings)
}

fn ask() -> Vec<Message> {
    vec![Message::system("Be brief."), Message::user("Hello?")]
}

#[tokio::test]
async fn ranked_models_are_tried_in_order_and_cached() {
    let upstream = Upstream {
        tagged: Some(json!([free_text_model("vendor/rp:free", 100, 8192)])),
        all: Some(json!([
            free_text_model("vendor/rp:free", 100, 8192),
            free_text_model("vendor/new:free", 200, 4096),
            {
                "id": "vendor/paid",
                "created": 300,
                "pricing": { "prompt": "0.000001", "completion": "0.000002" },
                "architecture": { "output_modalities": ["text"] }
            },
            {
                "id": "vendor/painter:free",
                "created": 400,
                "pricing": { "prompt": "0", "completion": "0" },
                "architecture": { "output_modalities": ["image"] }
            }
        ])),
        replies: HashMap::from([("vendor/new:free".to_string(), "Hi!".to_string())]),
    };
    let server = MockServer::start(upstream).await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("models.json");
    let wf = waterfall(&server, &cache_path, Some("sk-test"));

    let done = wf.complete(&ask(), &CompletionOptions::default()).await.unwrap();
    assert_eq!(done.text, "Hi!");
    assert_eq!(done.model, "vendor/new:free");

    let requests = server.requests();
    assert!(requests.contains(&"GET /models?category=roleplay".to_string()));
    assert!(requests.contains(&"GET /models".to_string()));
    let chats: Vec<&String> = requests.iter().filter(|r| r.starts_with("POST")).collect();
    assert_eq!(
        chats,
        vec!["POST chat vendor/rp:free", "POST chat vendor/new:free"]
    );

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(on_disk["models"], json!(["vendor/rp:free", "vendor/new:free"]));
    assert!(on_disk["fetchedAt"].is_i64());

    // Second run is served from the in-process mirror.
    let before = server.requests().len();
    wf.complete(&ask(), &CompletionOptions::default()).await.unwrap();
    let catalog_calls = server.requests()[before..]
        .iter()
        .filter(|r| r.starts_with("GET"))
        .count();
    assert_eq!(catalog_calls, 0);
}

#[tokio::test]
async fn catalog_outage_falls_back_to_configured_model() {
    let upstream = Upstream {
        replies: HashMap::from([("backup/model:free".to_string(), "fallback here".to_string())]),
        ..Upstream::default()
    };
    let server = MockServer::start(upstream).await;
    let dir = tempfile::tempdir().unwrap();
    let wf = waterfall(&server, &dir.path().join("models.json"), Some("sk-test"));

    let done = wf.complete(&ask(), &CompletionOptions::default()).await.unwrap();
    assert_eq!(done.model, "backup/model:free");
    assert_eq!(done.text, "fallback here");
    assert!(!dir.path().join("models.json").exists());
}

#[tokio::test]
async fn every_model_failing_reports_all_attempts() {
    let upstream = Upstream {
        tagged: Some(json!([])),
        all: Some(json!([free_text_model("vendor/a:free", 10, 1000)])),
        replies: HashMap::new(),
    };
    let server = MockServer::start(upstream).await;
    let dir = tempfile::tempdir().unwrap();
    let wf = waterfall(&server, &dir.path().join("models.json"), Some("sk-test"));

    let err = wf.complete(&ask(), &CompletionOptions::default()).await.unwrap_err();
    match err {
        WaterfallError::Exhausted { attempts } => {
            let ids: Vec<&str> = attempts.iter().map(|a| a.model.as_str()).collect();
            assert_eq!(ids, vec!["vendor/a:free", "backup/model:free"]);
            assert!(attempts.iter().all(|a| a.reason.contains("503")));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_key_touches_nothing() {
    let server = MockServer::start(Upstream::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let wf = waterfall(&server, &dir.path().join("models.json"), None);

    let err = wf.complete(&ask(), &CompletionOptions::default()).await.unwrap_err();
    assert_eq!(err, WaterfallError::MissingCredential);
    assert!(server.requests().is_empty());
}
