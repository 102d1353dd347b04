use providers::{ChatBackend, OllamaClient};
use shared::agent_api::{BackendKind, ConversationTurn, ImageAttachment, PersonaConfig};
use std::io::Read;
use std::net::TcpListener;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Serve every request with a fixed status and body, reporting (path, body).
fn fake_ollama(status: u16, body: &'static str) -> (String, mpsc::Receiver<(String, String)>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut captured = String::new();
            request.as_reader().read_to_string(&mut captured).unwrap();
            let _ = tx.send((request.url().to_string(), captured));
            let _ = request.respond(tiny_http::Response::from_string(body).with_status_code(status));
        }
    });
    (format!("http://127.0.0.1:{}", port), rx)
}

fn persona() -> PersonaConfig {
    PersonaConfig {
        id: "grdviz".into(),
        display_name: "GRDVIZ (Vision Core)".into(),
        backend_model: "llava:latest".into(),
        system_prompt: "You are GRDVIZ.".into(),
        temperature: 0.5,
        max_tokens: 2048,
        description: String::new(),
    }
}

#[tokio::test]
async fn test_chat_round_trip() {
    let (base, rx) = fake_ollama(
        200,
        r#"{"model":"llava:latest","message":{"role":"assistant","content":"hello"},"done":true}"#,
    );
    let client = OllamaClient::new(&base).unwrap();
    let conversation = vec![ConversationTurn::user("describe this")
        .with_image(ImageAttachment::DataUri("data:image/png;base64,iVBORw0K".into()))];

    let reply = client
        .send(&conversation, &persona(), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply.content, "hello");
    assert_eq!(reply.backend, BackendKind::Local);
    assert_eq!(reply.model, "llava:latest");

    let (path, body) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(path, "/api/chat");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["model"], "llava:latest");
    assert_eq!(json["stream"], false);
    assert_eq!(json["options"]["temperature"], 0.5);
    assert_eq!(json["options"]["num_predict"], 2048);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "You are GRDVIZ.");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["messages"][1]["images"][0], "iVBORw0K");
}

#[tokio::test]
async fn test_empty_reply_is_success() {
    let (base, _rx) = fake_ollama(200, r#"{"message":{"role":"assistant","content":""}}"#);
    let client = OllamaClient::new(&base).unwrap();

    let reply = client
        .send(&[ConversationTurn::user("hi")], &persona(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(reply.content, "");
}

#[tokio::test]
async fn test_non_success_status_is_backend_error() {
    let (base, _rx) = fake_ollama(500, r#"{"error":"model not found"}"#);
    let client = OllamaClient::new(&base).unwrap();

    let err = client
        .send(&[ConversationTurn::user("hi")], &persona(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.backend, BackendKind::Local);
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_unparseable_reply_is_backend_error() {
    let (base, _rx) = fake_ollama(200, "<html>proxy login</html>");
    let client = OllamaClient::new(&base).unwrap();

    let err = client
        .send(&[ConversationTurn::user("hi")], &persona(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unexpected Ollama reply shape"));
}

#[tokio::test]
async fn test_connection_refused_is_backend_error() {
    // Bind then drop to get a port nothing listens on
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let client = OllamaClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();

    let result = client
        .send(&[ConversationTurn::user("hi")], &persona(), Duration::from_secs(5))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // Accepts connections at the socket level but never answers
    let silent = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();
    let client = OllamaClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();

    let started = Instant::now();
    let err = client
        .send(&[ConversationTurn::user("hi")], &persona(), Duration::from_millis(1))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(err.to_string().contains("no reply within 1ms"));
    drop(silent);
}

#[tokio::test]
async fn test_status_lists_models() {
    let (base, rx) = fake_ollama(
        200,
        r#"{"models":[{"name":"llama3.3:latest","size":1},{"name":"llava:latest"}]}"#,
    );
    let client = OllamaClient::new(&base).unwrap();

    let status = client.status().await;
    assert!(status.available);
    assert_eq!(status.models, vec!["llama3.3:latest", "llava:latest"]);
    assert_eq!(status.url, base);

    let (path, _) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(path, "/api/tags");
}

#[tokio::test]
async fn test_status_when_down() {
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let client = OllamaClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();

    let status = client.status().await;
    assert!(!status.available);
    assert!(status.models.is_empty());
    assert!(status.error.unwrap().contains("Ollama not running"));
}
