// ABOUTME: Minimal HTTP/1.1 server standing in for the platform API and template repository.
// ABOUTME: Records each request and answers with a caller-supplied envelope.

use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

/// HTTP status and body to send back.
pub type Reply = (u16, String);

type Responder = dyn Fn(&Recorded) -> Reply + Send + Sync;

pub struct FakePlatform {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: JoinHandle<()>,
}

impl FakePlatform {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let log = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let log = Arc::clone(&log);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    serve(stream, log, responder).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// A platform that accepts everything.
    pub async fn accepting() -> Self {
        Self::start(caprover_ok).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.path.clone()).collect()
    }
}

impl Drop for FakePlatform {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Build a platform response envelope.
pub fn envelope(status: i64, data: Value) -> Reply {
    let body = json!({
        "status": status,
        "description": if status == 100 { "OK" } else { "Something went wrong" },
        "data": data,
    });
    (200, body.to_string())
}

/// Default answers: a token on login, a root domain on system info, OK otherwise.
pub fn caprover_ok(request: &Recorded) -> Reply {
    match request.path.as_str() {
        "/api/v2/login" => envelope(100, json!({ "token": "test-token" })),
        "/api/v2/user/system/info" => envelope(100, json!({ "rootDomain": "apps.example.com" })),
        _ => envelope(100, json!({})),
    }
}

async fn serve(stream: TcpStream, log: Arc<Mutex<Vec<Recorded>>>, responder: Arc<Responder>) {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut raw = vec![0u8; length];
    if length > 0 && reader.read_exact(&mut raw).await.is_err() {
        return;
    }
    let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

    let request = Recorded {
        method,
        path,
        headers,
        body,
    };
    let (status, reply) = responder(&request);
    log.lock().push(request);

    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Serves a `/v2` one-click app repository holding the shared `web-db` template.
pub fn template_repository(request: &Recorded) -> Reply {
    match request.path.as_str() {
        "/v2/list" => (
            200,
            json!({
                "appList": [
                    "web-db",
                    { "name": "adminer", "displayName": "Adminer", "description": "Database UI" },
                ]
            })
            .to_string(),
        ),
        "/v2/apps/web-db.json" => {
            let template: Value = serde_yaml::from_str(super::WEB_DB_TEMPLATE).unwrap();
            (200, template.to_string())
        }
        _ => (404, "Not Found".to_string()),
    }
}
