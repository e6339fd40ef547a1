use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use logo_studio::gemini::{GeminiConnector, GeminiSettings};
use logo_studio::generation::GenerationClient;
use logo_studio::key_gate::KeyGate;
use logo_studio::key_host::{HostKeyStore, KeyCapability};
use logo_studio::server::{AppServer, AppState};
use logo_studio::studio::LogoStudio;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGNgYGBgAAAABQABpfZFQAAAAABJRU5ErkJggg==";
pub const TEST_KEY: &str = "test-gemini-key";

static NEXT_FIXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub enum FakeReply {
    Image,
    NoCandidates,
    Status(u16, Value),
}

/// Stand-in for the Gemini endpoint; records what it was sent.
pub struct FakeProvider {
    pub reply: Mutex<FakeReply>,
    pub hits: AtomicUsize,
    pub last_key: Mutex<Option<String>>,
    pub last_path: Mutex<Option<String>>,
    pub last_body: Mutex<Option<Value>>,
}

impl FakeProvider {
    pub fn set_reply(&self, reply: FakeReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn fake_generate(
    State(fake): State<Arc<FakeProvider>>,
    headers: HeaderMap,
    uri: Uri,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.hits.fetch_add(1, Ordering::SeqCst);
    *fake.last_key.lock().unwrap() = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    *fake.last_path.lock().unwrap() = Some(uri.path().to_string());
    *fake.last_body.lock().unwrap() = Some(body);

    let reply = fake.reply.lock().unwrap().clone();
    match reply {
        FakeReply::Image => (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            {"text": "Here is your logo."},
                            {"inlineData": {"mimeType": "image/png", "data": PNG_BASE64}}
                        ]
                    },
                    "finishReason": "STOP"
                }]
            })),
        ),
        FakeReply::NoCandidates => (StatusCode::OK, Json(json!({ "candidates": [] }))),
        FakeReply::Status(status, body) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(body),
        ),
    }
}

pub struct TestEnv {
    pub base: PathBuf,
    pub key_file: PathBuf,
    pub fake: Arc<FakeProvider>,
    pub http: reqwest::Client,
    pub server: AppServer,
}

impl TestEnv {
    /// Starts a fake provider on the current runtime and the studio server on
    /// its own thread. `with_key` decides whether the key file exists.
    pub async fn start(with_key: bool) -> Self {
        let base = fixture_base();
        let key_file = base.join("api_key.txt");
        if with_key {
            fs::write(&key_file, format!("{TEST_KEY}\n")).expect("write key file");
        }

        let fake = Arc::new(FakeProvider {
            reply: Mutex::new(FakeReply::Image),
            hits: AtomicUsize::new(0),
            last_key: Mutex::new(None),
            last_path: Mutex::new(None),
            last_body: Mutex::new(None),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake provider");
        let fake_addr = listener.local_addr().expect("fake provider addr");
        let router = Router::new().fallback(fake_generate).with_state(fake.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let capability: Arc<dyn KeyCapability> =
            Arc::new(HostKeyStore::new(None, Some(key_file.clone())));
        let settings = GeminiSettings {
            api_base_url: format!("http://{fake_addr}"),
            model: "gemini-3-pro-image-preview".to_string(),
        };
        let gate = KeyGate::new(Some(capability.clone()));
        let client = GenerationClient::new(
            Some(capability),
            Arc::new(GeminiConnector::new(settings)),
            "1K",
        );
        let state = Arc::new(AppState::new(LogoStudio::new(gate, client)));
        let server = AppServer::start(state, free_port()).expect("start studio server");

        Self {
            base,
            key_file,
            fake,
            http: reqwest::Client::new(),
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.server.port(), path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let res = self.http.get(self.url(path)).send().await.expect("GET");
        let status = res.status().as_u16();
        (status, res.json().await.expect("json body"))
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST");
        let status = res.status().as_u16();
        (status, res.json().await.expect("json body"))
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.base).ok();
    }
}

pub fn form(brand_name: &str) -> Value {
    json!({
        "brand_name": brand_name,
        "slogan": "",
        "style": "Modern & Tech",
        "colors": "",
        "icon_symbol": "",
    })
}

fn fixture_base() -> PathBuf {
    let mut base = std::env::temp_dir();
    let sequence = NEXT_FIXTURE_ID.fetch_add(1, Ordering::Relaxed);
    base.push(format!(
        "logo_studio_flow_test_{}_{}",
        std::process::id(),
        sequence
    ));
    let _ = fs::remove_dir_all(&base);
    fs::create_dir_all(&base).expect("mkdir fixture");
    base
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("find free port")
}
