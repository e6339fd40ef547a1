use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;

use crate::error::LogoError;
use crate::logo::{GenerationPhase, LogoRequest, LogoStyle};
use crate::main_ui_html::build_main_ui_html;
use crate::studio::{LogoStudio, StudioSnapshot};

pub struct AppState {
    pub studio: LogoStudio,
    pub server_port: AtomicU16,
}

type ApiResponse = (StatusCode, Json<Value>);

impl AppState {
    pub fn new(studio: LogoStudio) -> Self {
        Self {
            studio,
            server_port: AtomicU16::new(0),
        }
    }
}

pub struct AppServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl AppServer {
    pub fn start(state: Arc<AppState>, preferred_port: u16) -> Result<Self> {
        let listener = bind_listener(preferred_port)?;
        let port = listener
            .local_addr()
            .context("failed to inspect server local address")?
            .port();
        listener
            .set_nonblocking(true)
            .context("failed to set listener non-blocking")?;

        state.server_port.store(port, Ordering::Relaxed);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread_handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();
            let runtime = match runtime {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::error!("failed to build server runtime: {err}");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        tracing::error!("failed to adopt listener: {err}");
                        return;
                    }
                };

                let app = build_router(state);
                let server = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                });
                if let Err(err) = server.await {
                    tracing::error!("server stopped with error: {err}");
                }
            });
        });

        tracing::info!(port, "server listening on 127.0.0.1");
        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Serialize)]
struct LogoView {
    image_data: String,
    prompt_text: String,
    created_at: String,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateReq {
    #[serde(default)]
    brand_name: String,
    #[serde(default)]
    slogan: String,
    #[serde(default)]
    style: String,
    #[serde(default)]
    colors: String,
    #[serde(default)]
    icon_symbol: String,
}

impl GenerateReq {
    fn into_logo_request(self) -> std::result::Result<LogoRequest, String> {
        let style = if self.style.trim().is_empty() {
            LogoStyle::default()
        } else {
            LogoStyle::from_label(&self.style)
                .ok_or_else(|| format!("unknown style: {}", self.style.trim()))?
        };

        Ok(LogoRequest::new(self.brand_name, style)
            .with_slogan(self.slogan)
            .with_colors(self.colors)
            .with_icon_symbol(self.icon_symbol))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let port = state.server_port.load(Ordering::Relaxed);
    let mut origins = vec![HeaderValue::from_static("null")];
    for host in ["127.0.0.1", "localhost"] {
        if let Ok(origin) = HeaderValue::from_str(&format!("http://{host}:{port}")) {
            origins.push(origin);
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(get_main_page))
        .route("/ping", get(get_ping))
        .route("/app/init", get(get_app_init))
        .route("/app/verify-key", post(post_app_verify_key))
        .route("/app/select-key", post(post_app_select_key))
        .route("/app/generate", post(post_app_generate))
        .route("/app/cancel", post(post_app_cancel))
        .route("/app/new-design", post(post_app_new_design))
        .layer(cors)
        .with_state(state)
}

async fn get_main_page() -> Html<String> {
    Html(build_main_ui_html())
}

async fn get_ping() -> ApiResponse {
    ok_json(json!({}))
}

async fn get_app_init(State(state): State<Arc<AppState>>) -> ApiResponse {
    let snapshot = state.studio.ensure_key_checked().await;
    ok_snapshot(snapshot)
}

async fn post_app_verify_key(State(state): State<Arc<AppState>>) -> ApiResponse {
    let snapshot = state.studio.verify_key().await;
    ok_snapshot(snapshot)
}

async fn post_app_select_key(State(state): State<Arc<AppState>>) -> ApiResponse {
    let snapshot = state.studio.select_key().await;
    ok_snapshot(snapshot)
}

async fn post_app_generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateReq>,
) -> ApiResponse {
    let request = match payload.into_logo_request() {
        Ok(request) => request,
        Err(message) => return err_json(StatusCode::BAD_REQUEST, &message),
    };

    match state.studio.submit(request).await {
        Ok(snapshot) => ok_snapshot(snapshot),
        Err(err @ LogoError::InvalidRequest(_)) => {
            err_json(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err @ LogoError::Busy) => err_json(StatusCode::CONFLICT, &err.to_string()),
        Err(err @ LogoError::KeyUnavailable) => {
            err_json(StatusCode::FORBIDDEN, &err.to_string())
        }
        Err(err) => err_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

async fn post_app_cancel(State(state): State<Arc<AppState>>) -> ApiResponse {
    let cancelled = state.studio.cancel();
    let snapshot = state.studio.snapshot();
    let (status, Json(mut body)) = ok_snapshot(snapshot);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("cancelled".to_string(), Value::Bool(cancelled));
    }
    (status, Json(body))
}

async fn post_app_new_design(State(state): State<Arc<AppState>>) -> ApiResponse {
    ok_snapshot(state.studio.new_design())
}

fn ok_json(payload: Value) -> ApiResponse {
    let mut body = serde_json::Map::new();
    body.insert("ok".to_string(), Value::Bool(true));

    if let Some(obj) = payload.as_object() {
        for (key, value) in obj {
            body.insert(key.clone(), value.clone());
        }
    } else if !payload.is_null() {
        body.insert("data".to_string(), payload);
    }

    (StatusCode::OK, Json(Value::Object(body)))
}

fn ok_snapshot(snapshot: StudioSnapshot) -> ApiResponse {
    let logo = snapshot.logo.map(|logo| LogoView {
        image_data: logo.image_data().to_string(),
        prompt_text: logo.prompt_text().to_string(),
        created_at: logo.created_at().to_rfc3339(),
        file_name: logo.file_name(),
    });

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "phase": snapshot.phase,
            "generating": snapshot.phase == GenerationPhase::Generating,
            "styles": LogoStyle::labels(),
            "default_style": LogoStyle::default().label(),
            "logo": logo,
            "error": snapshot.error,
        })),
    )
}

fn err_json(status: StatusCode, message: &str) -> ApiResponse {
    (
        status,
        Json(json!({
            "ok": false,
            "error": message,
        })),
    )
}

fn bind_listener(preferred_port: u16) -> Result<TcpListener> {
    for offset in 0..200u16 {
        let port = preferred_port.saturating_add(offset);
        if port == 0 {
            continue;
        }

        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            return Ok(listener);
        }
    }

    Err(anyhow!("failed to bind server port"))
}
