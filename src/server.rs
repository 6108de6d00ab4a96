//! Local HTTP façade over the catalog and dispatch engine.
//!
//! GET  /health     no auth
//! GET  /models     alias -> {provider, model}
//! GET  /providers  registered and available providers
//! POST /call       {alias | aliases, prompt, json_mode?, yolo?}
//! POST /refresh    rebuild the catalog

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::catalog::{CatalogHandle, ModelSource};
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::error::AiError;
use crate::providers::InvokeOptions;
use crate::resolve::{DispatchTarget, lookup};

pub const TOKEN_ENV: &str = "AI_CLI_SERVER_TOKEN";
const TOKEN_LEN: usize = 43;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogHandle>,
    pub dispatcher: Dispatcher,
    pub source: Arc<dyn ModelSource>,
    /// `None` disables auth.
    pub token: Option<Arc<str>>,
    pub timeout: Option<Duration>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        let status = match &e {
            AiError::UnknownAlias(_) | AiError::NotFound { .. } => StatusCode::NOT_FOUND,
            AiError::Provider { .. } => StatusCode::BAD_GATEWAY,
            AiError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AiError::Io { .. } | AiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AiError::Policy(_) | AiError::Usage(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/providers", get(providers))
        .route("/call", post(call))
        .route("/refresh", post(refresh))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AiError::io(addr.to_string(), e))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .map_err(|e| AiError::io(addr.to_string(), e))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized: invalid or missing Bearer token",
        )),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn models(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    authorize(&state, &headers)?;
    let config = state.catalog.snapshot();
    let models: serde_json::Map<String, Value> = config
        .aliases
        .iter()
        .map(|(alias, t)| {
            (
                alias.to_string(),
                json!({ "provider": t.provider, "model": t.model }),
            )
        })
        .collect();
    Ok(Json(json!({ "models": models })))
}

async fn providers(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    authorize(&state, &headers)?;
    let registry = state.dispatcher.registry();
    Ok(Json(json!({
        "providers": registry.names(),
        "available": registry.available(),
    })))
}

#[derive(Debug, Deserialize)]
struct CallRequest {
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    json_mode: bool,
    #[serde(default)]
    yolo: bool,
}

async fn call(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    authorize(&state, &headers)?;
    let req: CallRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")))?;

    let names = match (req.alias, req.aliases) {
        (Some(alias), None) => vec![alias],
        (None, Some(list)) if !list.is_empty() => list,
        _ => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "Provide exactly one of 'alias' or a non-empty 'aliases'",
            ));
        }
    };
    let Some(prompt) = req.prompt.filter(|p| !p.trim().is_empty()) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing 'prompt' in request body"));
    };

    let config = state.catalog.snapshot();
    let targets: Vec<DispatchTarget> = names
        .iter()
        .map(|n| lookup(n, &config.aliases).ok_or_else(|| AiError::UnknownAlias(n.clone())))
        .collect::<Result<_, _>>()?;

    let options = DispatchOptions {
        invoke: InvokeOptions {
            json_mode: req.json_mode,
            auto_approve: req.yolo,
        },
        timeout: state.timeout,
    };

    if let [target] = targets.as_slice() {
        let result = state.dispatcher.invoke(target, &prompt, options).await?;
        return Ok(Json(json!({ "result": result })));
    }
    let results = state.dispatcher.dispatch_many(&targets, &prompt, options).await;
    Ok(Json(json!({ "results": results })))
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    authorize(&state, &headers)?;
    let report = state.catalog.refresh(state.source.as_ref()).await?;
    Ok(Json(json!(report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Discovery, SourceModels};
    use crate::config::Config;
    use crate::providers::testing::{FakeProvider, Script};
    use crate::providers::{ProviderName, ProviderRegistry};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct StaticSource(Discovery);

    #[async_trait]
    impl ModelSource for StaticSource {
        async fn discover(&self) -> Discovery {
            self.0.clone()
        }
    }

    fn state(dir: &TempDir, token: Option<&str>) -> AppState {
        let claude = FakeProvider::new(ProviderName::Claude)
            .script("opus", Script::Reply("deep answer".into()))
            .script("haiku", Script::Fail("quota exceeded".into()));
        let codex = FakeProvider::new(ProviderName::Codex);
        let registry = ProviderRegistry::empty()
            .with(Arc::new(claude))
            .with(Arc::new(codex));
        let discovery = Discovery {
            local: vec![SourceModels {
                provider: ProviderName::Ollama,
                models: vec!["phi4:latest".into()],
            }],
            ..Default::default()
        };
        AppState {
            catalog: Arc::new(CatalogHandle::with_config(
                dir.path().join("config.json"),
                Config::default(),
            )),
            dispatcher: Dispatcher::new(registry),
            source: Arc::new(StaticSource(discovery)),
            token: token.map(Arc::from),
            timeout: None,
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir, Some("secret")));
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn bearer_token_enforced() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir, Some("secret")));
        let (status, _) = send(
            app.clone(),
            Request::get("/models").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app.clone(),
            Request::get("/models")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            app,
            Request::get("/models")
                .header(header::AUTHORIZATION, "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["models"]["opus"]["provider"], "claude");
    }

    #[tokio::test]
    async fn providers_lists_registry() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir, None));
        let (status, body) =
            send(app, Request::get("/providers").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["providers"], json!(["claude", "codex"]));
        assert_eq!(body["available"], json!(["claude", "codex"]));
    }

    #[tokio::test]
    async fn call_single_alias() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir, None));
        let (status, body) = send(app, post("/call", r#"{"alias":"opus","prompt":"why"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "deep answer");
    }

    #[tokio::test]
    async fn call_error_statuses() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir, None));
        let (status, body) =
            send(app.clone(), post("/call", r#"{"alias":"nope","prompt":"x"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));

        let (status, _) = send(app.clone(), post("/call", r#"{"alias":"haiku","prompt":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, body) = send(app.clone(), post("/call", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON"));

        let (status, _) = send(app, post("/call", r#"{"alias":"opus"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn call_many_reports_each_target() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir, None));
        let (status, body) = send(
            app,
            post("/call", r#"{"aliases":["opus","haiku","gpt"],"prompt":"q"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["output"], "deep answer");
        assert_eq!(results[1]["error"]["kind"], "provider");
        assert_eq!(results[2]["output"], "gpt-5.2:q");
    }

    #[tokio::test]
    async fn refresh_swaps_catalog() {
        let dir = TempDir::new().unwrap();
        let st = state(&dir, None);
        let app = router(st.clone());
        let (status, body) = send(app.clone(), post("/refresh", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["aliases"].as_u64().unwrap() > 0);
        assert!(st.catalog.snapshot().aliases.contains("phi4"));
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn generated_tokens_differ() {
        let a = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert_ne!(a, generate_token());
    }
}
