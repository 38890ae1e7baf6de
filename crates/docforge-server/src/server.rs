//! HTTP server setup and routing

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, Method, header},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post},
};
use chrono::{SecondsFormat, Utc};
use docforge_engine::sample_document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::assembler::DocumentAssembler;
use crate::compose::{compose, docx_response};
use crate::config::ServerConfig;
use crate::error::{Result, ServiceError};
use crate::registry::{DEFAULT_TEMPLATE_ID, TEST_TEMPLATE_ID, TemplateRegistry};
use crate::resolver::{CandidateRoots, RootProbe, TemplateResolver, executable_dir};
use crate::sanitize::redact_for_logging;

/// File name of the `/test-doc` download.
const TEST_DOCUMENT_FILENAME: &str = "test-resume.docx";

/// Immutable state shared by all request handlers.
#[derive(Debug)]
pub struct AppState {
    config: ServerConfig,
    resolver: TemplateResolver,
    assembler: DocumentAssembler,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State with the built-in registry and the discovered candidate roots.
    pub fn new(config: ServerConfig) -> Self {
        let roots = CandidateRoots::discover(&config.template_dirs);
        let resolver = TemplateResolver::new(TemplateRegistry::builtin(), roots);
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(config: ServerConfig, resolver: TemplateResolver) -> Self {
        Self {
            config,
            resolver,
            assembler: DocumentAssembler::default(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }
}

/// Body of a generation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    template_id: Option<String>,
    #[serde(default)]
    user_data: Option<Value>,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    environment: String,
}

/// Candidate root diagnostics
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugTemplatesResponse {
    current_working_directory: Option<String>,
    executable_directory: Option<String>,
    template_paths: Vec<RootProbe>,
    templates: BTreeMap<&'static str, &'static str>,
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.config.environment.clone(),
    })
}

async fn debug_templates(State(state): State<SharedState>) -> impl IntoResponse {
    Json(DebugTemplatesResponse {
        current_working_directory: std::env::current_dir()
            .ok()
            .map(|dir| dir.display().to_string()),
        executable_directory: executable_dir().map(|dir| dir.display().to_string()),
        template_paths: state.resolver.probe(),
        templates: state.resolver.registry().entries().collect(),
    })
}

/// Serve the `test` template, or the built-in sample when none is installed.
async fn test_document(State(state): State<SharedState>) -> Result<Response> {
    let bytes = run_blocking(move || match state.resolver.resolve(TEST_TEMPLATE_ID) {
        Ok(template) => Ok(template.into_inner()),
        Err(ServiceError::TemplateNotFound { .. }) => {
            info!("No test template installed, serving built-in sample");
            Ok(sample_document()?)
        }
        Err(e) => Err(e),
    })
    .await?;

    docx_response(bytes, TEST_DOCUMENT_FILENAME)
}

/// Generate a document from `{templateId?, userData}`.
async fn generate(State(state): State<SharedState>, body: Bytes) -> Result<Response> {
    let request: GenerateRequest =
        serde_json::from_slice(&body).map_err(|e| ServiceError::Validation {
            title: "Invalid request body",
            message: format!("Request body is not valid JSON: {}", e),
        })?;

    let user_data = match request.user_data {
        None | Some(Value::Null) => return Err(ServiceError::missing_user_data()),
        Some(data @ Value::Object(_)) => data,
        Some(_) => {
            return Err(ServiceError::Validation {
                title: "Invalid userData",
                message: "userData must be a JSON object".to_string(),
            });
        }
    };
    let template_id = request
        .template_id
        .unwrap_or_else(|| DEFAULT_TEMPLATE_ID.to_string());

    info!(%template_id, "Generating document");
    debug!(data = %redact_for_logging(&user_data), "Request data");

    let (document, user_data) = run_blocking(move || {
        let template = state.resolver.resolve(&template_id)?;
        let document = state.assembler.assemble(&template, &user_data)?;
        Ok((document, user_data))
    })
    .await?;

    compose(document, &user_data, Utc::now())
}

/// 404 handler
async fn not_found() -> ServiceError {
    ServiceError::RouteNotFound
}

/// Run `f` on the blocking pool and wait for it.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Unclassified(format!("generation task failed: {}", e)))?
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = if config.allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(&config.allowed_origin) {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(e) => {
                warn!(origin = %config.allowed_origin, error = %e, "Invalid allowed origin, allowing any origin");
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Unsupported methods on a known path are treated like unknown paths.
fn endpoint(method_router: MethodRouter<SharedState>) -> MethodRouter<SharedState> {
    method_router.fallback(not_found)
}

type EndpointFactory = fn() -> MethodRouter<SharedState>;

/// Endpoints served at the root and under every route prefix.
const ENDPOINTS: &[(&str, EndpointFactory)] = &[
    ("/", || endpoint(post(generate))),
    ("/health", || endpoint(get(health))),
    ("/debug/templates", || endpoint(get(debug_templates))),
    ("/test-doc", || endpoint(get(test_document))),
    ("/test-docx", || endpoint(get(test_document))),
];

/// Full paths for the root mount and each prefix.
///
/// Under a prefix, the generation endpoint answers both `/prefix` and
/// `/prefix/`. Two mounts that produce the same path are a configuration
/// error.
fn route_table(prefixes: &[String]) -> Result<Vec<(String, EndpointFactory)>> {
    let mut seen = BTreeSet::new();
    let mut table = Vec::new();

    let mounts = std::iter::once("").chain(prefixes.iter().map(String::as_str));
    for mount in mounts {
        for &(path, factory) in ENDPOINTS {
            let paths = match (mount, path) {
                ("", _) => vec![path.to_string()],
                (_, "/") => vec![mount.to_string(), format!("{}/", mount)],
                _ => vec![format!("{}{}", mount, path)],
            };
            for full in paths {
                if !seen.insert(full.clone()) {
                    return Err(ServiceError::Config(format!(
                        "route prefix {} collides with existing route {}",
                        mount, full
                    )));
                }
                table.push((full, factory));
            }
        }
    }

    Ok(table)
}

/// Build the axum router, mounted at the root and under every configured
/// route prefix.
///
/// # Errors
///
/// Returns [`ServiceError::Config`] when a route prefix repeats another one
/// or shadows a built-in route.
pub fn build_router(state: SharedState) -> Result<Router> {
    let mut router = Router::new();
    for (path, factory) in route_table(&state.config.route_prefixes)? {
        router = router.route(&path, factory());
    }

    Ok(router
        .fallback(not_found)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Run the document server.
///
/// This function blocks until the server is shut down.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config));

    for root in state.resolver.roots().iter() {
        debug!(root = %root.label, path = %root.dir.display(), "Template candidate root");
    }
    for prefix in &state.config.route_prefixes {
        info!(%prefix, "Mounting routes under prefix");
    }

    let router = build_router(state)?;

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "docforge server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| ServiceError::Server(e.to_string()))?;

    Ok(())
}
