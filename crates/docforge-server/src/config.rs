//! Server configuration

use std::path::PathBuf;

/// Configuration for the document service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Deployment environment name, reported by the health check
    pub environment: String,

    /// Template directories searched before the built-in layouts
    pub template_dirs: Vec<PathBuf>,

    /// Extra mount points for the router, e.g. `/api/generate-resume`.
    /// Stored in normalized form (see [`normalize_route_prefix`]).
    pub route_prefixes: Vec<String>,

    /// Value for `Access-Control-Allow-Origin`. `*` allows any origin.
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            environment: "development".to_string(),
            template_dirs: Vec::new(),
            route_prefixes: Vec::new(),
            allowed_origin: "*".to_string(),
        }
    }
}

/// Normalize a route prefix to `/a/b` form.
///
/// Returns `None` for prefixes that would mount at the root.
pub fn normalize_route_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Normalize route prefixes, dropping root mounts and repeats.
pub fn normalize_route_prefixes<S: AsRef<str>>(prefixes: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        if let Some(prefix) = normalize_route_prefix(prefix.as_ref()) {
            if !normalized.contains(&prefix) {
                normalized.push(prefix);
            }
        }
    }
    normalized
}
