//! Preview server implementation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tokio::sync::RwLock;

use missive_template::{escape_html, Registry};

use crate::reload::{reload_client_script, ReloadHub, ReloadMessage};
use crate::watcher::FileWatcher;

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Directory of `.html` templates to load over the built-ins
    pub templates_dir: Option<PathBuf>,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            templates_dir: Some(PathBuf::from("templates")),
            port: 7878,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Shared server state.
struct ServerState {
    registry: RwLock<Registry>,
    hub: ReloadHub,
    templates_dir: Option<PathBuf>,
}

impl ServerState {
    /// Rebuild the registry from built-ins plus the template directory.
    fn build_registry(templates_dir: &Option<PathBuf>) -> Registry {
        let mut registry = Registry::with_builtins();
        if let Some(dir) = templates_dir {
            if dir.exists() {
                match registry.load_dir(dir) {
                    Ok(count) => {
                        tracing::info!("Loaded {} templates from {}", count, dir.display());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load template directory: {e}");
                    }
                }
            }
        }
        registry
    }
}

/// Template preview server.
pub struct PreviewServer {
    config: PreviewConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    /// Start the preview server.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .expect("Invalid address");

        let state = Arc::new(ServerState {
            registry: RwLock::new(ServerState::build_registry(&self.config.templates_dir)),
            hub: ReloadHub::new(),
            templates_dir: self.config.templates_dir.clone(),
        });

        // Watch the template directory and reload browsers on change.
        if let Some(dir) = &self.config.templates_dir {
            if dir.exists() {
                let (watcher, mut rx) = FileWatcher::new(&[dir.clone()])
                    .map_err(|e| ServerError::WatchError(e.to_string()))?;

                let state_clone = Arc::clone(&state);
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        tracing::info!("Template change detected: {event:?}");
                        let rebuilt = ServerState::build_registry(&state_clone.templates_dir);
                        *state_clone.registry.write().await = rebuilt;
                        state_clone.hub.send(ReloadMessage::Reload);
                    }
                    drop(watcher);
                });
            }
        }

        let app = Router::new()
            .route("/", get(index_handler))
            .route("/preview/{*id}", get(preview_handler))
            .route("/source/{*id}", get(source_handler))
            .route("/__reload", get(ws_handler))
            .route("/__reload.js", get(reload_script_handler))
            .with_state(state);

        tracing::info!("Starting preview server at http://{addr}");

        if self.config.open {
            let url = format!("http://{addr}");
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

async fn index_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    Html(index_page(&registry))
}

async fn preview_handler(
    Path(id): Path<String>,
    Query(overrides): Query<HashMap<String, String>>,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let (status, html) = preview_page(&registry, &id, &overrides);
    (status, Html(html))
}

async fn source_handler(
    Path(id): Path<String>,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let (status, html) = source_page(&registry, &id);
    (status, Html(html))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    let Ok(msg) = serde_json::to_string(&ReloadMessage::Connected) else {
        return;
    };
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(reload_msg) = rx.recv().await {
        let Ok(json) = serde_json::to_string(&reload_msg) else {
            break;
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

async fn reload_script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(),
    )
}

/// The template index page.
fn index_page(registry: &Registry) -> String {
    let mut rows = String::new();
    for id in registry.ids() {
        let description = registry
            .get(id)
            .and_then(|t| t.description())
            .unwrap_or("");
        let previewable = registry
            .get(id)
            .map(|t| t.sample_props().is_some())
            .unwrap_or(false);

        let preview_link = if previewable {
            format!(r#"<a href="/preview/{}">preview</a>"#, escape_html(id))
        } else {
            "<span class=\"muted\">no sample props</span>".to_string()
        };

        rows.push_str(&format!(
            r#"<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td><a href="/source/{}">source</a></td></tr>
"#,
            escape_html(id),
            escape_html(description),
            preview_link,
            escape_html(id),
        ));
    }

    page_shell(
        "Templates",
        &format!(
            r#"<h1>Templates</h1>
<table>
<thead><tr><th>Id</th><th>Description</th><th></th><th></th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#
        ),
    )
}

/// Render a template preview, merging query-string overrides over the
/// template's sample props.
fn preview_page(
    registry: &Registry,
    id: &str,
    overrides: &HashMap<String, String>,
) -> (StatusCode, String) {
    let Some(template) = registry.get(id) else {
        return (
            StatusCode::NOT_FOUND,
            error_page("Template not found", &format!("No template with id '{id}'")),
        );
    };

    let mut props = template.sample_props().cloned().unwrap_or_default();
    for (k, v) in overrides {
        props.insert(k.clone(), v.clone());
    }

    match template.render(&props) {
        Ok(mut html) => {
            // Keep the preview live-reloading without touching the
            // template's own markup.
            html.push_str("\n<script src=\"/__reload.js\"></script>\n");
            (StatusCode::OK, html)
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            error_page("Render failed", &e.to_string()),
        ),
    }
}

/// Show a template's raw source, escaped.
fn source_page(registry: &Registry, id: &str) -> (StatusCode, String) {
    match registry.get(id) {
        Some(template) => (
            StatusCode::OK,
            page_shell(
                &format!("Source: {id}"),
                &format!(
                    "<h1><code>{}</code></h1>\n<pre>{}</pre>",
                    escape_html(id),
                    escape_html(template.source())
                ),
            ),
        ),
        None => (
            StatusCode::NOT_FOUND,
            error_page("Template not found", &format!("No template with id '{id}'")),
        ),
    }
}

fn error_page(title: &str, message: &str) -> String {
    page_shell(
        title,
        &format!(
            "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back to templates</a></p>",
            escape_html(title),
            escape_html(message)
        ),
    )
}

fn page_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{} - missive</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ text-align: left; padding: 0.5rem; border-bottom: 1px solid #ddd; }}
    pre {{ background: #f5f5f5; padding: 1rem; border-radius: 0.5rem; overflow-x: auto; }}
    .muted {{ color: #888; }}
  </style>
</head>
<body>
  {}
  <script src="/__reload.js"></script>
</body>
</html>"#,
        escape_html(title),
        body
    )
}
