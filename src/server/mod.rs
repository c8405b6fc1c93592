//! Dev server: static files from the production root plus live reload

pub mod livereload;

use crate::core::{config::ServerConfig, PipelineKind};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

/// What connected browsers should do after a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Re-fetch stylesheets in place
    Css,
    /// Reload the whole page
    Full,
}

impl ReloadEvent {
    /// Reload triggered by a successful run of `pipeline`; specs change nothing served
    pub fn for_pipeline(pipeline: PipelineKind) -> Option<Self> {
        match pipeline {
            PipelineKind::Styles => Some(ReloadEvent::Css),
            PipelineKind::Tests => None,
            PipelineKind::Scripts | PipelineKind::Images | PipelineKind::IconFont => {
                Some(ReloadEvent::Full)
            }
        }
    }

    pub fn event_name(self) -> &'static str {
        match self {
            ReloadEvent::Css => "css",
            ReloadEvent::Full => "reload",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind dev server to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dev server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct ServerState {
    root: Arc<PathBuf>,
    reload: broadcast::Sender<ReloadEvent>,
    shutdown: CancellationToken,
}

/// Build the dev server router.
///
/// HTML pages get the live-reload script injected; everything else is served
/// from `root` untouched. Event streams end when `shutdown` is cancelled.
pub fn router(
    root: impl Into<PathBuf>,
    reload: broadcast::Sender<ReloadEvent>,
    shutdown: CancellationToken,
) -> Router {
    let state = ServerState {
        root: Arc::new(root.into()),
        reload,
        shutdown,
    };

    Router::new()
        .route(livereload::EVENTS_PATH, get(reload_events))
        .route(livereload::SCRIPT_PATH, get(reload_script))
        .fallback(serve_asset)
        .with_state(state)
}

async fn reload_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        livereload::CLIENT_SCRIPT,
    )
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.reload.subscribe())
        .filter_map(|result| {
            futures::future::ready(match result {
                Ok(event) => Some(Ok(Event::default()
                    .event(event.event_name())
                    .data(event.event_name()))),
                Err(e) => {
                    warn!("Live reload receiver lagged: {}", e);
                    None
                }
            })
        })
        .take_until(state.shutdown.clone().cancelled_owned());

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn serve_asset(State(state): State<ServerState>, req: Request<Body>) -> Response {
    if let Some(page) = html_target(&state.root, req.uri().path()).await {
        match tokio::fs::read_to_string(&page).await {
            Ok(html) => return Html(livereload::inject(&html)).into_response(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to read {}: {}", page.display(), e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    match ServeDir::new(state.root.as_path()).oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Map a request path to an HTML file under `root`, if it names one.
/// Segments are percent-decoded first. Directory requests resolve to their
/// `index.html`. Paths escaping the root are never resolved.
async fn html_target(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in uri_path.split('/') {
        if segment.is_empty() {
            continue;
        }
        let decoded = urlencoding::decode(segment).ok()?;
        if decoded.contains(['/', '\\', '\0']) {
            return None;
        }
        match Path::new(decoded.as_ref()).components().next() {
            Some(Component::Normal(part)) => path.push(part),
            _ => return None,
        }
    }

    let is_dir = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if uri_path.ends_with('/') || is_dir {
        path.push("index.html");
        return Some(path);
    }

    let is_html = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false);
    is_html.then_some(path)
}

/// A bound dev server, ready to run
pub struct DevServer {
    listener: TcpListener,
    router: Router,
    addr: SocketAddr,
}

impl DevServer {
    /// Bind the listener up front so an unusable address fails at startup
    pub async fn bind(
        config: &ServerConfig,
        reload: broadcast::Sender<ReloadEvent>,
        shutdown: CancellationToken,
    ) -> Result<Self, ServerError> {
        let address = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let addr = listener.local_addr()?;
        debug!("Dev server bound to {}", addr);

        Ok(Self {
            listener,
            router: router(config.root.clone(), reload, shutdown),
            addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `cancel` fires, then drain open connections
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
        info!("Serving on http://{}", self.addr);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        info!("Dev server stopped");
        Ok(())
    }
}
