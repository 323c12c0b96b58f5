//! HTTP front end: upload form, SSE progress stream, and the download.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use ui2code::{
    EventSender, MarkupArtifact, Pipeline, PipelineEvent, PipelineReport, PipelineState,
    PreparedImage, Ui2CodeResult,
};

/// Multipart field carrying the screenshot.
pub const UPLOAD_FIELD: &str = "image";

/// How many finished artifacts stay downloadable.
pub const KEPT_ARTIFACTS: usize = 64;

/// Artifacts of recent successful runs, keyed by run id. Oldest evicted first.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    by_id: HashMap<Uuid, MarkupArtifact>,
    order: VecDeque<Uuid>,
}

impl ArtifactStore {
    pub fn insert(&mut self, id: Uuid, artifact: MarkupArtifact) {
        if self.order.len() >= KEPT_ARTIFACTS {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
        self.order.push_back(id);
        self.by_id.insert(id, artifact);
    }

    pub fn get(&self, id: &Uuid) -> Option<&MarkupArtifact> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Shared state for all handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    pub output: PathBuf,
    /// Successful artifacts, served by `/download/{id}`.
    pub artifacts: RwLock<ArtifactStore>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, output: PathBuf) -> Self {
        Self {
            pipeline,
            output,
            artifacts: RwLock::new(ArtifactStore::default()),
        }
    }
}

/// URL serving the artifact of run `id`.
pub fn download_url(id: Uuid) -> String {
    format!("/download/{id}")
}

pub type SharedState = Arc<AppState>;

type ApiError = (StatusCode, Json<Value>);

/// Build the axum Router.
pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/generate", post(handle_generate))
        .route("/download/:id", get(handle_download))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server on the given address.
pub async fn serve(addr: &str, state: SharedState, max_upload_bytes: usize) -> anyhow::Result<()> {
    let app = router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("UI listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_index() -> Html<&'static str> {
    Html(include_str!("page.html"))
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
}

/// Accept the upload, then stream the run as Server-Sent Events.
async fn handle_generate(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    tracing::info!(
        file = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        bytes = upload.bytes.len(),
        "Received upload"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_job(state, Uuid::new_v4(), upload, tx));

    let stream = UnboundedReceiverStream::new(rx)
        .map(|event| Event::default().event(event.kind()).json_data(&event));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(e.status(), &e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| api_error(e.status(), &e.body_text()))?;
        return Ok(Upload {
            bytes: bytes.to_vec(),
            file_name,
        });
    }

    Err(api_error(
        StatusCode::BAD_REQUEST,
        &format!("Missing multipart field '{UPLOAD_FIELD}'"),
    ))
}

/// One unit of work. Any failure becomes exactly one `failed` event.
#[tracing::instrument(skip_all, fields(run_id = %run_id))]
async fn run_job(state: SharedState, run_id: Uuid, upload: Upload, tx: EventSender) {
    let result: Ui2CodeResult<PipelineReport> = async {
        let image = PreparedImage::from_upload(&upload.bytes, upload.file_name.as_deref())?;
        let (width, height) = image.dimensions();
        tracing::info!(width, height, had_alpha = image.had_alpha(), "Prepared upload");

        let output = state.pipeline.run(&image, Some(&tx)).await?;

        // Held across the write so the newest stored artifact is the file on disk.
        let mut artifacts = state.artifacts.write().await;
        let report = ui2code::save(output, &state.output)?;
        artifacts.insert(run_id, report.artifact.clone());
        Ok(report)
    }
    .await;

    let event = match result {
        Ok(report) => report.completed_event(Some(download_url(run_id))),
        Err(e) => {
            tracing::error!(state = ?PipelineState::Failed(e.stage()), "Generation failed: {e}");
            PipelineEvent::failed(&e)
        }
    };
    let _ = tx.send(event);
}

async fn handle_download(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.artifacts.read().await.get(&id) {
        Some(artifact) => (
            [
                (header::CONTENT_TYPE, artifact.mime_type().to_string()),
                (header::CONTENT_DISPOSITION, artifact.content_disposition()),
            ],
            artifact.body().to_vec(),
        )
            .into_response(),
        None => api_error(StatusCode::NOT_FOUND, "No HTML for this run").into_response(),
    }
}

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}
