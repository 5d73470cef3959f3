use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use crate::config::{Settings, MULTIPART_BUFFER_LIMIT};
use crate::error::AppError;
use crate::AppState;

type AppResult<T> = Result<T, AppError>;

/// Assemble the full application: routes, request tracing, shared state.
pub fn app(settings: Settings) -> Router {
    let router = routes(&settings);
    router
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { settings }))
}

/// Build the route table from the resolved settings. Registration is
/// decided once here; the toggles cannot change while the server runs.
fn routes(settings: &Settings) -> Router<Arc<AppState>> {
    let mut router = Router::new().route("/", any(root));

    if !settings.serve_disabled && settings.target_file.is_some() {
        router = router.route("/get", get(download_file).fallback(wrong_method));
    }

    if !settings.upload_disabled {
        router = router.route(
            "/upload",
            post(upload_file)
                .fallback(wrong_method)
                .layer(DefaultBodyLimit::max(MULTIPART_BUFFER_LIMIT)),
        );
    }

    router.fallback(not_found)
}

// ─── Root ────────────────────────────────────────────────────────────

/// Liveness endpoint: 200 with an empty body, any method. Every other
/// path lands in `not_found` below.
async fn root() {}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn wrong_method() -> AppError {
    AppError::WrongMethod
}

// ─── Download ────────────────────────────────────────────────────────

/// Stream the configured target file as an attachment, named after its
/// base name so clients save it under the right filename.
async fn download_file(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let Some(path) = state.settings.target_file.as_deref() else {
        // Unreachable while registration tracks the serve toggle.
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
    };

    let file = tokio::fs::File::open(path).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

// ─── Upload ──────────────────────────────────────────────────────────

/// Write the multipart field named `file` into the configured directory,
/// chunk by chunk, overwriting any existing file of the same name.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let mut multipart = multipart.map_err(|_| AppError::MissingFileField)?;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Multipart(e.to_string()))?;
        let Some(mut field) = field else {
            return Err(AppError::MissingFileField);
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = sanitize_filename(field.file_name())?;
        let directory = &state.settings.directory;
        let destination = directory.join(&file_name);

        tokio::fs::create_dir_all(directory).await?;
        let mut output = tokio::fs::File::create(&destination).await?;

        let mut written = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Multipart(e.to_string()))?
        {
            output.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        output.flush().await?;

        tracing::info!("Received upload: {} ({} bytes)", destination.display(), written);
        return Ok("File successfully uploaded.");
    }
}

/// Reduce a client-supplied filename to its final path component so an
/// upload cannot escape the configured directory. A missing name gets a
/// generated one; names with no usable component are rejected.
fn sanitize_filename(client_name: Option<&str>) -> AppResult<String> {
    let Some(name) = client_name else {
        return Ok(format!("upload-{}", uuid::Uuid::new_v4()));
    };

    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::InvalidFilename(name.to_string()))
}
