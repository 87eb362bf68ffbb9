//! Single-page upload front end.
//!
//! `GET /` shows an upload form; `POST /run` stores the uploaded chase
//! workbook in the base folder and runs `chaselist run` on it as a child
//! process, then shows that process's output.

use crate::composer::escape_html;
use crate::error::Result;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use chrono::{Local, NaiveDateTime};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Output;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::process::Command;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const PAGE_HEAD: &str = "<!DOCTYPE html><html><head><meta charset='utf-8'><title>Chaselist</title>\
<style>body{font-family:Arial,sans-serif;max-width:720px;margin:40px auto}\
pre{background:#f4f4f4;padding:12px;white-space:pre-wrap}\
.ok{color:#1a7f37}.fail{color:#cf222e}</style></head><body><h1>Chaselist</h1>";

const UPLOAD_FORM: &str = "<h2>1. Upload chase workbook</h2>\
<form method='post' action='/run' enctype='multipart/form-data'>\
<input type='file' name='file' accept='.xlsx' required> \
<button type='submit'>Prepare mails</button></form>";

pub struct ServerState {
    pub base_folder: PathBuf,
    pub chase_prefix: String,
    /// Passed on to the child run so it sees the same settings.
    pub config_path: Option<PathBuf>,
    pub executable: PathBuf,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/run", post(run_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, folder = %state.base_folder.display(), "upload page ready");
    axum::serve(listener, router(Arc::new(state))).await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(page(&format!("{}<p>Upload the weekly chase workbook to start.</p>", UPLOAD_FORM)))
}

async fn run_upload(State(state): State<Arc<ServerState>>, mut multipart: Multipart) -> (StatusCode, Html<String>) {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return failure(StatusCode::BAD_REQUEST, "No .xlsx file in the upload."),
        Err(e) => {
            tracing::warn!(error = %e, "rejected upload");
            return failure(StatusCode::BAD_REQUEST, &e);
        }
    };

    let name = upload_file_name(&state.chase_prefix, Local::now().naive_local());
    let path = state.base_folder.join(&name);
    if let Err(e) = save_upload(&state, &path, &upload).await {
        tracing::error!(error = %e, path = %path.display(), "failed to store upload");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, &format!("Could not store the file: {}", e));
    }
    tracing::info!(path = %path.display(), bytes = upload.len(), "stored upload");

    let mut command = Command::new(&state.executable);
    if let Some(config) = &state.config_path {
        command.arg("--config").arg(config);
    }
    command.arg("run").arg("--input").arg(&path);

    match command.output().await {
        Ok(output) => {
            tracing::info!(status = ?output.status.code(), "run finished");
            (StatusCode::OK, Html(page(&render_output(&path, &output))))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start run");
            failure(StatusCode::INTERNAL_SERVER_ERROR, &format!("Could not start the run: {}", e))
        }
    }
}

/// The first `.xlsx` file field of the form.
async fn read_upload(multipart: &mut Multipart) -> std::result::Result<Option<Vec<u8>>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let is_xlsx = field
            .file_name()
            .is_some_and(|n| n.to_lowercase().ends_with(".xlsx"));
        if !is_xlsx {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        return Ok(Some(bytes.to_vec()));
    }
    Ok(None)
}

async fn save_upload(state: &ServerState, path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&state.base_folder).await?;
    tokio::fs::write(path, bytes).await
}

/// Stored name of an upload. It starts with the chase prefix, so a plain
/// `chaselist run` also finds it as the newest workbook.
pub fn upload_file_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}_from_app_{}.xlsx", prefix, now.format("%Y%m%d_%H%M%S"))
}

fn render_output(path: &std::path::Path, output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let mut html = format!(
        "<p>Stored as <code>{}</code></p><h2>Run output</h2>",
        escape_html(&path.display().to_string())
    );
    if stdout.trim().is_empty() {
        html.push_str("<p>No output.</p>");
    } else {
        html.push_str(&format!("<pre>{}</pre>", escape_html(&stdout)));
    }

    if output.status.success() {
        html.push_str("<p class='ok'>Run finished. The mails are ready for review.</p>");
    } else {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        html.push_str(&format!("<p class='fail'>Run failed (exit status {}).</p>", code));
        if !stderr.trim().is_empty() {
            html.push_str(&format!("<h2>Errors</h2><pre>{}</pre>", escape_html(&stderr)));
        }
    }

    html.push_str(UPLOAD_FORM);
    html
}

fn failure(status: StatusCode, message: &str) -> (StatusCode, Html<String>) {
    let body = format!("<p class='fail'>{}</p>{}", escape_html(message), UPLOAD_FORM);
    (status, Html(page(&body)))
}

fn page(body: &str) -> String {
    format!("{}{}</body></html>", PAGE_HEAD, body)
}
