//! Serving filesystem paths over HTTP.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, warn};
use treefs::{FileInfo, FileSystem, FsError, Handle, VfsFile};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Format used by `Last-Modified` and `If-Modified-Since`.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub fs: Arc<dyn FileSystem>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(fs: Arc<dyn FileSystem>, config: ServerConfig) -> Self {
        Self {
            fs,
            config: Arc::new(config),
        }
    }
}

/// What a request resolves to, before it becomes a response.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    File {
        body: Vec<u8>,
        content_type: &'static str,
        modified: DateTime<Utc>,
    },
    Listing {
        html: String,
        modified: DateTime<Utc>,
    },
    NotModified,
    /// Directory requested without its trailing slash.
    AddSlash,
}

/// `GET /`
pub async fn serve_root(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    serve(state, String::new(), uri, headers).await
}

/// `GET /*path`
pub async fn serve_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    serve(state, path, uri, headers).await
}

async fn serve(state: AppState, path: String, uri: Uri, headers: HeaderMap) -> Response {
    let since = if_modified_since(&headers);
    let request_path = format!("/{path}");
    let task_path = request_path.clone();
    let result = tokio::task::spawn_blocking(move || resolve_request(&state, &task_path, since))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
        .and_then(|r| r);

    match result {
        Ok(Reply::File {
            body,
            content_type,
            modified,
        }) => (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_LENGTH, body.len().to_string()),
                (header::LAST_MODIFIED, modified.format(HTTP_DATE).to_string()),
            ],
            body,
        )
            .into_response(),
        Ok(Reply::Listing { html, modified }) => (
            [(header::LAST_MODIFIED, modified.format(HTTP_DATE).to_string())],
            Html(html),
        )
            .into_response(),
        Ok(Reply::NotModified) => StatusCode::NOT_MODIFIED.into_response(),
        Ok(Reply::AddSlash) => Redirect::permanent(&format!("{}/", uri.path())).into_response(),
        Err(err) if err.is_not_found() => {
            debug!(path = %request_path, "not found");
            (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
        }
        Err(err) => {
            warn!(path = %request_path, error = %err, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error\n").into_response()
        }
    }
}

/// Resolve one request against the filesystem. Blocking.
pub fn resolve_request(
    state: &AppState,
    path: &str,
    since: Option<DateTime<Utc>>,
) -> ServerResult<Reply> {
    let mut handle = state.fs.open(path)?;
    let reply = if handle.is_dir() {
        serve_dir(state, &mut handle, path, since)
    } else {
        serve_file(&mut handle, path, since)
    };
    handle.close()?;
    reply
}

fn serve_file(
    handle: &mut Handle,
    path: &str,
    since: Option<DateTime<Utc>>,
) -> ServerResult<Reply> {
    // A trailing slash on a file never resolves, so `path` names a file here.
    let modified = handle.stat()?.mod_time().trunc_subsecs(0);
    if not_modified(modified, since) {
        return Ok(Reply::NotModified);
    }
    Ok(Reply::File {
        body: handle.read_all()?,
        content_type: content_type(path),
        modified,
    })
}

fn serve_dir(
    state: &AppState,
    handle: &mut Handle,
    path: &str,
    since: Option<DateTime<Utc>>,
) -> ServerResult<Reply> {
    if !path.ends_with('/') {
        return Ok(Reply::AddSlash);
    }

    if let Some(index) = &state.config.index_file {
        match state.fs.open(&format!("{path}{index}")) {
            Ok(mut file) if !file.is_dir() => {
                let reply = serve_file(&mut file, index, since);
                file.close()?;
                return reply;
            }
            Ok(mut dir) => dir.close()?,
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }
    }

    if !state.config.directory_listing {
        return Err(FsError::NotFound {
            path: path.to_string(),
        }
        .into());
    }

    let modified = handle.stat()?.mod_time().trunc_subsecs(0);
    if not_modified(modified, since) {
        return Ok(Reply::NotModified);
    }
    let entries = handle.readdir(-1)?;
    Ok(Reply::Listing {
        html: render_listing(path, &entries),
        modified,
    })
}

fn not_modified(modified: DateTime<Utc>, since: Option<DateTime<Utc>>) -> bool {
    since.is_some_and(|since| modified <= since)
}

fn if_modified_since(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Content type from the file extension.
pub fn content_type(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return "application/octet-stream",
    };
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

fn render_listing(path: &str, entries: &[FileInfo]) -> String {
    let mut html = String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n");
    html.push_str(&format!("<title>Index of {}</title>\n<pre>\n", escape_html(path)));
    for entry in entries {
        let suffix = if entry.is_dir() { "/" } else { "" };
        html.push_str(&format!(
            "<a href=\"{}{suffix}\">{}{suffix}</a>\n",
            escape_href(entry.name()),
            escape_html(entry.name()),
        ));
    }
    html.push_str("</pre>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encode a single path segment.
fn escape_href(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
