use std::{
    io::{self, Read, SeekFrom},
    sync::Arc,
    time::SystemTime,
};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, span, Instrument, Level};

use crate::{
    bucket::Bucket,
    entry::{Entry, Metadata},
    error::FsError,
    file::File,
};

const INDEX_FILE: &str = "index.html";
const SNIFF_LEN: u64 = 512;
const CHUNK_SIZE: usize = 64 * 1024;

/// Characters left unescaped in listing links.
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

type Chunk = Result<Vec<u8>, io::Error>;

#[derive(Clone)]
pub struct AppState {
    pub bucket: Arc<Bucket>,
}

/// Serves `bucket` under `mount`, which must start and end with `/`.
pub fn routes(bucket: Arc<Bucket>, mount: &str) -> Router {
    let mut router = Router::new()
        .route(mount, get(serve_root))
        .route(&format!("{}{{*path}}", mount), get(serve_path));

    let bare = mount.trim_end_matches('/');
    if !bare.is_empty() {
        let target = mount.to_string();
        router = router.route(bare, get(move || async move { moved_permanently(&target) }));
    }

    router.with_state(AppState { bucket })
}

async fn serve_root(State(state): State<AppState>) -> Response {
    serve(state, "/".to_string()).await
}

async fn serve_path(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    serve(state, clean_path(&path)).await
}

#[derive(Debug)]
enum Reply {
    Redirect(String),
    Listing(String),
    File {
        size: Option<u64>,
        modified: SystemTime,
        content_type: String,
    },
}

async fn serve(state: AppState, path: String) -> Response {
    let span = span!(Level::INFO, "serve", context = "serve", path = path);

    async move {
        info!("called");

        let (reply_tx, reply_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel::<Chunk>(4);
        let bucket = state.bucket.clone();
        let task_path = path.clone();
        tokio::task::spawn_blocking(move || reply_blocking(&bucket, &task_path, reply_tx, body_tx));

        let reply = match reply_rx.await {
            Err(err) => {
                error!(error_message=%err, error_group="serve_task");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            Ok(reply) => reply,
        };

        match reply {
            Err(err) if err.is_not_found() => StatusCode::NOT_FOUND.into_response(),
            Err(err) => {
                error!(error_message=%err, error_group="open");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Ok(Reply::Redirect(location)) => moved_permanently(&location),
            Ok(Reply::Listing(html)) => (
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                html,
            )
                .into_response(),
            Ok(Reply::File {
                size,
                modified,
                content_type,
            }) => file_response(body_rx, size, modified, &content_type),
        }
    }
    .instrument(span)
    .await
}

fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(err) => {
            error!(error_message=%err, error_group="redirect", location=location);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn file_response(
    body_rx: mpsc::Receiver<Chunk>,
    size: Option<u64>,
    modified: SystemTime,
    content_type: &str,
) -> Response {
    let stream = futures::stream::unfold(body_rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    let mut resp = Response::new(Body::from_stream(stream));
    let headers = resp.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(size) = size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
    if modified > SystemTime::UNIX_EPOCH {
        if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    resp
}

/// Runs on a blocking thread: resolves `path`, sends the reply head, then
/// streams file content into `body_tx` until the end or until the receiver
/// goes away.
fn reply_blocking(
    bucket: &Bucket,
    path: &str,
    reply_tx: oneshot::Sender<Result<Reply, FsError>>,
    body_tx: mpsc::Sender<Chunk>,
) {
    let dir = match bucket.open(path) {
        Err(err) => {
            let _ = reply_tx.send(Err(err));
            return;
        }
        Ok(Entry::File(file)) => return stream_file(file, reply_tx, body_tx),
        Ok(Entry::Directory(dir)) => dir,
    };

    if !path.ends_with('/') {
        let last = path.rsplit('/').next().unwrap_or_default();
        let _ = reply_tx.send(Ok(Reply::Redirect(format!("{}/", last))));
        return;
    }

    let children = dir.read_dir(None);
    if children.iter().any(|m| !m.is_dir && m.name == INDEX_FILE) {
        match dir.open_child(INDEX_FILE) {
            Ok(Entry::File(file)) => return stream_file(file, reply_tx, body_tx),
            Ok(Entry::Directory(_)) => {}
            Err(err) => {
                let _ = reply_tx.send(Err(err));
                return;
            }
        }
    }

    let _ = reply_tx.send(Ok(Reply::Listing(render_listing(&children))));
}

fn stream_file(
    mut file: File<'_>,
    reply_tx: oneshot::Sender<Result<Reply, FsError>>,
    body_tx: mpsc::Sender<Chunk>,
) {
    let content_type = match content_type_for(file.name()) {
        Some(ct) => ct.to_string(),
        None => match sniff_content_type(&mut file) {
            Err(err) => {
                let _ = reply_tx.send(Err(err));
                return;
            }
            Ok(ct) => ct.to_string(),
        },
    };

    let head = Reply::File {
        size: file.size().ok(),
        modified: file.modified(),
        content_type,
    };
    if reply_tx.send(Ok(head)).is_err() {
        return;
    }

    loop {
        let mut buf = vec![0; CHUNK_SIZE];
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                buf.truncate(n);
                if body_tx.blocking_send(Ok(buf)).is_err() {
                    break;
                }
            }
            Err(err) => {
                error!(error_message=%err, error_group="read", path=file.path());
                let _ = body_tx.blocking_send(Err(io::Error::from(err)));
                break;
            }
        }
    }

    if let Err(err) = file.close() {
        error!(error_message=%err, error_group="close", path=file.path());
    }
}

/// Peeks at the first bytes to tell text from binary, then rewinds.
fn sniff_content_type(file: &mut File<'_>) -> Result<&'static str, FsError> {
    let mut head = Vec::new();
    Read::take(&mut *file, SNIFF_LEN).read_to_end(&mut head)?;
    file.seek(SeekFrom::Start(0))?;

    Ok(sniff(&head))
}

fn sniff(head: &[u8]) -> &'static str {
    let is_text = !head.contains(&0)
        && match std::str::from_utf8(head) {
            Ok(_) => true,
            Err(err) => err.error_len().is_none(),
        };

    if is_text {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn content_type_for(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let ct = match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => return None,
    };

    Some(ct)
}

/// Resolves `.` and `..` segments and gives the path a leading separator.
/// A trailing separator on the input is kept.
fn clean_path(raw: &str) -> String {
    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if raw.ends_with('/') && !segments.is_empty() {
        path.push('/');
    }
    path
}

fn render_listing(children: &[Metadata]) -> String {
    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for child in children {
        let name = if child.is_dir {
            format!("{}/", child.name)
        } else {
            child.name.clone()
        };
        html.push_str(&format!(
            "<a href=\"{}\">{}</a>\n",
            utf8_percent_encode(&name, HREF),
            escape_html(&name)
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
