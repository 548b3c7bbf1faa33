//! Development server.
//!
//! Serves the output directory over HTTP on its own thread. Each request is
//! handed to the [`ReadyGate`]: before the first build finishes the request
//! waits in the gate's queue and is answered as soon as the gate advances.
//! The served directory lives in a [`ServeRoot`] so it can follow the output
//! directory when the config is reloaded.
//!
//! | Request | File |
//! |---------|------|
//! | `/` | `index.html` |
//! | `/about/` or `/about` (a directory) | `about/index.html` |
//! | `/feed.json?x=1` | `feed.json` |
//! | missing | `404.html` if present, else a plain 404 |
//! | `/../secret` | refused with 403 |

use crate::config::ServerConfig;
use crate::gate::ReadyGate;
use parking_lot::RwLock;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot listen on {addr}: {message}")]
    Bind { addr: SocketAddr, message: String },
}

/// Outcome of mapping a request URL onto the output directory.
#[derive(Debug, PartialEq)]
pub enum Resolution {
    File(PathBuf),
    NotFound,
    Forbidden,
}

/// Content type by file extension.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

fn decode_percent(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Map a request URL to a file under `root`.
pub fn resolve(root: &Path, url: &str) -> Resolution {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let mut file = root.to_path_buf();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let segment = decode_percent(segment);
        if segment == ".." || segment.contains(['/', '\\']) {
            return Resolution::Forbidden;
        }
        if segment == "." {
            continue;
        }
        file.push(segment);
    }
    if file.is_dir() {
        file.push("index.html");
    }
    if file.is_file() {
        Resolution::File(file)
    } else {
        Resolution::NotFound
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn send(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<(), ServeError> {
    let head_only = request.method() == &Method::Head;
    let mut response = Response::from_data(if head_only { Vec::new() } else { body })
        .with_status_code(StatusCode(status));
    if let Some(h) = header("Content-Type", content_type) {
        response = response.with_header(h);
    }
    if let Some(h) = header("Cache-Control", "no-cache") {
        response = response.with_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Answer one request from `root`.
pub fn respond(request: Request, root: &Path) -> Result<(), ServeError> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return send(request, 405, "text/plain; charset=utf-8", b"405 Method Not Allowed".to_vec());
    }
    let url = request.url().to_string();
    match resolve(root, &url) {
        Resolution::File(path) => {
            let body = fs::read(&path)?;
            tracing::debug!(url = %url, status = 200, "serve");
            send(request, 200, mime_type(&path), body)
        }
        Resolution::Forbidden => {
            tracing::warn!(url = %url, "refused path outside output directory");
            send(request, 403, "text/plain; charset=utf-8", b"403 Forbidden".to_vec())
        }
        Resolution::NotFound => {
            tracing::debug!(url = %url, status = 404, "serve");
            let custom = root.join("404.html");
            match fs::read(&custom) {
                Ok(body) => send(request, 404, "text/html; charset=utf-8", body),
                Err(_) => send(request, 404, "text/plain; charset=utf-8", b"404 Not Found".to_vec()),
            }
        }
    }
}

/// A listening server whose accept loop has not started yet.
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

/// Listen on the configured interface and port.
pub fn bind(config: &ServerConfig) -> Result<BoundServer, ServeError> {
    let addr = SocketAddr::new(config.interface, config.port);
    let server = Server::http(addr).map_err(|e| ServeError::Bind {
        addr,
        message: e.to_string(),
    })?;
    let addr = server.server_addr().to_ip().unwrap_or(addr);
    tracing::info!(url = %format!("http://{addr}/"), "serving");
    Ok(BoundServer {
        server: Arc::new(server),
        addr,
    })
}

/// The directory being served, shared with the accept thread.
#[derive(Debug, Clone)]
pub struct ServeRoot(Arc<RwLock<PathBuf>>);

impl ServeRoot {
    pub fn new(dir: PathBuf) -> Self {
        Self(Arc::new(RwLock::new(dir)))
    }

    pub fn get(&self) -> PathBuf {
        self.0.read().clone()
    }

    /// Point at `dir`; true when it differs from the current directory.
    pub fn set(&self, dir: &Path) -> bool {
        let mut current = self.0.write();
        if current.as_path() == dir {
            return false;
        }
        *current = dir.to_path_buf();
        true
    }
}

impl BoundServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept requests on a background thread. Requests wait on `gate`
    /// until the first build is done.
    pub fn spawn(self, root: ServeRoot, gate: Arc<ReadyGate>) -> JoinHandle<()> {
        std::thread::spawn(move || {
            for request in self.server.incoming_requests() {
                let root = root.clone();
                gate.execute_when_ready(move || {
                    if let Err(err) = respond(request, &root.get()) {
                        tracing::warn!(error = %err, "request failed");
                    }
                });
            }
        })
    }

    /// Stop accepting. The thread from [`BoundServer::spawn`] then exits.
    pub fn unblocker(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }
}
