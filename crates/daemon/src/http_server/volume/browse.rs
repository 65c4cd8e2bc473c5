use std::io::{self, Write};
use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use common::auth::{AccessError, Authorized, Capability};
use common::volume::{features, PathError, Privacy, Volume, VolumeEntry};

use super::blocking;
use crate::http_server::caller::Caller;
use crate::http_server::error::ApiError;
use crate::ServiceState;

/// Text files up to this size are returned inline
pub const MAX_INLINE_TEXT_BYTES: u64 = 8 << 20;

/// Non `text/*` types that are still worth showing inline
const INLINE_TEXT_TYPES: &[&str] = &[
    "application/sql",
    "application/x-shellscript",
    "application/x-sh",
    "application/x-ruby",
    "application/x-yaml",
];

/// Archive bytes reach the response body in chunks of about this size
const ZIP_CHUNK_BYTES: usize = 64 << 10;
/// Chunks allowed in flight between the archive writer and the body
const ZIP_CHANNEL_DEPTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    pub raw: Option<String>,
    pub download: Option<String>,
    pub compress: Option<String>,
    pub hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BrowseResponse {
    pub volume: String,
    #[serde(flatten)]
    pub entry: VolumeEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<VolumeEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// The share code the caller arrived with, for building further links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc: Option<String>,
}

pub async fn root_handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path(volume): Path<String>,
    Query(query): Query<BrowseQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    browse(state, caller, volume, String::new(), query, request).await
}

pub async fn handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path((volume, path)): Path<(String, String)>,
    Query(query): Query<BrowseQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    browse(state, caller, volume, path, query, request).await
}

async fn browse(
    state: ServiceState,
    caller: Caller,
    volume_name: String,
    path: String,
    query: BrowseQuery,
    request: Request,
) -> Result<Response, ApiError> {
    let authorized = caller
        .authorize(&state, &volume_name, &path, false)
        .await?;
    let volume = authorized.volume.clone();
    let capability = authorized.capability.clone();

    let (entry, resolved) = {
        let authorized = authorized.clone();
        let path = path.clone();
        blocking(move || -> Result<_, PathError> {
            let resolved = authorized.resolve(&path)?;
            let metadata = std::fs::metadata(&resolved)?;
            Ok((VolumeEntry::from_metadata(&path, &metadata), resolved))
        })
        .await?
    };

    if entry.is_dir && !can_list(&volume, capability.as_ref(), &path) {
        tracing::info!(volume = volume.name(), path, "directory listing refused");
        return Err(AccessError::NotPermitted.into());
    }

    if query.raw.is_some() || query.download.is_some() {
        if entry.is_dir {
            return Err(ApiError::bad_request("cannot download a directory"));
        }
        return serve_file(resolved, &entry, query.download.is_some(), request).await;
    }

    let sc = capability
        .as_ref()
        .and_then(Capability::share_code)
        .map(|share| share.code.clone());

    if entry.is_dir {
        if let Some(compress) = query.compress.as_deref().filter(|c| !c.is_empty()) {
            volume.require_feature(features::COMPRESS)?;
            return match compress {
                "zip" => zip_response(authorized, path).await,
                _ => Err(ApiError::bad_request("unsupported compression type")),
            };
        }

        let entries = {
            let volume = volume.clone();
            blocking(move || volume.entries(&path)).await?
        };
        return Ok(Json(BrowseResponse {
            volume: volume.name().to_string(),
            entry,
            entries: Some(entries),
            content: None,
            hash: None,
            sc,
        })
        .into_response());
    }

    let content = if is_inline_text(&entry.mime_type) && entry.size <= MAX_INLINE_TEXT_BYTES {
        tokio::fs::read(&resolved)
            .await
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    } else {
        None
    };

    let hash = match query.hash {
        Some(_) => Some(blocking(move || sha256_file(&resolved)).await?),
        None => None,
    };

    Ok(Json(BrowseResponse {
        volume: volume.name().to_string(),
        entry,
        entries: None,
        content,
        hash,
        sc,
    })
    .into_response())
}

/// Directory listings on unlisted volumes need a capability that covers
///  the path. Everything else was already settled by the gate.
fn can_list(volume: &Volume, capability: Option<&Capability>, path: &str) -> bool {
    match volume.privacy() {
        Privacy::Unlisted => capability.is_some_and(|c| c.can_access(volume, path, false)),
        Privacy::Public | Privacy::Private => true,
    }
}

fn is_inline_text(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || INLINE_TEXT_TYPES.contains(&mime_type)
}

fn attachment(file_name: &str) -> HeaderValue {
    let file_name: String = file_name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

async fn serve_file(
    resolved: PathBuf,
    entry: &VolumeEntry,
    download: bool,
    request: Request,
) -> Result<Response, ApiError> {
    let mut response = match ServeFile::new(resolved).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    if download {
        response
            .headers_mut()
            .insert(CONTENT_DISPOSITION, attachment(&entry.name));
    }
    Ok(response)
}

fn sha256_file(path: &std::path::Path) -> Result<String, std::io::Error> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

async fn zip_response(authorized: Authorized, path: String) -> Result<Response, ApiError> {
    let name = std::path::Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| authorized.volume.name().to_string());

    // Walk up front so a bad directory still gets a proper status
    let files = {
        let volume = authorized.volume.clone();
        let path = path.clone();
        blocking(move || volume.walk_files(&path)).await?
    };

    let (tx, rx) = mpsc::channel(ZIP_CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || {
        let mut sink = ChunkWriter::new(tx.clone());
        let result = zip_directory(&authorized, &path, &files, &mut sink)
            .and_then(|()| Ok(sink.flush()?));
        if let Err(e) = result {
            tracing::warn!(volume = authorized.volume.name(), path, error = %e, "zip archive aborted");
            let _ = tx.blocking_send(Err(io::Error::new(io::ErrorKind::Other, "zip archive aborted")));
        }
    });

    let body = Body::from_stream(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (CONTENT_DISPOSITION, attachment(&format!("{}.zip", name))),
        ],
        body,
    )
        .into_response())
}

/// Zip `files` into `out`, named relative to `path`. Each file is resolved
///  again for the caller before it is opened; files that no longer
///  resolve are left out.
fn zip_directory<W: Write>(
    authorized: &Authorized,
    path: &str,
    files: &[String],
    out: W,
) -> anyhow::Result<()> {
    let base = path.trim_end_matches('/');
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new_stream(out);

    let mut written = 0usize;
    for file in files {
        let resolved = match authorized.resolve(file) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::debug!(path = file, error = %e, "leaving file out of zip archive");
                continue;
            }
        };
        let name = file
            .strip_prefix(base)
            .unwrap_or(file)
            .trim_start_matches('/');
        writer.start_file(name, options)?;
        let mut source = std::fs::File::open(resolved)?;
        io::copy(&mut source, &mut writer)?;
        written += 1;
    }

    writer.finish()?;
    tracing::debug!(volume = authorized.volume.name(), path, files = written, "streamed zip archive");
    Ok(())
}

/// Blocking writer that hands fixed-size chunks to an async response body.
///  Fails with `BrokenPipe` once the body has been dropped.
struct ChunkWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: Vec<u8>,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(ZIP_CHUNK_BYTES),
        }
    }

    fn send(&mut self) -> io::Result<()> {
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(ZIP_CHUNK_BYTES));
        self.tx
            .blocking_send(Ok(Bytes::from(chunk)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= ZIP_CHUNK_BYTES {
            self.send()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.send()?;
        }
        Ok(())
    }
}
