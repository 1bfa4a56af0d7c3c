//! File candidates: what the user offers, and the PDF the session holds.
//!
//! A [`FileCandidate`] is anything the user dropped or picked: a name, a
//! declared MIME type and the bytes. Only a candidate declaring exactly
//! `application/pdf` can become the session's [`SelectedFile`].
//!
//! Candidates come from a local path or an HTTP(S) URL via
//! [`load_candidate`]. The declared type of a local file comes from a
//! known extension; only an unknown or missing extension falls back to the
//! `%PDF` magic bytes. For downloads the `Content-Type` header wins when it
//! names a concrete type.

use crate::error::AugmenterError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// The only MIME type the backend accepts.
pub const PDF_MIME: &str = "application/pdf";

/// A file offered for selection, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }
}

/// The PDF currently held by a session.
///
/// Only constructible from a candidate that declares `application/pdf`, so
/// holding one is proof the type check passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content: Vec<u8>,
}

impl SelectedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &'static str {
        PDF_MIME
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl TryFrom<FileCandidate> for SelectedFile {
    type Error = AugmenterError;

    fn try_from(candidate: FileCandidate) -> Result<Self, Self::Error> {
        if !candidate.is_pdf() {
            return Err(AugmenterError::NotAPdf {
                name: candidate.name,
                mime_type: candidate.mime_type,
            });
        }
        Ok(Self {
            name: candidate.name,
            content: candidate.content,
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Guess a MIME type from the file name, falling back to content.
///
/// A recognised extension always wins, so `notes.txt` stays `text/plain`
/// even when it starts with `%PDF`.
pub fn sniff_mime(name: &str, content: &[u8]) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ if content.starts_with(b"%PDF") => PDF_MIME,
        _ => "application/octet-stream",
    }
}

/// Load a candidate from a local path or an HTTP(S) URL.
///
/// Errors here are about getting the bytes at all (missing file, failed
/// download). Whether the result is a PDF is decided later by the session.
pub async fn load_candidate(input: &str, timeout_secs: u64) -> Result<FileCandidate, AugmenterError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

async fn load_local(path: &Path) -> Result<FileCandidate, AugmenterError> {
    let content = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AugmenterError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AugmenterError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = sniff_mime(&name, &content);
    debug!("Loaded {} ({} bytes, {})", path.display(), content.len(), mime);

    Ok(FileCandidate::new(name, mime, content))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<FileCandidate, AugmenterError> {
    info!("Downloading from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AugmenterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AugmenterError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AugmenterError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AugmenterError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "application/octet-stream");

    let name = filename_from_url(url);
    let content = response
        .bytes()
        .await
        .map_err(|e| AugmenterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let mime = header_mime.unwrap_or_else(|| sniff_mime(&name, &content).to_string());
    info!("Downloaded {} ({} bytes, {})", name, content.len(), mime);

    Ok(FileCandidate::new(name, mime, content))
}

/// Extract a reasonable filename from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}

/// Path a decoded image is written to inside `dir`.
pub fn image_output_path(dir: &Path, stem: &str, index: usize, format: Option<&str>) -> PathBuf {
    dir.join(format!("{stem}-image-{}.{}", index + 1, format.unwrap_or("bin")))
}
