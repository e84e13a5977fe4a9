//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Textract's synchronous API takes the document as raw bytes, so the whole
//! file is read once up front. Local inputs are validated before any network
//! call is made: a missing file fails with
//! [`Pdf2JsonError::MissingInputFile`] and never reaches OCR.

use crate::error::Pdf2JsonError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default input file name used by the CLI.
pub const DEFAULT_INPUT: &str = "sample_menu.pdf";

/// A document loaded into memory, with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub source: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input string into memory.
///
/// URLs are downloaded with an explicit timeout; local paths are read
/// whole. With `require_pdf_magic`, content not starting with `%PDF` is
/// rejected.
pub async fn load_input(
    input: &str,
    timeout_secs: u64,
    require_pdf_magic: bool,
) -> Result<LoadedInput, Pdf2JsonError> {
    if input.trim().is_empty() {
        return Err(Pdf2JsonError::InvalidInput {
            input: input.to_string(),
        });
    }
    let (bytes, path) = if is_url(input) {
        (download_url(input, timeout_secs).await?, PathBuf::from(input))
    } else {
        let path = PathBuf::from(input);
        (read_local(&path).await?, path)
    };

    if require_pdf_magic {
        check_pdf_magic(&bytes, path)?;
    }

    Ok(LoadedInput {
        source: input.to_string(),
        bytes,
    })
}

/// Reject content that does not start with the `%PDF` magic bytes.
pub fn check_pdf_magic(bytes: &[u8], path: PathBuf) -> Result<(), Pdf2JsonError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(Pdf2JsonError::NotAPdf { path, magic })
}

async fn read_local(path: &Path) -> Result<Vec<u8>, Pdf2JsonError> {
    if !path.exists() {
        return Err(Pdf2JsonError::MissingInputFile { path: path.to_path_buf() });
    }
    if path.is_dir() {
        return Err(Pdf2JsonError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Pdf2JsonError::PermissionDenied { path: path.to_path_buf() })
        }
        Err(_) => Err(Pdf2JsonError::MissingInputFile { path: path.to_path_buf() }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, Pdf2JsonError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2JsonError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let to_error = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2JsonError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2JsonError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(to_error)?;

    if !response.status().is_success() {
        return Err(Pdf2JsonError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(to_error)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
