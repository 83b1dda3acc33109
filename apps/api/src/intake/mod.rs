//! Intake: raw text from an uploaded CV file.
//!
//! PDF goes through `pdf-extract` on the blocking pool; plain text and
//! markdown are read as UTF-8. Word containers and images are rejected:
//! callers paste the text instead.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Text,
    Unsupported(&'static str),
}

/// Decides how to read an upload from its leading bytes, then its declared
/// content type, then its file extension.
pub fn detect_kind(filename: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> UploadKind {
    if bytes.starts_with(PDF_MAGIC) {
        return UploadKind::Pdf;
    }
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return UploadKind::Unsupported("Word documents");
    }

    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    let extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if content_type.starts_with("image/")
        || matches!(extension.as_str(), "png" | "jpg" | "jpeg" | "gif" | "tif" | "tiff" | "webp")
    {
        return UploadKind::Unsupported("images");
    }
    if content_type == "application/pdf" || extension == "pdf" {
        return UploadKind::Pdf;
    }
    if content_type.starts_with("text/") || matches!(extension.as_str(), "txt" | "md" | "markdown") {
        return UploadKind::Text;
    }
    if matches!(extension.as_str(), "doc" | "docx" | "odt" | "rtf") {
        return UploadKind::Unsupported("Word documents");
    }
    // Unknown but valid UTF-8 is treated as text.
    if std::str::from_utf8(bytes).is_ok() {
        return UploadKind::Text;
    }
    UploadKind::Unsupported("this file type")
}

/// Extracts raw CV text from an uploaded file.
pub async fn extract_text(
    filename: Option<&str>,
    content_type: Option<&str>,
    bytes: Bytes,
) -> Result<String, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let kind = detect_kind(filename, content_type, &bytes);
    debug!(?kind, size = bytes.len(), "Extracting text from upload");

    let text = match kind {
        UploadKind::Pdf => extract_pdf(bytes).await?,
        UploadKind::Text => String::from_utf8(bytes.to_vec()).map_err(|_| {
            AppError::Validation("Uploaded text file is not valid UTF-8".to_string())
        })?,
        UploadKind::Unsupported(what) => {
            return Err(AppError::Validation(format!(
                "Uploads of {what} are not supported; upload a PDF or plain-text file, or paste the CV text"
            )));
        }
    };

    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "No text could be extracted from the uploaded file".to_string(),
        ));
    }
    Ok(text)
}

async fn extract_pdf(bytes: Bytes) -> Result<String, AppError> {
    // pdf-extract is CPU-bound; keep it off the async executor.
    // It can also panic on malformed files, which surfaces as a JoinError.
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            warn!("PDF extraction failed: {e}");
            Err(AppError::Validation(format!(
                "Could not read text from the PDF: {e}"
            )))
        }
        Err(e) if e.is_panic() => {
            warn!("PDF extraction panicked on malformed input");
            Err(AppError::Validation(
                "Could not read text from the PDF".to_string(),
            ))
        }
        Err(e) => Err(AppError::Internal(anyhow::anyhow!(
            "spawn_blocking failed in PDF extraction: {e}"
        ))),
    }
}
