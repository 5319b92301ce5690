//! CV text extraction from uploaded files (PDF or plain text/Markdown).

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Text,
}

/// Decides the kind from the declared content type, falling back to the extension.
pub fn detect_kind(file_name: Option<&str>, content_type: Option<&str>) -> Option<UploadKind> {
    match content_type.map(|c| c.to_ascii_lowercase()) {
        Some(c) if c == "application/pdf" => return Some(UploadKind::Pdf),
        Some(c) if c.starts_with("text/") => return Some(UploadKind::Text),
        _ => {}
    }
    let extension = file_name?.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some(UploadKind::Pdf),
        "txt" | "md" | "markdown" => Some(UploadKind::Text),
        _ => None,
    }
}

/// Extracts plain text. PDF parsing runs on the blocking pool.
pub async fn extract_cv_text(
    file_name: Option<&str>,
    content_type: Option<&str>,
    data: Bytes,
) -> Result<String, AppError> {
    let kind = detect_kind(file_name, content_type).ok_or_else(|| {
        AppError::Validation("Formato no soportado. Sube un PDF o un archivo de texto.".to_string())
    })?;

    let text = match kind {
        UploadKind::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data)
        })
        .await
        .map_err(|e| {
            // pdf-extract panics on some malformed files.
            if e.is_panic() {
                warn!("PDF extraction panicked");
                unreadable_pdf()
            } else {
                AppError::Internal(e.into())
            }
        })?
        .map_err(|e| {
            warn!("PDF extraction failed: {e}");
            unreadable_pdf()
        })?,
        UploadKind::Text => String::from_utf8(data.to_vec()).map_err(|_| {
            AppError::Validation("El archivo no es texto UTF-8 válido.".to_string())
        })?,
    };

    let text = normalize_whitespace(&text);
    debug!("Extracted {} characters from upload", text.chars().count());
    Ok(text)
}

fn unreadable_pdf() -> AppError {
    AppError::Validation("No se pudo leer el PDF.".to_string())
}

/// Trims each line and collapses runs of blank lines to one.
fn normalize_whitespace(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(if line.trim().is_empty() { "" } else { line });
    }
    out.join("\n").trim().to_string()
}
