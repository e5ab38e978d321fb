use std::path::Path;

use common::error::AppError;
use tracing::debug;

/// Extracts plain text from an uploaded file based on its extension.
///
/// PDFs go through `pdf-extract` on a blocking thread; everything else is
/// treated as UTF-8 text. Unsupported or undecodable content is a
/// [`AppError::Validation`] so callers can report it as a bad upload rather
/// than a server fault.
pub async fn extract_text(bytes: Vec<u8>, file_name: &str) -> Result<String, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("pdf") => extract_pdf_text(bytes).await,
        Some("txt" | "md" | "markdown" | "text") | None => decode_utf8(file_name, bytes),
        Some(other) => Err(AppError::Validation(format!(
            "Unsupported file type .{other}, expected .txt, .md, or .pdf"
        ))),
    }
}

async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map(|s| s.trim().to_string())
    })
    .await?
    .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))?;

    debug!(chars = text.len(), "extracted pdf text layer");
    Ok(text)
}

fn decode_utf8(file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
    String::from_utf8(bytes)
        .map_err(|_| AppError::Validation(format!("File {file_name} is not valid UTF-8 text")))
}
