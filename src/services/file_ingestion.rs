use lopdf::Document;

use crate::errors::{AppError, AppResult};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Source material recovered from an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceMaterial {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

/// PDFs become text; images stay as bytes for an inline multimodal part.
pub fn extract_source(bytes: Vec<u8>, mime_type: &str) -> AppResult<SourceMaterial> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == PDF_MIME_TYPE {
        extract_pdf_text(&bytes).map(SourceMaterial::Text)
    } else if essence.starts_with("image/") {
        check_image(&bytes, &essence)?;
        Ok(SourceMaterial::Image {
            mime_type: essence,
            data: bytes,
        })
    } else {
        Err(AppError::UnsupportedFileType(mime_type.to_string()))
    }
}

/// Text of every page in page order, concatenated without separators.
pub fn extract_pdf_text(bytes: &[u8]) -> AppResult<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| AppError::FileProcessingError(format!("unreadable PDF: {}", e)))?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        let page_text = document.extract_text(&[*page_number]).map_err(|e| {
            AppError::FileProcessingError(format!(
                "failed to extract text from page {}: {}",
                page_number, e
            ))
        })?;
        text.push_str(&page_text);
    }

    log::debug!("Extracted {} characters from PDF", text.len());
    Ok(text)
}

fn check_image(bytes: &[u8], mime_type: &str) -> AppResult<()> {
    if bytes.is_empty() {
        return Err(AppError::FileProcessingError("image upload is empty".to_string()));
    }

    let signature: Option<&[u8]> = match mime_type {
        "image/png" => Some(&b"\x89PNG\r\n\x1a\n"[..]),
        "image/jpeg" | "image/jpg" => Some(&b"\xff\xd8\xff"[..]),
        "image/gif" => Some(&b"GIF8"[..]),
        "image/bmp" => Some(&b"BM"[..]),
        "image/webp" => Some(&b"RIFF"[..]),
        // Other image types are handed to the model unchecked.
        _ => None,
    };

    match signature {
        Some(magic) if !bytes.starts_with(magic) => Err(AppError::FileProcessingError(format!(
            "file does not look like a valid {} image",
            mime_type
        ))),
        _ => Ok(()),
    }
}
