use crate::error::OcrError;
use axum::extract::Multipart;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// Name of the multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Only the extension is checked; the bytes are passed through untouched.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub format: ImageFormat,
    pub bytes: Bytes,
}

impl UploadedImage {
    pub fn accept(filename: &str, bytes: Bytes) -> Result<Self, OcrError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(OcrError::MissingFile);
        }
        let format = ImageFormat::from_filename(filename).ok_or_else(|| OcrError::UnsupportedFileType {
            filename: filename.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(OcrError::EmptyImage {
                filename: filename.to_string(),
            });
        }
        Ok(Self {
            filename: filename.to_string(),
            format,
            bytes,
        })
    }

    /// Read the image from a multipart form. The `file` field wins; any other
    /// field carrying a filename is accepted as a fallback.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, OcrError> {
        let mut fallback: Option<(String, Bytes)> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| OcrError::InvalidUpload(e.to_string()))?
        {
            let field_name = field.name().unwrap_or("").to_string();
            let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
                continue;
            };
            let data = field
                .bytes()
                .await
                .map_err(|e| OcrError::InvalidUpload(e.to_string()))?;
            debug!("received multipart field '{}' ({}, {} bytes)", field_name, file_name, data.len());

            if field_name == UPLOAD_FIELD {
                return Self::accept(&file_name, data);
            }
            if fallback.is_none() {
                fallback = Some((file_name, data));
            }
        }

        match fallback {
            Some((file_name, data)) => Self::accept(&file_name, data),
            None => Err(OcrError::MissingFile),
        }
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), self.base64())
    }
}
