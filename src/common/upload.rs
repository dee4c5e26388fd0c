use crate::common::response::ApiError;
use crate::modules::converter::model::UploadedMedia;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use bytes::BytesMut;
use futures_util::StreamExt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info};

/// Multipart field carrying the video.
pub const VIDEO_FIELD: &str = "video";

const INITIAL_CAPACITY: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Cannot tell the file type: no extension and no known content type")]
    UnknownType,

    #[error("File exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },

    #[error("Upload interrupted: {0}")]
    Interrupted(#[source] MultipartError),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::UnknownType => StatusCode::BAD_REQUEST,
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Interrupted(e) => e.status(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        ApiError(e.to_string(), e.status_code())
    }
}

/// Buffers one multipart file field in memory, refusing anything larger than
/// `limit` bytes.
pub async fn read_video_field(
    mut field: Field<'_>,
    limit: usize,
) -> Result<UploadedMedia, UploadError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let extension = extension_for(file_name.as_deref(), content_type.as_deref())
        .ok_or(UploadError::UnknownType)?;

    debug!(
        "Receiving {:?} ({:?}) as .{}",
        file_name, content_type, extension
    );

    let mut buffer = BytesMut::with_capacity(INITIAL_CAPACITY.min(limit));

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Stream error: {}", e);
                return Err(UploadError::Interrupted(e));
            }
        };

        if buffer.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    info!("Received upload {:?}: {} bytes", file_name, buffer.len());

    Ok(UploadedMedia {
        bytes: buffer.freeze(),
        extension,
        file_name,
    })
}

/// File name extension first, then the first extension registered for the
/// declared content type.
pub fn extension_for(file_name: Option<&str>, content_type: Option<&str>) -> Option<String> {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .or_else(|| {
            content_type
                .and_then(mime_guess::get_mime_extensions_str)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_file_name() {
        assert_eq!(
            extension_for(Some("holiday.WMV"), Some("video/mp4")).as_deref(),
            Some("WMV")
        );
    }

    #[test]
    fn extension_falls_back_to_content_type() {
        let ext = extension_for(Some("recording"), Some("video/x-matroska")).expect("known type");
        assert_eq!(
            mime_guess::from_ext(&ext).first_raw(),
            Some("video/x-matroska")
        );
    }

    #[test]
    fn size_limit_maps_to_payload_too_large() {
        let e = UploadError::TooLarge { limit: 10 };
        assert_eq!(e.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(e.to_string(), "File exceeds the 10 byte upload limit");
        assert_eq!(UploadError::UnknownType.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_file_type() {
        assert_eq!(extension_for(None, None), None);
        assert_eq!(extension_for(Some("noext"), Some("application/x-unknown-thing")), None);
    }
}
