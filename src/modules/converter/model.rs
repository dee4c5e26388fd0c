use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Extensions offered by the upload dialog.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["wmv", "avi", "mov", "mkv", "flv"];

pub const OUTPUT_FILENAME: &str = "converted_video.mp4";
pub const OUTPUT_MIME: &str = "video/mp4";
pub const OUTPUT_EXTENSION: &str = "mp4";

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub bytes: Bytes,
    pub extension: String,
    pub file_name: Option<String>,
}

impl UploadedMedia {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

pub fn source_mime(extension: &str) -> String {
    mime_guess::from_ext(extension)
        .first_or_octet_stream()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TranscodeJob {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub input_path: PathBuf,
    #[schema(value_type = Option<String>)]
    pub output_path: Option<PathBuf>,
    pub status: JobStatus,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
}

impl TranscodeJob {
    pub fn pending(input_path: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path: input_path.to_path_buf(),
            output_path: None,
            status: JobStatus::Pending,
            error: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// The finished MP4, held in memory until it is downloaded.
#[derive(Debug, Clone)]
pub struct ConvertedMedia {
    pub bytes: Bytes,
    pub file_name: &'static str,
    pub mime: &'static str,
}

impl ConvertedMedia {
    pub fn mp4(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: OUTPUT_FILENAME,
            mime: OUTPUT_MIME,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// ISO base media files open with a box whose type is `ftyp`.
pub fn is_mp4_signature(header: &[u8]) -> bool {
    header.len() >= 8 && &header[4..8] == b"ftyp"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp4_signature_detection() {
        assert!(is_mp4_signature(b"\x00\x00\x00\x20ftypisom\x00\x00\x02\x00"));
        assert!(!is_mp4_signature(b"RIFF\x00\x00\x00\x00AVI "));
        assert!(!is_mp4_signature(b"ftyp"));
        assert!(!is_mp4_signature(b""));
    }

    #[test]
    fn converted_media_is_always_mp4() {
        let media = ConvertedMedia::mp4(vec![1, 2, 3]);
        assert_eq!(media.file_name, "converted_video.mp4");
        assert_eq!(media.mime, "video/mp4");
        assert_eq!(media.size(), 3);
    }

    #[test]
    fn source_mime_from_extension() {
        assert_eq!(source_mime("avi"), "video/x-msvideo");
        assert_eq!(source_mime("no-such-ext"), "application/octet-stream");

        let media = UploadedMedia {
            bytes: Bytes::from_static(b"abc"),
            extension: "avi".to_string(),
            file_name: Some("clip.avi".to_string()),
        };
        assert_eq!(media.size(), 3);
    }

    #[test]
    fn new_jobs_start_pending() {
        let job = TranscodeJob::pending(Path::new("/tmp/upload-x.wmv"));
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.output_path.is_none());
    }
}
