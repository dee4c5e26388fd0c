use serde::Serialize;
use utoipa::ToSchema;

use super::model::{ConvertedMedia, TranscodeJob};
use super::session::{SessionPhase, SourceInfo};

#[derive(Debug, Serialize, ToSchema)]
pub struct ConvertResponse {
    pub file_name: String,
    pub mime: String,
    pub size: usize,
    pub download_url: String,
}

impl ConvertResponse {
    pub fn from_media(media: &ConvertedMedia) -> Self {
        Self {
            file_name: media.file_name.to_string(),
            mime: media.mime.to_string(),
            size: media.size(),
            download_url: "/api/v1/convert/download".to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub phase: SessionPhase,
    pub source: Option<SourceInfo>,
    pub error: Option<String>,
    pub converted_size: Option<usize>,
    pub job: Option<TranscodeJob>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FormatsResponse {
    pub extensions: Vec<String>,
    pub strict: bool,
    pub output_file_name: String,
    pub output_mime: String,
}
