use utoipa::OpenApi;
use crate::modules::converter::dto::*;
use crate::modules::converter::model::{JobStatus, TranscodeJob};
use crate::modules::converter::session::{SessionPhase, SourceInfo};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::converter::handler::upload_video,
        crate::modules::converter::handler::start_conversion,
        crate::modules::converter::handler::get_status,
        crate::modules::converter::handler::download_video,
        crate::modules::converter::handler::preview_upload,
        crate::modules::converter::handler::end_session,
        crate::modules::converter::handler::list_formats,
    ),
    components(
        schemas(
            SourceInfo, SessionPhase, ConvertResponse, StatusResponse, FormatsResponse,
            TranscodeJob, JobStatus,
        )
    ),
    tags(
        (name = "Converter", description = "Upload a video and download it as MP4")
    )
)]
pub struct ApiDoc;
