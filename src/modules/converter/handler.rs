use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::upload::{read_video_field, VIDEO_FIELD};
use crate::modules::converter::dto::*;
use crate::modules::converter::service::ConverterService;
use crate::modules::converter::session::{SourceInfo, SESSION_COOKIE};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use tower_cookies::{Cookie, Cookies};
use tracing::info;

/// Upload a video
/// Stages the file for conversion, replacing any earlier upload of this session
#[utoipa::path(
    post,
    path = "/api/v1/convert/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File staged", body = ApiResponse<SourceInfo>),
        (status = 400, description = "Bad Request"),
        (status = 409, description = "Conversion in progress"),
        (status = 413, description = "Payload Too Large"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Converter"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    cookies: Cookies,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let session_id = state.sessions.resolve(&cookies);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return ApiError(format!("Malformed multipart body: {}", e), e.status())
                    .into_response();
            }
        };

        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let media = match read_video_field(field, state.config.max_upload_bytes).await {
            Ok(media) => media,
            Err(e) => return ApiError::from(e).into_response(),
        };

        info!(
            "Session {} uploading {:?} ({} bytes)",
            session_id,
            media.file_name,
            media.size()
        );

        return match ConverterService::upload(state, session_id, media).await {
            Ok(source) => ApiSuccess(
                ApiResponse::success(source, "File uploaded successfully!"),
                StatusCode::OK,
            )
            .into_response(),
            Err(e) => ApiError::from(e).into_response(),
        };
    }

    ApiError::bad_request("No video field found in multipart request").into_response()
}

/// Convert the staged video to MP4
/// Blocks until the transcoder finishes
#[utoipa::path(
    post,
    path = "/api/v1/convert/start",
    responses(
        (status = 200, description = "Conversion successful", body = ApiResponse<ConvertResponse>),
        (status = 400, description = "Nothing uploaded"),
        (status = 409, description = "Conversion already in progress"),
        (status = 422, description = "Transcoder rejected the file")
    ),
    tag = "Converter"
)]
pub async fn start_conversion(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    let session_id = state.sessions.resolve(&cookies);

    match ConverterService::start(state, session_id).await {
        Ok(media) => ApiSuccess(
            ApiResponse::success(ConvertResponse::from_media(&media), "Conversion successful!"),
            StatusCode::OK,
        )
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Current state of this session's conversion
#[utoipa::path(
    get,
    path = "/api/v1/convert/status",
    responses(
        (status = 200, description = "Session status", body = ApiResponse<StatusResponse>)
    ),
    tag = "Converter"
)]
pub async fn get_status(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    let session_id = state.sessions.resolve(&cookies);
    let status = ConverterService::status(state, session_id).await;

    ApiSuccess(
        ApiResponse::success(status, "Status retrieved successfully"),
        StatusCode::OK,
    )
    .into_response()
}

/// Download the converted MP4
/// The file is handed out once
#[utoipa::path(
    get,
    path = "/api/v1/convert/download",
    responses(
        (status = 200, description = "converted_video.mp4", body = Vec<u8>, content_type = "video/mp4"),
        (status = 404, description = "Nothing to download")
    ),
    tag = "Converter"
)]
pub async fn download_video(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    let session_id = state.sessions.resolve(&cookies);

    match ConverterService::download(state, session_id).await {
        Ok(media) => (
            [
                (header::CONTENT_TYPE, media.mime.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", media.file_name),
                ),
            ],
            media.bytes,
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Play back the staged upload
#[utoipa::path(
    get,
    path = "/api/v1/convert/preview",
    responses(
        (status = 200, description = "Staged upload", body = Vec<u8>),
        (status = 400, description = "Nothing uploaded")
    ),
    tag = "Converter"
)]
pub async fn preview_upload(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    let session_id = state.sessions.resolve(&cookies);

    match ConverterService::preview(state, session_id).await {
        Ok((bytes, mime)) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// End the session and discard its files
#[utoipa::path(
    delete,
    path = "/api/v1/convert/session",
    responses(
        (status = 200, description = "Session ended")
    ),
    tag = "Converter"
)]
pub async fn end_session(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    let session_id = state.sessions.resolve(&cookies);
    ConverterService::end_session(state, session_id).await;

    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);

    ApiSuccess(ApiResponse::success((), "Session ended"), StatusCode::OK).into_response()
}

/// File types offered by the upload dialog
#[utoipa::path(
    get,
    path = "/api/v1/convert/formats",
    responses(
        (status = 200, description = "Accepted formats", body = ApiResponse<FormatsResponse>)
    ),
    tag = "Converter"
)]
pub async fn list_formats(State(state): State<AppState>) -> impl IntoResponse {
    let formats = ConverterService::formats(state).await;

    ApiSuccess(
        ApiResponse::success(formats, "Formats retrieved successfully"),
        StatusCode::OK,
    )
    .into_response()
}
