use std::io;

use bytes::Bytes;
use tracing::{error, info};
use uuid::Uuid;

use super::dto::{FormatsResponse, StatusResponse};
use super::error::ConvertError;
use super::model::{
    source_mime, ConvertedMedia, UploadedMedia, ALLOWED_EXTENSIONS, OUTPUT_FILENAME, OUTPUT_MIME,
};
use super::session::{SessionPhase, SourceInfo, Staging};
use crate::state::AppState;

pub struct ConverterService;

impl ConverterService {
    // --- UPLOAD ---

    pub async fn upload(
        state: AppState,
        session_id: Uuid,
        media: UploadedMedia,
    ) -> Result<SourceInfo, ConvertError> {
        if state.sessions.snapshot(session_id).phase == SessionPhase::Converting {
            return Err(ConvertError::Busy);
        }

        let controller = state.controller.clone();
        let file_name = media.file_name.clone();
        let input = tokio::task::spawn_blocking(move || {
            controller.stage_input(&media.bytes, &media.extension)
        })
        .await
        .map_err(|e| ConvertError::Staging(io::Error::other(e)))??;

        let source = SourceInfo {
            input_id: input.id(),
            file_name,
            extension: input.extension().to_string(),
            size: input.size(),
            mime: source_mime(input.extension()),
        };

        match state.sessions.install_staged(session_id, input, source.clone()) {
            Staging::Installed { replaced } => {
                if let Some(old) = replaced {
                    info!("Session {} replaced staged input {}", session_id, old.id());
                    state.controller.finalize(old, None);
                }
                Ok(source)
            }
            Staging::Rejected(input) => {
                state.controller.finalize(input, None);
                Err(ConvertError::Busy)
            }
        }
    }

    // --- CONVERSION ---

    pub async fn start(state: AppState, session_id: Uuid) -> Result<ConvertedMedia, ConvertError> {
        let input = state.sessions.begin_conversion(session_id)?;
        info!("Session {} converting input {}", session_id, input.id());

        // Detached so the session leaves Converting even if the client goes away.
        let controller = state.controller.clone();
        let sessions = state.sessions.clone();
        let task = tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(move || controller.convert(input)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Conversion task for session {} aborted: {}", session_id, e);
                    Err(ConvertError::Transcode(format!("conversion task aborted: {e}")))
                }
            };

            sessions.complete_conversion(session_id, &outcome);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Conversion of session {} did not complete: {}", session_id, e);
                let outcome = Err(ConvertError::Transcode(format!("conversion task aborted: {e}")));
                state.sessions.complete_conversion(session_id, &outcome);
                outcome
            }
        }
    }

    pub async fn status(state: AppState, session_id: Uuid) -> StatusResponse {
        let snapshot = state.sessions.snapshot(session_id);
        let job = snapshot
            .source
            .as_ref()
            .and_then(|source| state.controller.job(source.input_id));

        StatusResponse {
            phase: snapshot.phase,
            source: snapshot.source,
            error: snapshot.last_error,
            converted_size: snapshot.converted_size,
            job,
        }
    }

    // --- DELIVERY ---

    pub async fn download(state: AppState, session_id: Uuid) -> Result<ConvertedMedia, ConvertError> {
        let media = state.sessions.take_download(session_id)?;
        info!("Session {} downloaded {} bytes", session_id, media.size());
        Ok(media)
    }

    pub async fn preview(state: AppState, session_id: Uuid) -> Result<(Bytes, String), ConvertError> {
        let (path, mime) = state
            .sessions
            .staged_file(session_id)
            .ok_or(ConvertError::NothingStaged)?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            error!("Failed to read staged input {}: {}", path.display(), e);
            ConvertError::NothingStaged
        })?;

        Ok((Bytes::from(bytes), mime))
    }

    // --- SESSION ---

    pub async fn end_session(state: AppState, session_id: Uuid) -> bool {
        let Some(session) = state.sessions.end(session_id) else {
            return false;
        };

        if let Some(input) = session.into_staged() {
            state.controller.finalize(input, None);
        }
        info!("Session {} ended", session_id);
        true
    }

    pub async fn formats(state: AppState) -> FormatsResponse {
        FormatsResponse {
            extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            strict: state.controller.strict_extensions(),
            output_file_name: OUTPUT_FILENAME.to_string(),
            output_mime: OUTPUT_MIME.to_string(),
        }
    }
}
