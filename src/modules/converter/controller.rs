use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempPath;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::ConvertError;
use super::model::{
    is_mp4_signature, ConvertedMedia, JobStatus, TranscodeJob, ALLOWED_EXTENSIONS,
    OUTPUT_EXTENSION,
};
use crate::infrastructure::ffmpeg::transcoder::{TranscodeProfile, Transcoder};
use crate::infrastructure::storage::transient::{TransientStorage, INPUT_PREFIX, OUTPUT_PREFIX};

/// A staged upload. Owning the handle means owning its transient file.
#[derive(Debug)]
pub struct InputHandle {
    id: Uuid,
    extension: String,
    size: usize,
    path: TempPath,
    busy: AtomicBool,
}

impl InputHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// A completed transcode output waiting to be finalized.
#[derive(Debug)]
pub struct OutputHandle {
    job_id: Uuid,
    path: TempPath,
}

impl OutputHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sequences one upload through staging, transcoding and delivery.
///
/// Every operation is synchronous; callers on an async runtime are expected to
/// move them onto the blocking pool.
#[derive(Clone)]
pub struct WorkflowController {
    storage: TransientStorage,
    transcoder: Arc<dyn Transcoder>,
    profile: TranscodeProfile,
    strict_extensions: bool,
    jobs: Arc<Mutex<HashMap<Uuid, TranscodeJob>>>,
}

impl WorkflowController {
    pub fn new(
        storage: TransientStorage,
        transcoder: Arc<dyn Transcoder>,
        profile: TranscodeProfile,
        strict_extensions: bool,
    ) -> Self {
        Self {
            storage,
            transcoder,
            profile,
            strict_extensions,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn storage(&self) -> &TransientStorage {
        &self.storage
    }

    pub fn strict_extensions(&self) -> bool {
        self.strict_extensions
    }

    pub fn stage_input(&self, bytes: &[u8], extension: &str) -> Result<InputHandle, ConvertError> {
        let extension = normalize_extension(extension, self.strict_extensions)?;
        if bytes.is_empty() {
            return Err(ConvertError::InvalidUpload("uploaded file is empty".to_string()));
        }

        let path = self
            .storage
            .write(INPUT_PREFIX, &extension, bytes)
            .map_err(|e| {
                error!("Failed to stage {} byte upload: {}", bytes.len(), e);
                ConvertError::Staging(e)
            })?;

        let handle = InputHandle {
            id: Uuid::new_v4(),
            extension,
            size: bytes.len(),
            path,
            busy: AtomicBool::new(false),
        };

        info!(
            "Staged input {} ({} bytes) at {}",
            handle.id,
            handle.size,
            handle.path().display()
        );

        Ok(handle)
    }

    pub fn transcode(&self, input: &InputHandle) -> Result<OutputHandle, ConvertError> {
        let _guard = BusyGuard::acquire(&input.busy).ok_or_else(|| {
            warn!("Rejected second transcode of input {} while one is running", input.id);
            ConvertError::Busy
        })?;

        let job = TranscodeJob::pending(input.path());
        let job_id = job.id;
        self.jobs.lock().insert(input.id, job);

        let output = match self.storage.reserve(OUTPUT_PREFIX, OUTPUT_EXTENSION) {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to allocate output for job {}: {}", job_id, e);
                self.fail_job(input.id, e.to_string());
                return Err(ConvertError::Staging(e));
            }
        };

        self.update_job(input.id, |job| {
            job.status = JobStatus::Running;
            job.output_path = Some(output.to_path_buf());
        });

        info!(
            "Transcoding job {}: {} -> {}",
            job_id,
            input.path().display(),
            output.display()
        );

        let result = self
            .transcoder
            .transcode(input.path(), &output, &self.profile)
            .map_err(|e| format!("{e:#}"))
            .and_then(|()| verify_mp4(&output));

        match result {
            Ok(()) => {
                self.update_job(input.id, |job| job.status = JobStatus::Succeeded);
                info!("Job {} succeeded", job_id);
                Ok(OutputHandle {
                    job_id,
                    path: output,
                })
            }
            Err(message) => {
                warn!("Job {} failed: {}", job_id, message);
                TransientStorage::release(output);
                self.fail_job(input.id, message.clone());
                Err(ConvertError::Transcode(message))
            }
        }
    }

    /// Reclaims both transient files and hands back the converted bytes when
    /// there are any.
    pub fn finalize(
        &self,
        input: InputHandle,
        output: Option<OutputHandle>,
    ) -> Option<ConvertedMedia> {
        let InputHandle { id, path, .. } = input;
        self.jobs.lock().remove(&id);
        TransientStorage::release(path);

        let OutputHandle { job_id, path } = output?;
        let read = fs::read(&path);
        TransientStorage::release(path);

        match read {
            Ok(bytes) => {
                info!("Delivered job {} ({} bytes)", job_id, bytes.len());
                Some(ConvertedMedia::mp4(bytes))
            }
            Err(e) => {
                error!("Failed to read output of job {}: {}", job_id, e);
                None
            }
        }
    }

    /// Transcodes and finalizes in one step. The input is reclaimed on every
    /// path.
    pub fn convert(&self, input: InputHandle) -> Result<ConvertedMedia, ConvertError> {
        match self.transcode(&input) {
            Ok(output) => self.finalize(input, Some(output)).ok_or_else(|| {
                ConvertError::Transcode("converted file could not be read back".to_string())
            }),
            Err(e) => {
                self.finalize(input, None);
                Err(e)
            }
        }
    }

    /// Current job record for a staged input.
    pub fn job(&self, input_id: Uuid) -> Option<TranscodeJob> {
        self.jobs.lock().get(&input_id).cloned()
    }

    fn update_job(&self, input_id: Uuid, apply: impl FnOnce(&mut TranscodeJob)) {
        if let Some(job) = self.jobs.lock().get_mut(&input_id) {
            apply(job);
        }
    }

    fn fail_job(&self, input_id: Uuid, message: String) {
        self.update_job(input_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(message);
        });
    }
}

/// Lower-cases the extension and rejects anything that is not a plain token.
/// The allow-list only applies in strict mode.
pub fn normalize_extension(raw: &str, strict: bool) -> Result<String, ConvertError> {
    let extension = raw.trim().trim_start_matches('.').to_ascii_lowercase();

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConvertError::InvalidUpload(format!(
            "file extension {raw:?} is not valid"
        )));
    }

    if strict && !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ConvertError::InvalidUpload(format!(
            "unsupported file type .{extension}, expected one of {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    Ok(extension)
}

fn verify_mp4(path: &Path) -> Result<(), String> {
    let mut header = [0u8; 12];
    let read = File::open(path)
        .and_then(|mut file| file.read(&mut header))
        .map_err(|e| format!("could not inspect transcoder output: {e}"))?;

    if is_mp4_signature(&header[..read]) {
        Ok(())
    } else {
        Err("transcoder output is not an MP4 container".to_string())
    }
}
