//! Deterministic stand-ins for ffmpeg.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use anyhow::{bail, Result};
use tempfile::TempDir;

use super::controller::WorkflowController;
use crate::infrastructure::ffmpeg::transcoder::{TranscodeProfile, Transcoder};
use crate::infrastructure::storage::transient::TransientStorage;

/// Smallest header that passes the `ftyp` check, followed by filler.
pub const FAKE_MP4: &[u8] = b"\x00\x00\x00\x18ftypisom\x00\x00\x02\x00isomiso2\x00\x00\x00\x08free";

enum Behavior {
    WriteMp4,
    WriteGarbage,
    Fail(String),
    FailOnMarker(Vec<u8>),
    Gated { entered: Arc<Barrier>, release: Arc<Barrier> },
}

pub struct FakeTranscoder {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn mp4() -> Self {
        Self::with(Behavior::WriteMp4)
    }

    pub fn garbage_output() -> Self {
        Self::with(Behavior::WriteGarbage)
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Behavior::Fail(message.to_string()))
    }

    /// Fails whenever the staged input contains `marker`.
    pub fn fail_on_marker(marker: &[u8]) -> Self {
        Self::with(Behavior::FailOnMarker(marker.to_vec()))
    }

    /// Blocks inside the call until the test passes both barriers.
    pub fn gated(entered: Arc<Barrier>, release: Arc<Barrier>) -> Self {
        Self::with(Behavior::Gated { entered, release })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, input: &Path, output: &Path, _profile: &TranscodeProfile) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::WriteMp4 => {}
            Behavior::WriteGarbage => {
                fs::write(output, b"definitely not a movie")?;
                return Ok(());
            }
            Behavior::Fail(message) => bail!("{message}"),
            Behavior::FailOnMarker(marker) => {
                let source = fs::read(input)?;
                if source.windows(marker.len()).any(|w| w == marker.as_slice()) {
                    fs::write(output, b"partial")?;
                    bail!("Invalid data found when processing input");
                }
            }
            Behavior::Gated { entered, release } => {
                entered.wait();
                release.wait();
            }
        }

        fs::write(output, FAKE_MP4)?;
        Ok(())
    }
}

/// A controller over a fresh temporary directory. Keep the `TempDir` alive
/// for the duration of the test.
pub fn controller_with(transcoder: FakeTranscoder) -> (WorkflowController, TempDir) {
    controller_with_shared(Arc::new(transcoder), false)
}

pub fn controller_with_shared(
    transcoder: Arc<FakeTranscoder>,
    strict_extensions: bool,
) -> (WorkflowController, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = TransientStorage::new(dir.path()).expect("storage");
    let controller = WorkflowController::new(
        storage,
        transcoder,
        TranscodeProfile::mp4("ultrafast"),
        strict_extensions,
    );
    (controller, dir)
}
