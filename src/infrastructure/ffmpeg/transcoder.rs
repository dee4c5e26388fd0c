use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

const STDERR_TAIL_LINES: usize = 4;

/// Codec settings handed to the external transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TranscodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
}

impl TranscodeProfile {
    /// H.264 + AAC in an MP4 container.
    pub fn mp4(preset: &str) -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: preset.to_string(),
        }
    }
}

/// The opaque media conversion capability.
///
/// Implementations either leave a complete file at `output` and return `Ok`,
/// or return an error describing why the source was rejected.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, input: &Path, output: &Path, profile: &TranscodeProfile) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// First line of `ffmpeg -version`.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to launch {}", self.binary.display()))?;

        if !output.status.success() {
            bail!(diagnostic(&output.stderr, &output.status.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .next()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("ffmpeg -version printed nothing"))
    }

    fn command(&self, input: &Path, output: &Path, profile: &TranscodeProfile) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input)
            .args(["-c:v", profile.video_codec.as_str()])
            .args(["-preset", profile.preset.as_str()])
            .args(["-pix_fmt", "yuv420p"])
            .args(["-c:a", profile.audio_codec.as_str()])
            .args(["-movflags", "+faststart"])
            .args(["-f", "mp4"])
            .arg(output)
            .stdin(Stdio::null());
        cmd
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path, profile: &TranscodeProfile) -> Result<()> {
        let mut cmd = self.command(input, output, profile);
        debug!("Executing ffmpeg: {:?}", cmd);

        let result = cmd
            .output()
            .with_context(|| format!("failed to launch {}", self.binary.display()))?;

        if !result.status.success() {
            bail!(diagnostic(&result.stderr, &result.status.to_string()));
        }

        info!("ffmpeg finished: {} -> {}", input.display(), output.display());
        Ok(())
    }
}

/// Condenses ffmpeg's stderr to its last few meaningful lines.
fn diagnostic(stderr: &[u8], status: &str) -> String {
    let text = String::from_utf8_lossy(stderr);
    let mut tail: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .take(STDERR_TAIL_LINES)
        .collect();
    tail.reverse();

    if tail.is_empty() {
        format!("ffmpeg {status}")
    } else {
        format!("ffmpeg {status}: {}", tail.join(" | "))
    }
}
