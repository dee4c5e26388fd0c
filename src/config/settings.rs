use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use crate::config::env::{self, EnvKey};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub transient_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffmpeg_preset: String,
    pub max_upload_bytes: usize,
    pub strict_extensions: bool,
    pub session_ttl_secs: u64,
}

impl AppConfig {
    pub fn new() -> Self {
        let transient_dir = env::get(EnvKey::TransientDir)
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("video-converter"));

        Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            transient_dir,
            ffmpeg_path: PathBuf::from(env::get_or(EnvKey::FfmpegPath, "ffmpeg")),
            ffmpeg_preset: env::get_or(EnvKey::FfmpegPreset, "fast"),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, DEFAULT_MAX_UPLOAD_BYTES),
            strict_extensions: env::get_parsed(EnvKey::StrictExtensions, false),
            session_ttl_secs: env::get_parsed(EnvKey::SessionTtlSecs, 3600),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
