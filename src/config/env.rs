use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    TransientDir,
    FfmpegPath,
    FfmpegPreset,
    MaxUploadBytes,
    StrictExtensions,
    SessionTtlSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::TransientDir => "CONVERTER_TEMP_DIR",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::FfmpegPreset => "FFMPEG_PRESET",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
            EnvKey::StrictExtensions => "STRICT_EXTENSIONS",
            EnvKey::SessionTtlSecs => "SESSION_TTL_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
