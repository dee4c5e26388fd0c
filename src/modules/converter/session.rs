use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tower_cookies::{Cookie, Cookies};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::controller::InputHandle;
use super::error::ConvertError;
use super::model::ConvertedMedia;

pub const SESSION_COOKIE: &str = "converter_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Idle,
    Staged,
    Converting,
    Delivered,
    Failed,
}

/// What the user uploaded, as shown back to them.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SourceInfo {
    pub input_id: Uuid,
    pub file_name: Option<String>,
    pub extension: String,
    pub size: usize,
    pub mime: String,
}

#[derive(Debug)]
pub enum SessionState {
    Idle,
    Staged(InputHandle),
    Converting,
    Delivered(ConvertedMedia),
    Failed,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Staged(_) => SessionPhase::Staged,
            SessionState::Converting => SessionPhase::Converting,
            SessionState::Delivered(_) => SessionPhase::Delivered,
            SessionState::Failed => SessionPhase::Failed,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    pub source: Option<SourceInfo>,
    pub last_error: Option<String>,
    touched_at: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            source: None,
            last_error: None,
            touched_at: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.touched_at = Instant::now();
    }

    /// The staged upload, if the session still owns one.
    pub fn into_staged(self) -> Option<InputHandle> {
        match self.state {
            SessionState::Staged(input) => Some(input),
            _ => None,
        }
    }
}

/// Read-only view of a session for status responses.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub source: Option<SourceInfo>,
    pub last_error: Option<String>,
    pub converted_size: Option<usize>,
}

#[derive(Debug)]
pub enum Staging {
    Installed { replaced: Option<InputHandle> },
    Rejected(InputHandle),
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session id from the cookie, issuing a fresh one when absent or mangled.
    pub fn resolve(&self, cookies: &Cookies) -> Uuid {
        let existing = cookies
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
                cookie.set_http_only(true);
                cookie.set_path("/");
                cookies.add(cookie);
                info!("Opened session {}", id);
                id
            }
        };

        self.inner
            .lock()
            .entry(id)
            .or_insert_with(Session::new)
            .touch();

        id
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Puts a freshly staged upload into the session. A previous upload is
    /// handed back for cleanup; while converting the new one is refused.
    pub fn install_staged(&self, id: Uuid, input: InputHandle, source: SourceInfo) -> Staging {
        let mut sessions = self.inner.lock();
        let session = sessions.entry(id).or_insert_with(Session::new);
        session.touch();

        if matches!(session.state, SessionState::Converting) {
            return Staging::Rejected(input);
        }

        let previous = std::mem::replace(&mut session.state, SessionState::Staged(input));
        session.source = Some(source);
        session.last_error = None;

        let replaced = match previous {
            SessionState::Staged(old) => Some(old),
            _ => None,
        };

        Staging::Installed { replaced }
    }

    /// Moves the staged upload out and marks the session busy.
    pub fn begin_conversion(&self, id: Uuid) -> Result<InputHandle, ConvertError> {
        let mut sessions = self.inner.lock();
        let session = sessions.entry(id).or_insert_with(Session::new);
        session.touch();

        match std::mem::replace(&mut session.state, SessionState::Converting) {
            SessionState::Staged(input) => {
                session.last_error = None;
                Ok(input)
            }
            SessionState::Converting => Err(ConvertError::Busy),
            other => {
                session.state = other;
                Err(ConvertError::NothingStaged)
            }
        }
    }

    pub fn complete_conversion(&self, id: Uuid, outcome: &Result<ConvertedMedia, ConvertError>) {
        let mut sessions = self.inner.lock();
        let Some(session) = sessions.get_mut(&id) else {
            warn!("Session {} ended while converting, dropping result", id);
            return;
        };
        if !matches!(session.state, SessionState::Converting) {
            warn!("Session {} is no longer converting, dropping result", id);
            return;
        }
        session.touch();

        match outcome {
            Ok(media) => {
                session.state = SessionState::Delivered(media.clone());
                session.last_error = None;
            }
            Err(e) => {
                session.state = SessionState::Failed;
                session.last_error = Some(e.to_string());
            }
        }
    }

    /// Hands out the converted file once; the session returns to idle.
    pub fn take_download(&self, id: Uuid) -> Result<ConvertedMedia, ConvertError> {
        let mut sessions = self.inner.lock();
        let session = sessions.get_mut(&id).ok_or(ConvertError::NothingToDownload)?;
        session.touch();

        match std::mem::replace(&mut session.state, SessionState::Idle) {
            SessionState::Delivered(media) => {
                session.source = None;
                Ok(media)
            }
            other => {
                session.state = other;
                Err(ConvertError::NothingToDownload)
            }
        }
    }

    /// Location and MIME type of the staged upload, for previewing it.
    pub fn staged_file(&self, id: Uuid) -> Option<(PathBuf, String)> {
        let sessions = self.inner.lock();
        let session = sessions.get(&id)?;
        match (&session.state, &session.source) {
            (SessionState::Staged(input), Some(source)) => {
                Some((input.path().to_path_buf(), source.mime.clone()))
            }
            _ => None,
        }
    }

    pub fn snapshot(&self, id: Uuid) -> SessionSnapshot {
        let sessions = self.inner.lock();
        match sessions.get(&id) {
            Some(session) => SessionSnapshot {
                phase: session.state.phase(),
                source: session.source.clone(),
                last_error: session.last_error.clone(),
                converted_size: match &session.state {
                    SessionState::Delivered(media) => Some(media.size()),
                    _ => None,
                },
            },
            None => SessionSnapshot {
                phase: SessionPhase::Idle,
                source: None,
                last_error: None,
                converted_size: None,
            },
        }
    }

    pub fn end(&self, id: Uuid) -> Option<Session> {
        self.inner.lock().remove(&id)
    }

    /// Removes sessions idle for longer than `ttl`. Sessions mid-conversion
    /// are kept regardless of age.
    pub fn expire(&self, ttl: Duration) -> Vec<(Uuid, Session)> {
        let mut sessions = self.inner.lock();
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| {
                !matches!(s.state, SessionState::Converting) && s.touched_at.elapsed() >= ttl
            })
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| sessions.remove(&id).map(|s| (id, s)))
            .collect()
    }
}
