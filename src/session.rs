use crate::llm_client::ModelResult;
use crate::upload::UploadedImage;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "ocr_session";
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Per-session state. Everything is transient and dropped with the session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub image: Option<UploadedImage>,
    pub last_uploaded_filename: Option<String>,
    pub ocr_result: Option<ModelResult>,
    pub last_error: Option<String>,
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub async fn attach_session(mut req: Request, next: Next) -> Response {
    // Cookie for browsers, header for API clients; otherwise start a new session
    let id = cookie_value(req.headers(), SESSION_COOKIE)
        .or_else(|| req.headers().get(SESSION_HEADER).and_then(|v| v.to_str().ok()))
        .filter(|id| is_valid_id(id))
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(SessionId(id.clone()));

    let span = info_span!(
        "http_request",
        session_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut resp = next.run(req).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(SESSION_HEADER, val);
    }
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    if let Ok(val) = HeaderValue::from_str(&cookie) {
        resp.headers_mut().insert(header::SET_COOKIE, val);
    }

    resp
}

struct SessionEntry {
    state: Arc<tokio::sync::Mutex<SessionState>>,
    last_seen: Instant,
}

/// Explicit session context. The outer lock only guards the map; each
/// session's own mutex is held for the whole analysis so a session has a
/// single writer at a time.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_or_create(&self, id: &SessionId) -> Arc<tokio::sync::Mutex<SessionState>> {
        let now = Instant::now();
        let mut sessions = self.lock();

        let before = sessions.len();
        let idle_timeout = self.idle_timeout;
        sessions.retain(|key, entry| {
            key == &id.0 || now.duration_since(entry.last_seen) < idle_timeout || Arc::strong_count(&entry.state) > 1
        });
        if sessions.len() < before {
            debug!("pruned {} idle sessions", before - sessions.len());
        }

        let entry = sessions.entry(id.0.clone()).or_insert_with(|| SessionEntry {
            state: Arc::new(tokio::sync::Mutex::new(SessionState::default())),
            last_seen: now,
        });
        entry.last_seen = now;
        entry.state.clone()
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        self.lock().remove(&id.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}
