//! Per-session state.
//!
//! Every browser (or API client) gets its own `SessionContext` holding the
//! user's model credential, the trigger state used to detect new submissions,
//! and the most recent pronunciation audio. Contexts live in a `SessionStore`
//! and are dropped when the session ends or sits idle for too long, which
//! also releases the credential and deletes the temporary audio file.

use crate::i18n::Language;
use crate::pronunciation::AudioHandle;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

/// Model API key supplied by the user for the current session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank input so an empty form field never clears or
    /// replaces a stored key.
    pub fn new(secret: &str) -> Option<Self> {
        let secret = secret.trim();
        if secret.is_empty() {
            None
        } else {
            Some(Credential(secret.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The last submission that fired the trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerState {
    pub last_word: String,
    pub last_languages: Option<(Language, Language)>,
}

/// Analysis text kept for re-translation when only the target language changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnalysis {
    pub word: String,
    pub language: Language,
    pub text: String,
}

/// Picker values to show when the page is rendered without a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub analysis_language: Language,
    pub translate_language: Language,
}

/// Everything one user's session remembers between requests.
///
/// The credential is private so it can only be replaced through
/// `set_credential`, which ignores blank input. Dropping the context drops the
/// key and deletes the current audio file.
#[derive(Debug, Default)]
pub struct SessionContext {
    credential: Option<Credential>,
    pub trigger: TriggerState,
    pub cached_analysis: Option<CachedAnalysis>,
    pub selection: Selection,
    audio: Option<AudioHandle>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential for the rest of the session. Blank input is ignored.
    pub fn set_credential(&mut self, secret: &str) {
        if let Some(credential) = Credential::new(secret) {
            self.credential = Some(credential);
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Replace the current audio. The previous temp file is deleted.
    pub fn set_audio(&mut self, audio: Option<AudioHandle>) {
        self.audio = audio;
    }

    pub fn audio(&self) -> Option<&AudioHandle> {
        self.audio.as_ref()
    }
}

pub type SharedSession = Arc<tokio::sync::Mutex<SessionContext>>;

struct SessionEntry {
    context: SharedSession,
    last_seen: DateTime<Utc>,
}

/// In-memory map of live sessions.
///
/// The map lock is only held for lookups; each session's own async mutex
/// serialises requests within that session.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up the session named by `id`, or start a new one when the id is
    /// missing, malformed, unknown or expired.
    pub fn open(&self, id: Option<&str>) -> (Uuid, SharedSession) {
        self.open_at(id, Utc::now())
    }

    pub(crate) fn open_at(&self, id: Option<&str>, now: DateTime<Utc>) -> (Uuid, SharedSession) {
        self.prune_idle(now);

        let mut sessions = self.lock();

        if let Some(id) = id.and_then(|raw| Uuid::parse_str(raw).ok()) {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_seen = now;
                return (id, Arc::clone(&entry.context));
            }
        }

        let id = Uuid::new_v4();
        let context: SharedSession = Arc::new(tokio::sync::Mutex::new(SessionContext::new()));
        sessions.insert(
            id,
            SessionEntry {
                context: Arc::clone(&context),
                last_seen: now,
            },
        );
        info!("Started session {}", id);

        (id, context)
    }

    /// Look up a live session without creating one.
    pub fn get(&self, id: &str) -> Option<SharedSession> {
        let id = Uuid::parse_str(id).ok()?;
        let now = Utc::now();
        let mut sessions = self.lock();
        let entry = sessions
            .get_mut(&id)
            .filter(|entry| now - entry.last_seen <= self.idle_timeout)?;
        entry.last_seen = now;
        Some(Arc::clone(&entry.context))
    }

    /// End a session, dropping its credential, trigger state and audio.
    pub fn end(&self, id: &str) -> bool {
        let Ok(id) = Uuid::parse_str(id) else {
            return false;
        };

        let removed = self.lock().remove(&id).is_some();
        if removed {
            info!("Ended session {}", id);
        }
        removed
    }

    /// Drop sessions idle for longer than the configured timeout.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_seen <= self.idle_timeout);

        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} idle sessions", pruned);
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Credential Tests ====================

    #[test]
    fn test_credential_rejects_blank() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("gsk_secret").unwrap();
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("gsk_secret"));
        assert_eq!(credential.expose(), "gsk_secret");
    }

    #[test]
    fn test_set_credential_ignores_blank_input() {
        let mut context = SessionContext::new();
        context.set_credential("gsk_first");
        context.set_credential("");

        assert_eq!(context.credential().unwrap().expose(), "gsk_first");
    }

    #[test]
    fn test_set_credential_replaces_previous() {
        let mut context = SessionContext::new();
        context.set_credential("gsk_first");
        context.set_credential("gsk_second");

        assert_eq!(context.credential().unwrap().expose(), "gsk_second");
    }

    #[test]
    fn test_new_context_is_empty() {
        let context = SessionContext::new();
        assert!(!context.has_credential());
        assert!(context.trigger.last_word.is_empty());
        assert!(context.audio().is_none());
        assert_eq!(context.selection.analysis_language, Language::ENGLISH);
    }

    // ==================== Store Tests ====================

    #[test]
    fn test_open_without_id_creates_session() {
        let store = SessionStore::new(Duration::minutes(60));
        let (_, _) = store.open(None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_open_with_known_id_returns_same_context() {
        let store = SessionStore::new(Duration::minutes(60));
        let (id, first) = store.open(None);
        first.lock().await.set_credential("gsk_key");

        let (same_id, second) = store.open(Some(&id.to_string()));

        assert_eq!(id, same_id);
        assert!(second.lock().await.has_credential());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_open_with_garbage_id_creates_new_session() {
        let store = SessionStore::new(Duration::minutes(60));
        let (id, _) = store.open(Some("not-a-uuid"));
        assert_eq!(store.len(), 1);
        assert_ne!(id.to_string(), "not-a-uuid");
    }

    #[test]
    fn test_get_does_not_create() {
        let store = SessionStore::new(Duration::minutes(60));
        assert!(store.get(&Uuid::new_v4().to_string()).is_none());
        assert!(store.get("garbage").is_none());

        let (id, _) = store.open(None);
        assert!(store.get(&id.to_string()).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_end_removes_session() {
        let store = SessionStore::new(Duration::minutes(60));
        let (id, _) = store.open(None);

        assert!(store.end(&id.to_string()));
        assert!(store.is_empty());
        assert!(!store.end(&id.to_string()));
        assert!(!store.end("garbage"));
    }

    #[tokio::test]
    async fn test_ended_session_starts_fresh() {
        let store = SessionStore::new(Duration::minutes(60));
        let (id, context) = store.open(None);
        context.lock().await.set_credential("gsk_key");
        store.end(&id.to_string());

        let (new_id, fresh) = store.open(Some(&id.to_string()));

        assert_ne!(id, new_id);
        assert!(!fresh.lock().await.has_credential());
    }

    #[test]
    fn test_prune_idle_drops_expired_sessions() {
        let store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let (old, _) = store.open_at(None, start);
        let (recent, _) = store.open_at(None, start + Duration::minutes(20));

        let pruned = store.prune_idle(start + Duration::minutes(45));

        assert_eq!(pruned, 1);
        assert_eq!(store.len(), 1);
        assert!(!store.end(&old.to_string()));
        assert!(store.end(&recent.to_string()));
    }

    #[test]
    fn test_open_refreshes_last_seen() {
        let store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let (id, _) = store.open_at(None, start);
        store.open_at(Some(&id.to_string()), start + Duration::minutes(25));

        assert_eq!(store.prune_idle(start + Duration::minutes(50)), 0);
    }
}
