//! HTTP front end: the single dictionary page, its audio, and a JSON API.
//!
//! The page only runs a lookup on an explicit `POST /lookup` submit; plain
//! page loads never reach the model. Each request locks its session for the
//! whole lookup, so one session never has two lookups in flight.

use crate::config::Config;
use crate::error::{OrchestratorError, PronunciationError, RegistryError};
use crate::i18n::{Language, LanguageConfig, LanguageRegistry};
use crate::model::{ChatCompletionClient, ChatModel};
use crate::orchestrator::{AnalysisRequest, AnalysisResult, Orchestrator};
use crate::pronunciation::{GoogleTranslateTts, PronunciationAdapter, SpeechSynthesizer};
use crate::security::api_key_matches;
use crate::session::{SessionContext, SessionStore};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use pulldown_cmark::{html, Event, Options, Parser};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "dict_session";

const PRONUNCIATION_WARNING: &str = "Pronunciation not available for this language.";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
    pub pronunciation: PronunciationAdapter,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        model: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(model, config.trigger_policy),
            pronunciation: PronunciationAdapter::new(synthesizer),
            sessions: Arc::new(SessionStore::new(config.session_idle_timeout)),
            config: Arc::new(config),
        }
    }

    /// Wire the production model and speech clients from configuration.
    pub fn from_config(config: Config) -> Self {
        let client = reqwest::Client::new();
        let model = ChatCompletionClient::new(
            client.clone(),
            config.model_api_url.clone(),
            config.model_name.clone(),
        );
        let tts = GoogleTranslateTts::new(client, config.tts_api_url.clone());
        Self::new(config, Arc::new(model), Arc::new(tts))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/lookup", post(lookup))
        .route("/audio", get(audio))
        .route("/session/end", post(end_session))
        .route("/health", get(health))
        .route("/api/languages", get(api_languages))
        .route("/api/lookup", post(api_lookup))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to the configured port and serve until Ctrl+C.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let sessions = Arc::clone(&state.sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions.prune_idle(chrono::Utc::now());
        }
    });

    info!("✓ Listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

// ==================== Lookup ====================

#[derive(Debug)]
enum LookupError {
    Language(RegistryError),
    Analysis(OrchestratorError),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Language(e) => e.fmt(f),
            LookupError::Analysis(e) => e.fmt(f),
        }
    }
}

/// What one submit produced.
#[derive(Debug)]
struct Lookup {
    /// `None` when the trigger policy treated the submit as a repeat.
    result: Option<AnalysisResult>,
    pronunciation: Option<Result<(), PronunciationError>>,
}

/// Resolve the selections, run the analysis and, on a fresh result, fetch the
/// pronunciation of the input word in the translate language.
async fn run_lookup(
    state: &AppState,
    session: &mut SessionContext,
    word: &str,
    analysis_label: &str,
    translate_label: &str,
) -> Result<Lookup, LookupError> {
    let analysis_language = Language::from_label(analysis_label).map_err(LookupError::Language)?;
    let translate_language = Language::from_label(translate_label).map_err(LookupError::Language)?;
    session.selection.analysis_language = analysis_language;
    session.selection.translate_language = translate_language;

    let request = AnalysisRequest::new(word, analysis_language, translate_language);
    let result = match state.orchestrator.analyze(session, &request).await {
        Ok(result) => result,
        Err(e) => {
            session.set_audio(None);
            return Err(LookupError::Analysis(e));
        }
    };

    let Some(result) = result else {
        return Ok(Lookup {
            result: None,
            pronunciation: None,
        });
    };

    let pronunciation = match state
        .pronunciation
        .synthesize(&request.word, translate_language.locale_code())
        .await
    {
        Ok(handle) => {
            session.set_audio(Some(handle));
            Ok(())
        }
        Err(e) => {
            session.set_audio(None);
            Err(e)
        }
    };

    Ok(Lookup {
        result: Some(result),
        pronunciation: Some(pronunciation),
    })
}

// ==================== Page Handlers ====================

fn default_label() -> String {
    Language::default_selection().label().to_string()
}

#[derive(Debug, Deserialize)]
pub struct LookupForm {
    #[serde(default)]
    pub word: String,
    #[serde(default = "default_label")]
    pub analysis_language: String,
    #[serde(default = "default_label")]
    pub translate_language: String,
    #[serde(default)]
    pub api_key: String,
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.sessions.open(session_id_from(&headers).as_deref());
    let session = session.lock().await;

    let view = PageView {
        word: session.trigger.last_word.clone(),
        analysis_label: session.selection.analysis_language.label().to_string(),
        translate_label: session.selection.translate_language.label().to_string(),
        has_credential: session.has_credential(),
        ..PageView::default()
    };

    with_session_cookie(id, Html(render_page(&view)))
}

async fn lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LookupForm>,
) -> Response {
    let (id, session) = state.sessions.open(session_id_from(&headers).as_deref());
    let mut session = session.lock().await;

    session.set_credential(&form.api_key);

    let mut view = PageView {
        word: form.word.clone(),
        analysis_label: form.analysis_language.clone(),
        translate_label: form.translate_language.clone(),
        ..PageView::default()
    };

    match run_lookup(
        &state,
        &mut session,
        &form.word,
        &form.analysis_language,
        &form.translate_language,
    )
    .await
    {
        Ok(Lookup {
            result: Some(result),
            pronunciation,
        }) => {
            view.audio = matches!(pronunciation, Some(Ok(())));
            if let Some(Err(e)) = pronunciation {
                warn!("Showing lookup of '{}' without audio: {}", result.word, e);
                view.warning = Some(PRONUNCIATION_WARNING.to_string());
            }
            view.result = Some(result);
        }
        Ok(Lookup { result: None, .. }) => {
            if !form.word.is_empty() {
                view.notice = Some(
                    "This word was already looked up. Enter a different word to run a new lookup."
                        .to_string(),
                );
            }
        }
        Err(e) => {
            view.error = Some(e.to_string());
        }
    }

    view.has_credential = session.has_credential();
    with_session_cookie(id, Html(render_page(&view)))
}

#[derive(Debug, Deserialize)]
struct AudioQuery {
    session: Option<String>,
}

async fn audio(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AudioQuery>,
) -> Response {
    let Some(id) = query.session.or_else(|| session_id_from(&headers)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(session) = state.sessions.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let session = session.lock().await;
    let Some(handle) = session.audio() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let language = LanguageRegistry::get()
        .get_by_locale(handle.locale_code())
        .map_or(handle.locale_code(), |lang| lang.label);
    debug!("Serving {} pronunciation ({} bytes)", language, handle.size());

    match handle.read().await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "audio/mpeg"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to read audio {}: {}", handle.path().display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id_from(&headers) {
        state.sessions.end(&id);
    }

    let expired = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    ([(header::SET_COOKIE, expired)], Redirect::to("/")).into_response()
}

async fn health() -> &'static str {
    "OK"
}

// ==================== JSON API ====================

#[derive(Debug, Serialize)]
struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        let message = err.to_string();
        match err {
            LookupError::Language(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "unknown_language", message)
            }
            LookupError::Analysis(OrchestratorError::MissingCredential) => {
                ApiError::new(StatusCode::BAD_REQUEST, "missing_credential", message)
            }
            LookupError::Analysis(OrchestratorError::InvalidInput(_)) => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_input", message)
            }
            LookupError::Analysis(OrchestratorError::Model(_)) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "model_error", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

async fn api_languages() -> Json<&'static [LanguageConfig]> {
    Json(LanguageRegistry::get().list())
}

#[derive(Debug, Deserialize)]
pub struct ApiLookupRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub word: String,
    #[serde(default = "default_label")]
    pub analysis_language: String,
    #[serde(default = "default_label")]
    pub translate_language: String,
    pub credential: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiPronunciation {
    pub audio_url: Option<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiLookupResponse {
    pub session_id: String,
    /// "analyzed" or "unchanged"
    pub status: &'static str,
    pub result: Option<AnalysisResult>,
    pub pronunciation: Option<ApiPronunciation>,
}

async fn api_lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ApiLookupRequest>,
) -> Result<Json<ApiLookupResponse>, ApiError> {
    let presented = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
    if !api_key_matches(state.config.api_key.as_deref(), presented) {
        warn!("Rejected API lookup with missing or invalid API key");
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Missing or invalid X-API-Key header",
        ));
    }

    let (id, session) = state.sessions.open(body.session_id.as_deref());
    let mut session = session.lock().await;

    if let Some(credential) = &body.credential {
        session.set_credential(credential);
    }

    let lookup = run_lookup(
        &state,
        &mut session,
        &body.word,
        &body.analysis_language,
        &body.translate_language,
    )
    .await?;

    let pronunciation = lookup.pronunciation.map(|outcome| match outcome {
        Ok(()) => ApiPronunciation {
            audio_url: Some(format!("/audio?session={}", id)),
            warning: None,
        },
        Err(e) => ApiPronunciation {
            audio_url: None,
            warning: Some(e.to_string()),
        },
    });

    Ok(Json(ApiLookupResponse {
        session_id: id.to_string(),
        status: if lookup.result.is_some() {
            "analyzed"
        } else {
            "unchanged"
        },
        result: lookup.result,
        pronunciation,
    }))
}

// ==================== Cookies ====================

/// Extract the session id from the `Cookie` header(s).
fn session_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn with_session_cookie(id: Uuid, body: impl IntoResponse) -> Response {
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    ([(header::SET_COOKIE, cookie)], body).into_response()
}

// ==================== Rendering ====================

#[derive(Debug, Default)]
struct PageView {
    word: String,
    analysis_label: String,
    translate_label: String,
    has_credential: bool,
    result: Option<AnalysisResult>,
    error: Option<String>,
    warning: Option<String>,
    notice: Option<String>,
    audio: bool,
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render model output as Markdown. Raw HTML in the text is emitted as
/// escaped text, never as markup.
fn render_markdown(text: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut rendered = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut rendered, events);
    rendered
}

fn language_options(selected: &str) -> String {
    LanguageRegistry::get()
        .list()
        .iter()
        .map(|lang| {
            format!(
                r#"<option value="{label}"{selected}>{flag} {label}</option>"#,
                label = lang.label,
                flag = lang.flag,
                selected = if lang.label == selected { " selected" } else { "" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_page(view: &PageView) -> String {
    let mut banners = String::new();
    if let Some(error) = &view.error {
        banners.push_str(&format!(r#"<div class="banner error">❌ {}</div>"#, escape_html(error)));
    }
    if let Some(notice) = &view.notice {
        banners.push_str(&format!(r#"<div class="banner info">ℹ️ {}</div>"#, escape_html(notice)));
    }

    let mut output = String::new();
    if let Some(result) = &view.result {
        output.push_str(&format!(
            r#"<h2>📖 Result</h2>
<p class="meta">{} → {}</p>
<div class="result">{}</div>
<h2>🔊 Pronunciation</h2>
"#,
            escape_html(&result.analysis_language.display_name()),
            escape_html(&result.translate_language.display_name()),
            render_markdown(&result.text),
        ));
        if view.audio {
            output.push_str(r#"<audio controls src="/audio"></audio>"#);
        }
        if let Some(warning) = &view.warning {
            output.push_str(&format!(
                r#"<div class="banner warning">⚠️ {}</div>"#,
                escape_html(warning)
            ));
        }
    }

    let key_hint = if view.has_credential {
        "A key is stored for this session."
    } else {
        "Stored for this session only."
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Multilingual AI Dictionary</title>
<style>
body {{ font-family: sans-serif; display: flex; gap: 2rem; margin: 2rem; }}
aside {{ min-width: 16rem; }}
.banner {{ padding: .75rem; border-radius: .25rem; margin: 1rem 0; }}
.error {{ background: #fdd; }}
.warning {{ background: #ffd; }}
.info {{ background: #def; }}
</style>
</head>
<body>
<form method="post" action="/lookup" id="lookup">
<aside>
<h3>⚙️ AI Configuration</h3>
<label>Groq API Key <input type="password" name="api_key" autocomplete="off"></label>
<small>{key_hint}</small>
<h3>🌍 Language Settings</h3>
<label>Analysis Language <select name="analysis_language">{analysis_options}</select></label>
<label>Translate Result Into <select name="translate_language">{translate_options}</select></label>
</aside>
<main>
<h1>🌍 Multilingual AI Dictionary</h1>
<p>Enter a word and press <b>ENTER</b> to get: word type, 5 synonyms, 3 antonyms, 5 example sentences, 3 meanings, translation and pronunciation.</p>
<input type="text" name="word" placeholder="Example: Courage" value="{word}" autofocus>
{banners}
{output}
</main>
</form>
<form method="post" action="/session/end"><button type="submit">End session</button></form>
</body>
</html>
"#,
        key_hint = key_hint,
        analysis_options = language_options(&view.analysis_label),
        translate_options = language_options(&view.translate_label),
        word = escape_html(&view.word),
        banners = banners,
        output = output,
    )
}
