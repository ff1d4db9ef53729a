//! Analysis orchestration: decide whether a submission is new, run the
//! analysis pass, and run the translation pass when the two language
//! selections differ.

use crate::error::{ModelError, OrchestratorError};
use crate::i18n::Language;
use crate::model::ChatModel;
use crate::prompts::{build_analysis_prompt, build_translation_prompt};
use crate::session::{CachedAnalysis, Credential, SessionContext, TriggerState};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What counts as a new submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Run only when the word differs from the last one that ran. Changing
    /// just a language selection does not re-run.
    #[default]
    Word,
    /// Run when the word or either language selection changed. Re-uses the
    /// cached analysis when only the translate language changed.
    Submission,
}

impl FromStr for TriggerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" => Ok(TriggerPolicy::Word),
            "submission" => Ok(TriggerPolicy::Submission),
            other => Err(format!(
                "Invalid trigger policy '{}'. Expected 'word' or 'submission'",
                other
            )),
        }
    }
}

/// One submission from the page or the JSON API.
///
/// Both languages are already resolved against the registry, so an
/// `AnalysisRequest` never carries an unknown label. The word is kept exactly
/// as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub word: String,
    pub analysis_language: Language,
    pub translate_language: Language,
}

impl AnalysisRequest {
    pub fn new(word: impl Into<String>, analysis_language: Language, translate_language: Language) -> Self {
        Self {
            word: word.into(),
            analysis_language,
            translate_language,
        }
    }

    fn needs_translation(&self) -> bool {
        self.analysis_language != self.translate_language
    }
}

/// Outcome of a lookup that ran.
///
/// Serialized for the JSON API with languages as their plain labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub word: String,
    #[serde(serialize_with = "serialize_label")]
    pub analysis_language: Language,
    #[serde(serialize_with = "serialize_label")]
    pub translate_language: Language,
    /// Final text to display, translated when the languages differ.
    pub text: String,
    /// Whether a translation pass produced `text`.
    pub translated: bool,
}

fn serialize_label<S: serde::Serializer>(language: &Language, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(language.label())
}

/// Runs lookups against a chat model.
///
/// Holds no per-user state; everything that changes between submissions
/// lives in the caller's `SessionContext`. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    policy: TriggerPolicy,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ChatModel>, policy: TriggerPolicy) -> Self {
        Self { model, policy }
    }

    /// Whether `request` is a new submission with respect to `state`.
    ///
    /// An empty word never triggers. Otherwise the configured
    /// `TriggerPolicy` decides which fields are compared.
    pub fn should_trigger(&self, state: &TriggerState, request: &AnalysisRequest) -> bool {
        if request.word.is_empty() {
            return false;
        }

        match self.policy {
            TriggerPolicy::Word => state.last_word != request.word,
            TriggerPolicy::Submission => {
                state.last_word != request.word
                    || state.last_languages
                        != Some((request.analysis_language, request.translate_language))
            }
        }
    }

    /// Run the lookup for `request` if the trigger policy fires.
    ///
    /// The trigger state is recorded before the credential check, so a failed
    /// run is only retried after the submission changes.
    ///
    /// # Arguments
    /// * `session` - Credential, trigger state and analysis cache of the caller
    /// * `request` - The word and the two resolved languages
    ///
    /// # Returns
    /// * `Ok(Some(result))` after one model call, or two when the languages differ
    /// * `Ok(None)` for a repeated submission; no model call is made
    ///
    /// # Errors
    /// * `OrchestratorError::MissingCredential` if the session has no key
    /// * `OrchestratorError::InvalidInput` if the word is blank
    /// * `OrchestratorError::Model` if either pass fails; no partial result is kept
    pub async fn analyze(
        &self,
        session: &mut SessionContext,
        request: &AnalysisRequest,
    ) -> Result<Option<AnalysisResult>, OrchestratorError> {
        if !self.should_trigger(&session.trigger, request) {
            debug!("Submission unchanged, skipping analysis");
            return Ok(None);
        }

        session.trigger = TriggerState {
            last_word: request.word.clone(),
            last_languages: Some((request.analysis_language, request.translate_language)),
        };

        let Some(credential) = session.credential().cloned() else {
            warn!("Lookup attempted without a model credential");
            return Err(OrchestratorError::MissingCredential);
        };

        let analysis = match self.cached_analysis(session, request) {
            Some(text) => {
                info!(
                    "Re-using cached {} analysis of '{}'",
                    request.analysis_language, request.word
                );
                text
            }
            None => {
                let prompt = build_analysis_prompt(&request.word, request.analysis_language.label())?;
                info!(
                    "Analyzing '{}' in {}",
                    request.word, request.analysis_language
                );
                let text = self.call_model(&credential, &prompt, "analysis").await?;

                if self.policy == TriggerPolicy::Submission {
                    session.cached_analysis = Some(CachedAnalysis {
                        word: request.word.clone(),
                        language: request.analysis_language,
                        text: text.clone(),
                    });
                }
                text
            }
        };

        if !request.needs_translation() {
            return Ok(Some(AnalysisResult {
                word: request.word.clone(),
                analysis_language: request.analysis_language,
                translate_language: request.translate_language,
                text: analysis,
                translated: false,
            }));
        }

        info!(
            "Translating analysis of '{}' into {}",
            request.word, request.translate_language
        );
        let prompt = build_translation_prompt(&analysis, request.translate_language.label());
        let translated = self.call_model(&credential, &prompt, "translation").await?;

        Ok(Some(AnalysisResult {
            word: request.word.clone(),
            analysis_language: request.analysis_language,
            translate_language: request.translate_language,
            text: translated,
            translated: true,
        }))
    }

    fn cached_analysis(&self, session: &SessionContext, request: &AnalysisRequest) -> Option<String> {
        if self.policy != TriggerPolicy::Submission {
            return None;
        }

        session
            .cached_analysis
            .as_ref()
            .filter(|cached| cached.word == request.word && cached.language == request.analysis_language)
            .map(|cached| cached.text.clone())
    }

    async fn call_model(
        &self,
        credential: &Credential,
        prompt: &str,
        pass: &str,
    ) -> Result<String, ModelError> {
        self.model.complete(credential, prompt).await.map_err(|e| {
            warn!("Model {} pass failed: {}", pass, e);
            e
        })
    }
}
