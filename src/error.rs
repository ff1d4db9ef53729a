//! Error types for the lookup pipeline.
//!
//! Credential, input and model errors abort a run before any text is shown.
//! Pronunciation errors are recovered by the caller and only downgrade the
//! page to a warning.

use thiserror::Error;

/// Language registry lookup failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown language: '{0}'")]
    UnknownLanguage(String),
}

/// Prompt construction failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Failure talking to the chat-completion backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to send request to model API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse model API response: {0}")]
    Decode(String),

    #[error("Model API response contained no choices")]
    EmptyResponse,
}

/// Failure of an analysis run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Please provide a Groq API key before looking up a word")]
    MissingCredential,

    #[error(transparent)]
    InvalidInput(#[from] PromptError),

    #[error("Analysis failed: {0}")]
    Model(#[from] ModelError),
}

/// Speech synthesis failure. Always non-fatal for the caller.
#[derive(Debug, Error)]
pub enum PronunciationError {
    #[error("Pronunciation not available for locale '{locale}': {reason}")]
    Unavailable { locale: String, reason: String },
}

impl PronunciationError {
    pub(crate) fn unavailable(locale: &str, reason: impl std::fmt::Display) -> Self {
        PronunciationError::Unavailable {
            locale: locale.to_string(),
            reason: reason.to_string(),
        }
    }
}
