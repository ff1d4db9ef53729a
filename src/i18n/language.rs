//! Language type: validated handle onto a registry entry.

use crate::error::RegistryError;
use crate::i18n::{LanguageConfig, LanguageRegistry};

/// A validated language.
///
/// Only labels present in the registry can be turned into a `Language`, so
/// every accessor is infallible. Two languages are equal when their labels
/// are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    label: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { label: "English" };

    pub const FRENCH: Language = Language { label: "French" };

    /// Create a Language from a picker label.
    ///
    /// # Example
    /// ```ignore
    /// let french = Language::from_label("French")?;
    /// assert_eq!(french.locale_code(), "fr");
    /// ```
    pub fn from_label(label: &str) -> Result<Language, RegistryError> {
        let config = LanguageRegistry::get().resolve(label)?;
        Ok(Language {
            label: config.label,
        })
    }

    /// The default picker selection.
    pub fn default_selection() -> Language {
        Language {
            label: LanguageRegistry::get().default_language().label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Get the full language configuration from the registry.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .resolve(self.label)
            .expect("Language label should always be valid")
    }

    /// Speech-synthesis locale code for this language.
    pub fn locale_code(&self) -> &'static str {
        self.config().locale_code
    }

    /// Flag and label, as rendered in the pickers (e.g., "🇫🇷 French").
    pub fn display_name(&self) -> String {
        format!("{} {}", self.config().flag, self.label)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::default_selection()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label)
    }
}
