//! Language registry: Single source of truth for all selectable languages.
//!
//! The registry is a fixed, ordered table mapping the human-readable labels
//! shown in the language pickers to the locale codes understood by the
//! speech-synthesis provider. It is initialised once through `OnceLock` and is
//! immutable thereafter.

use crate::error::RegistryError;
use serde::Serialize;
use std::sync::OnceLock;

/// Configuration for a selectable language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageConfig {
    /// Label shown in the pickers and embedded in prompts (e.g., "French")
    pub label: &'static str,

    /// Flag emoji rendered next to the label
    pub flag: &'static str,

    /// Speech-synthesis locale code (e.g., "fr", "zh-CN")
    pub locale_code: &'static str,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    ///
    /// The table is built on first call; later calls return the same instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Resolve a label to its language configuration.
    ///
    /// # Arguments
    /// * `label` - The exact label shown in the pickers (e.g., "French")
    ///
    /// # Returns
    /// The matching `LanguageConfig`. Matching is case-sensitive.
    ///
    /// # Errors
    /// `RegistryError::UnknownLanguage` if the label is not in the registry.
    pub fn resolve(&self, label: &str) -> Result<&LanguageConfig, RegistryError> {
        self.languages
            .iter()
            .find(|lang| lang.label == label)
            .ok_or_else(|| RegistryError::UnknownLanguage(label.to_string()))
    }

    /// Get a language configuration by its locale code.
    ///
    /// # Arguments
    /// * `locale_code` - The speech-synthesis locale (e.g., "fr", "zh-CN")
    ///
    /// # Returns
    /// * `Some(&LanguageConfig)` if a language uses this locale
    /// * `None` otherwise
    pub fn get_by_locale(&self, locale_code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.locale_code == locale_code)
    }

    /// Get all languages.
    ///
    /// # Returns
    /// The full table in picker order, English first.
    pub fn list(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// The language preselected in both pickers.
    pub fn default_language(&self) -> &LanguageConfig {
        &self.languages[0]
    }
}

/// The fixed language table, in picker order. English comes first and is the
/// default selection.
fn default_languages() -> Vec<LanguageConfig> {
    [
        ("English", "🇬🇧", "en"),
        ("French", "🇫🇷", "fr"),
        ("Spanish", "🇪🇸", "es"),
        ("Turkish", "🇹🇷", "tr"),
        ("Arabic", "🇸🇦", "ar"),
        ("Pashto", "🇦🇫", "ps"),
        ("Urdu", "🇵🇰", "ur"),
        ("Chinese", "🇨🇳", "zh-CN"),
        ("Thai", "🇹🇭", "th"),
        ("Indonesian", "🇮🇩", "id"),
        ("Malaysian", "🇲🇾", "ms"),
        ("Russian", "🇷🇺", "ru"),
        ("Italian", "🇮🇹", "it"),
        ("German", "🇩🇪", "de"),
        ("Korean", "🇰🇷", "ko"),
    ]
    .into_iter()
    .map(|(label, flag, locale_code)| LanguageConfig {
        label,
        flag,
        locale_code,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_registry_has_fifteen_languages() {
        assert_eq!(LanguageRegistry::get().list().len(), 15);
    }

    #[test]
    fn test_labels_are_unique() {
        let labels: HashSet<_> = LanguageRegistry::get()
            .list()
            .iter()
            .map(|lang| lang.label)
            .collect();
        assert_eq!(labels.len(), 15);
    }

    #[test]
    fn test_locale_codes_are_unique() {
        let codes: HashSet<_> = LanguageRegistry::get()
            .list()
            .iter()
            .map(|lang| lang.locale_code)
            .collect();
        assert_eq!(codes.len(), 15);
    }

    #[test]
    fn test_resolve_english() {
        let config = LanguageRegistry::get().resolve("English").unwrap();
        assert_eq!(config.locale_code, "en");
        assert_eq!(config.flag, "🇬🇧");
    }

    #[test]
    fn test_resolve_chinese_uses_region_code() {
        let config = LanguageRegistry::get().resolve("Chinese").unwrap();
        assert_eq!(config.locale_code, "zh-CN");
    }

    #[test]
    fn test_resolve_unknown_label() {
        let err = LanguageRegistry::get().resolve("Klingon").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLanguage(ref l) if l == "Klingon"));
        assert!(err.to_string().contains("Klingon"));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert!(LanguageRegistry::get().resolve("english").is_err());
        assert!(LanguageRegistry::get().resolve("").is_err());
    }

    #[test]
    fn test_get_by_locale() {
        let registry = LanguageRegistry::get();
        assert_eq!(registry.get_by_locale("ko").unwrap().label, "Korean");
        assert!(registry.get_by_locale("xx").is_none());
    }

    #[test]
    fn test_default_language_is_english() {
        assert_eq!(LanguageRegistry::get().default_language().label, "English");
    }

    proptest! {
        #[test]
        fn prop_every_label_resolves_deterministically(index in 0usize..15) {
            let registry = LanguageRegistry::get();
            let label = registry.list()[index].label;

            let first = registry.resolve(label).unwrap().locale_code;
            let second = registry.resolve(label).unwrap().locale_code;

            prop_assert!(!first.is_empty());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_unlisted_labels_are_rejected(label in "[a-z]{1,12}") {
            // All registry labels are capitalised.
            prop_assert!(LanguageRegistry::get().resolve(&label).is_err());
        }
    }
}
