//! Language registry and the validated `Language` handle.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the selectable languages and their
//!   speech-synthesis locale codes
//! - `language`: Type-safe `Language` that can only be built from a registry label
//!
//! # Example
//!
//! ```rust,ignore
//! use multilingual_dictionary::i18n::{Language, LanguageRegistry};
//!
//! let locale = LanguageRegistry::get().resolve("Urdu")?.locale_code;
//! let french = Language::from_label("French")?;
//! ```

mod language;
mod registry;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
