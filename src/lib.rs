pub mod config;
pub mod error;
pub mod i18n;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod pronunciation;
pub mod security;
pub mod server;
pub mod session;
