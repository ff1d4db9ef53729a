//! Lookup binary - runs one dictionary lookup from the terminal
//!
//! Usage:
//!   cargo run --bin lookup -- Courage
//!   cargo run --bin lookup -- Courage --analysis English --translate French
//!   cargo run --bin lookup -- Courage --translate German --audio courage.mp3
//!
//! Required environment variables:
//! - GROQ_API_KEY
//!
//! Optional:
//! - MODEL_API_URL, MODEL_NAME, TTS_API_URL (same defaults as the server)

use anyhow::{bail, Context, Result};
use multilingual_dictionary::{
    config::Config,
    i18n::{Language, LanguageRegistry},
    model::ChatCompletionClient,
    orchestrator::{AnalysisRequest, Orchestrator},
    pronunciation::{GoogleTranslateTts, PronunciationAdapter},
    session::SessionContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

struct LookupArgs {
    word: String,
    analysis_language: Language,
    translate_language: Language,
    audio_out: Option<PathBuf>,
}

fn print_usage() {
    println!("Usage: lookup <word> [--analysis <language>] [--translate <language>] [--audio <file.mp3>]");
    println!();
    println!("Languages:");
    for lang in LanguageRegistry::get().list() {
        println!("  {} {} ({})", lang.flag, lang.label, lang.locale_code);
    }
}

fn parse_args(args: &[String]) -> Result<Option<LookupArgs>> {
    let mut word = None;
    let mut analysis_language = Language::default_selection();
    let mut translate_language = Language::default_selection();
    let mut audio_out = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--analysis" | "--translate" | "--audio" => {
                let value = iter
                    .next()
                    .with_context(|| format!("{} needs a value", arg))?;
                match arg.as_str() {
                    "--analysis" => analysis_language = Language::from_label(value)?,
                    "--translate" => translate_language = Language::from_label(value)?,
                    _ => audio_out = Some(PathBuf::from(value)),
                }
            }
            other if other.starts_with("--") => bail!("Unknown option: {}", other),
            other => {
                if word.replace(other.to_string()).is_some() {
                    bail!("Only one word can be looked up at a time");
                }
            }
        }
    }

    let Some(word) = word else {
        return Ok(None);
    };

    Ok(Some(LookupArgs {
        word,
        analysis_language,
        translate_language,
        audio_out,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_dictionary=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&args)? else {
        print_usage();
        return Ok(());
    };

    let config = Config::from_env()?;
    let api_key = std::env::var("GROQ_API_KEY").context("GROQ_API_KEY not set")?;

    let client = reqwest::Client::new();
    let orchestrator = Orchestrator::new(
        Arc::new(ChatCompletionClient::new(
            client.clone(),
            config.model_api_url.clone(),
            config.model_name.clone(),
        )),
        config.trigger_policy,
    );
    let pronunciation = PronunciationAdapter::new(Arc::new(GoogleTranslateTts::new(
        client,
        config.tts_api_url.clone(),
    )));

    let mut session = SessionContext::new();
    session.set_credential(&api_key);

    let request = AnalysisRequest::new(
        args.word.clone(),
        args.analysis_language,
        args.translate_language,
    );
    info!("Looking up '{}'...", request.word);

    let result = orchestrator
        .analyze(&mut session, &request)
        .await?
        .context("Word was empty, nothing to look up")?;

    println!();
    println!(
        "📖 {} ({} → {})",
        result.word,
        result.analysis_language.display_name(),
        result.translate_language.display_name()
    );
    println!();
    println!("{}", result.text);
    println!();

    // Pronunciation failures only produce a warning
    match pronunciation
        .synthesize(&request.word, request.translate_language.locale_code())
        .await
    {
        Ok(handle) => match &args.audio_out {
            Some(path) => {
                std::fs::copy(handle.path(), path)
                    .with_context(|| format!("Failed to save audio to {}", path.display()))?;
                println!("🔊 Pronunciation saved to: {}", path.display());
            }
            None => println!(
                "🔊 Pronunciation available ({} bytes, use --audio <file> to keep it)",
                handle.size()
            ),
        },
        Err(e) => println!("⚠️  Pronunciation not available for this language ({})", e),
    }

    Ok(())
}
