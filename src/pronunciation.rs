//! Pronunciation audio for the looked-up word.
//!
//! Speech comes from an external provider behind `SpeechSynthesizer`. The
//! adapter writes each clip to a temporary `.mp3` file and hands back an
//! `AudioHandle` that owns it; the file is deleted when the handle is dropped.

use crate::error::PronunciationError;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, warn};

/// A text-to-speech provider returning MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, locale_code: &str) -> Result<Vec<u8>, PronunciationError>;
}

/// Google Translate's text-to-speech endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    api_url: String,
}

impl GoogleTranslateTts {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, locale_code: &str) -> Result<Vec<u8>, PronunciationError> {
        if locale_code.is_empty() {
            return Err(PronunciationError::unavailable(locale_code, "empty locale code"));
        }

        let textlen = text.chars().count().to_string();
        let response = self
            .client
            .get(&self.api_url)
            .header("User-Agent", "Mozilla/5.0")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", locale_code),
                ("q", text),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PronunciationError::unavailable(locale_code, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PronunciationError::unavailable(
                locale_code,
                format!("speech API returned {}", status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PronunciationError::unavailable(locale_code, e))?;

        if bytes.is_empty() {
            return Err(PronunciationError::unavailable(locale_code, "empty audio stream"));
        }

        Ok(bytes.to_vec())
    }
}

/// A synthesized clip on disk. The file lives as long as the handle.
#[derive(Debug)]
pub struct AudioHandle {
    path: TempPath,
    locale_code: String,
    size: usize,
}

impl AudioHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn locale_code(&self) -> &str {
        &self.locale_code
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

#[derive(Clone)]
pub struct PronunciationAdapter {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl PronunciationAdapter {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Synthesize `word` in `locale_code` and store the audio in a temp file.
    ///
    /// Callers pass the literal input word, never the analysis text, and the
    /// locale of the translate language. The word reaches the provider as is.
    ///
    /// # Errors
    /// `PronunciationError::Unavailable` if the word is blank, the provider
    /// fails, or the temp file cannot be written.
    pub async fn synthesize(&self, word: &str, locale_code: &str) -> Result<AudioHandle, PronunciationError> {
        if word.trim().is_empty() {
            return Err(PronunciationError::unavailable(locale_code, "nothing to pronounce"));
        }

        let audio = match self.synthesizer.synthesize(word, locale_code).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                return Err(e);
            }
        };

        let handle = write_temp_audio(&audio, locale_code)?;
        debug!(
            "Wrote {} bytes of {} audio to {}",
            handle.size,
            locale_code,
            handle.path().display()
        );

        Ok(handle)
    }
}

fn write_temp_audio(audio: &[u8], locale_code: &str) -> Result<AudioHandle, PronunciationError> {
    let mut file = tempfile::Builder::new()
        .prefix("pronunciation-")
        .suffix(".mp3")
        .tempfile()
        .map_err(|e| PronunciationError::unavailable(locale_code, e))?;

    file.write_all(audio)
        .and_then(|_| file.flush())
        .map_err(|e| PronunciationError::unavailable(locale_code, e))?;

    Ok(AudioHandle {
        path: file.into_temp_path(),
        locale_code: locale_code.to_string(),
        size: audio.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const FAKE_MP3: &[u8] = b"ID3\x03\x00fake-mp3-frames";

    /// Records every request and answers with fixed bytes or an error.
    struct FakeSynthesizer {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynthesizer {
        async fn synthesize(&self, text: &str, locale_code: &str) -> Result<Vec<u8>, PronunciationError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), locale_code.to_string()));
            if self.fail {
                Err(PronunciationError::unavailable(locale_code, "unsupported"))
            } else {
                Ok(FAKE_MP3.to_vec())
            }
        }
    }

    fn fake(fail: bool) -> Arc<FakeSynthesizer> {
        Arc::new(FakeSynthesizer {
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }

    // ==================== Adapter Tests ====================

    #[tokio::test]
    async fn test_synthesize_writes_mp3_temp_file() {
        let synthesizer = fake(false);
        let adapter = PronunciationAdapter::new(synthesizer.clone());

        let handle = adapter.synthesize("Courage", "fr").await.expect("Should succeed");

        assert_eq!(handle.path().extension().unwrap(), "mp3");
        assert_eq!(handle.locale_code(), "fr");
        assert_eq!(handle.size(), FAKE_MP3.len());
        assert_eq!(handle.read().await.unwrap(), FAKE_MP3);
        assert_eq!(
            synthesizer.calls.lock().unwrap().as_slice(),
            &[("Courage".to_string(), "fr".to_string())]
        );
    }

    #[tokio::test]
    async fn test_dropping_handle_deletes_file() {
        let adapter = PronunciationAdapter::new(fake(false));
        let handle = adapter.synthesize("Courage", "en").await.unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());

        drop(handle);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_synthesize_failure_is_unavailable() {
        let adapter = PronunciationAdapter::new(fake(true));

        let err = adapter.synthesize("Courage", "ps").await.unwrap_err();

        assert!(matches!(err, PronunciationError::Unavailable { ref locale, .. } if locale == "ps"));
    }

    #[tokio::test]
    async fn test_synthesize_passes_word_through_unchanged() {
        let synthesizer = fake(false);
        let adapter = PronunciationAdapter::new(synthesizer.clone());

        adapter.synthesize(" l'été ", "fr").await.expect("Should succeed");

        assert_eq!(
            synthesizer.calls.lock().unwrap().as_slice(),
            &[(" l'été ".to_string(), "fr".to_string())]
        );
    }

    #[tokio::test]
    async fn test_synthesize_blank_word_skips_provider() {
        let synthesizer = fake(false);
        let adapter = PronunciationAdapter::new(synthesizer.clone());

        assert!(adapter.synthesize("   ", "en").await.is_err());
        assert!(synthesizer.calls.lock().unwrap().is_empty());
    }

    // ==================== Google TTS Tests ====================

    #[tokio::test]
    async fn test_google_tts_sends_word_and_locale() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("q", "Courage"))
            .and(query_param("tl", "fr"))
            .and(query_param("client", "tw-ob"))
            .and(query_param("textlen", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tts = GoogleTranslateTts::new(
            reqwest::Client::new(),
            format!("{}/translate_tts", mock_server.uri()),
        );

        let audio = tts.synthesize("Courage", "fr").await.expect("Should succeed");
        assert_eq!(audio, FAKE_MP3);
    }

    #[tokio::test]
    async fn test_google_tts_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&mock_server)
            .await;

        let tts = GoogleTranslateTts::new(
            reqwest::Client::new(),
            format!("{}/translate_tts", mock_server.uri()),
        );

        let err = tts.synthesize("Courage", "ps").await.unwrap_err();
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_google_tts_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let tts = GoogleTranslateTts::new(
            reqwest::Client::new(),
            format!("{}/translate_tts", mock_server.uri()),
        );

        let err = tts.synthesize("Courage", "en").await.unwrap_err();
        assert!(err.to_string().contains("empty audio"));
    }

    #[tokio::test]
    async fn test_google_tts_empty_locale() {
        let tts = GoogleTranslateTts::new(reqwest::Client::new(), "http://127.0.0.1:1/translate_tts");
        assert!(tts.synthesize("Courage", "").await.is_err());
    }
}
