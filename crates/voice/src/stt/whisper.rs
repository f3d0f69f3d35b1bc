//! OpenAI-compatible Whisper transcription API.
//!
//! Works against api.openai.com as well as self-hosted servers exposing the
//! same `/audio/transcriptions` endpoint.

use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
    voxrelay_config::CloudSttConfig,
};

use super::{SttError, SttProvider, TRANSCRIBE_TIMEOUT};

/// Cloud Whisper STT engine.
#[derive(Clone)]
pub struct WhisperStt {
    client: Client,
    api_key: Option<Secret<String>>,
    base_url: String,
    model: String,
    language: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for WhisperStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperStt")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl WhisperStt {
    #[must_use]
    pub fn new(config: &CloudSttConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            language: config.language.clone(),
            timeout: TRANSCRIBE_TIMEOUT,
        }
    }

    /// Override the transcription deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> Result<&Secret<String>, SttError> {
        self.api_key.as_ref().ok_or_else(|| {
            SttError::EngineUnavailable("API key not configured for Whisper".into())
        })
    }
}

#[async_trait]
impl SttProvider for WhisperStt {
    fn id(&self) -> &'static str {
        "whisper"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(&self, audio: &Path) -> Result<String, SttError> {
        let api_key = self.api_key()?;

        let bytes = tokio::fs::read(audio).await.map_err(|e| {
            SttError::EngineFailure(format!("failed to read {}: {e}", audio.display()))
        })?;
        let filename = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.ogg")
            .to_string();
        let mime = voxrelay_media::audio_mime_type(audio);

        let file_part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime)
            .map_err(|e| SttError::EngineFailure(format!("failed to create file part: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        debug!(model = %self.model, audio = %audio.display(), "sending transcription request");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::EngineFailure(format!(
                "transcription request failed: {status} - {body}"
            )));
        }

        let parsed: WhisperResponse = response
            .json()
            .await
            .map_err(|e| self.classify(e))?;
        Ok(parsed.text.trim().to_string())
    }
}

impl WhisperStt {
    fn classify(&self, e: reqwest::Error) -> SttError {
        if e.is_timeout() {
            SttError::Timeout(self.timeout)
        } else if e.is_connect() {
            SttError::EngineUnavailable(format!("transcription service unreachable: {e}"))
        } else {
            SttError::EngineFailure(format!("transcription request failed: {e}"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}
