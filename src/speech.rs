// Text-to-speech collaborator. Synthesis itself happens in an external service.
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SpeechConfig;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> anyhow::Result<()>;
}

/// Hands utterances to the log instead of an audio device.
pub struct LoggingSynthesizer {
    language: String,
}

impl LoggingSynthesizer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for LoggingSynthesizer {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        tracing::info!("Speaking [{}]: {}", self.language, text);
        Ok(())
    }
}

pub struct SilentSynthesizer;

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn speak(&self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn from_config(config: &SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
    if config.enabled {
        Arc::new(LoggingSynthesizer::new(config.language.clone()))
    } else {
        Arc::new(SilentSynthesizer)
    }
}

/// Fire-and-forget: the caller never waits on synthesis.
pub fn speak_detached(synth: Arc<dyn SpeechSynthesizer>, text: String) {
    tokio::spawn(async move {
        if let Err(e) = synth.speak(&text).await {
            tracing::warn!("Speech synthesis failed: {}", e);
        }
    });
}
