//! Terminal speech stand-in
//!
//! Reads the "spoken" passphrase as one typed line on stdin. Useful for
//! exercising the voice ceremony against a real backend from a shell.

use super::{
    PlatformError, Releasable, RecognitionOptions, RecognitionResult, RecognitionSession,
    SpeechRecognizer,
};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub struct ConsoleRecognizer {
    _private: (),
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for ConsoleRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for ConsoleRecognizer {
    async fn start(
        &self,
        options: RecognitionOptions,
    ) -> Result<Box<dyn RecognitionSession>, PlatformError> {
        log::info!(
            "Console recognition started (lang={}, continuous={})",
            options.lang,
            options.continuous
        );
        Ok(Box::new(ConsoleSession { active: true }))
    }
}

struct ConsoleSession {
    active: bool,
}

#[async_trait]
impl RecognitionSession for ConsoleSession {
    async fn final_result(&mut self) -> Result<RecognitionResult, PlatformError> {
        if !self.active {
            return Err(PlatformError::Recognition("session aborted".to_string()));
        }

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(b"> ")
            .await
            .map_err(|e| PlatformError::Hardware(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| PlatformError::Hardware(e.to_string()))?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| PlatformError::Hardware(e.to_string()))?;

        let transcript = line.trim();
        if transcript.is_empty() {
            return Err(PlatformError::NoSpeech);
        }

        Ok(RecognitionResult::single(transcript))
    }
}

impl Releasable for ConsoleSession {
    fn release(&mut self) {
        if self.active {
            log::debug!("Console recognition stopped");
        }
        self.active = false;
    }
}
