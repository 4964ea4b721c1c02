//! Text-generation backends used by the caption writer.

pub mod gemini;

use anyhow::Result;

pub use gemini::GeminiBackend;

pub trait TextBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Sends one prompt and returns the model's raw text.
    fn complete(&self, prompt: &str) -> Result<String>;
}
