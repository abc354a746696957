//! AI portfolio analyst: prompt assembly, chat transcript and the streaming
//! Gemini client.

mod gemini;
mod prompt;
mod transcript;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::StatusCode;

pub use gemini::{GeminiClient, DEFAULT_MODEL};
pub use prompt::build_prompt;
pub use transcript::Transcript;

pub type ChunkStream = BoxStream<'static, Result<String, AnalystError>>;

#[derive(Debug, thiserror::Error)]
pub enum AnalystError {
    #[error("Gemini API key is not set")]
    MissingKey,
    #[error("request to Gemini failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Gemini API returned {status}: {detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("malformed Gemini response: {0}")]
    Malformed(String),
}

/// A language model that answers one prompt as a stream of text chunks.
#[async_trait]
pub trait AnalystClient: Send + Sync {
    async fn stream(&self, prompt: String, api_key: &str) -> Result<ChunkStream, AnalystError>;
}
