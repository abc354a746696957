use super::{AnalystClient, AnalystError, ChunkStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.9,
            top_k: 32,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Streaming client for Gemini `streamGenerateContent`.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(model: &str) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, model)
    }

    pub fn with_endpoint(endpoint: &str, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("quanteye/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build gemini http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            generation: GenerationConfig::default(),
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl AnalystClient for GeminiClient {
    async fn stream(&self, prompt: String, api_key: &str) -> Result<ChunkStream, AnalystError> {
        if api_key.trim().is_empty() {
            return Err(AnalystError::MissingKey);
        }

        let body = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: &prompt }],
            }],
            generation_config: self.generation,
        };
        let resp = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", api_key.trim())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AnalystError::Rejected {
                status,
                detail: api_error_message(&detail).unwrap_or(detail),
            });
        }

        let mut decoder = SseDecoder::default();
        // `None` marks the end of the body so a final unterminated event is
        // still delivered.
        let chunks = resp
            .bytes_stream()
            .map(Some)
            .chain(stream::once(futures::future::ready(None)))
            .map(move |item| match item {
                Some(Ok(bytes)) => decoder
                    .push(&bytes)
                    .into_iter()
                    .map(|data| chunk_text(&data))
                    .collect::<Vec<_>>(),
                Some(Err(e)) => vec![Err(AnalystError::Network(e))],
                None => decoder.finish().map(|data| chunk_text(&data)).into_iter().collect(),
            })
            .flat_map(stream::iter)
            .filter(|item| {
                let keep = !matches!(item, Ok(text) if text.is_empty());
                futures::future::ready(keep)
            });
        Ok(chunks.boxed())
    }
}

/// Extract the concatenated text of one streamed response event.
fn chunk_text(data: &str) -> Result<String, AnalystError> {
    let resp: GenerateResponse =
        serde_json::from_str(data).map_err(|e| AnalystError::Malformed(e.to_string()))?;
    Ok(resp
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect())
}

/// Pull `error.message` out of a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Incremental decoder for `text/event-stream` bodies. Yields the `data`
/// payload of each complete event.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: BytesMut,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if let Some(event) = self.line(line.chunk()) {
                events.push(event);
            }
        }
        events
    }

    /// Flush what is left once the body has ended: a last line without a
    /// newline and an event missing its terminating blank line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.buf.split();
        if !rest.is_empty() {
            if let Some(event) = self.line(rest.chunk()) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}
