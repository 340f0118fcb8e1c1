use crate::config::Config;
use crate::conversation::Message;
use crate::error::{AishError, Result};
use crate::providers::streaming::SseProcessor;
use crate::providers::LlmProvider;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::io::Write;

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_url: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize, Debug)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ErrorInfo>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    #[serde(default)]
    delta: DeltaContent,
}

#[derive(Deserialize, Debug, Default)]
struct DeltaContent {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorInfo {
    message: String,
}

impl OpenAIProvider {
    pub fn new(config: &Config) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set, sending requests without authorization");
        }

        Self {
            client: create_client(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_url: config.completions_url(),
        }
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let request = OpenAIRequest {
            model: &self.model,
            messages,
            stream,
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(url = %self.api_url, messages = messages.len(), stream, "sending completion request");
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AishError::Api(format!("{}: {}", status, body)));
        }

        Ok(response)
    }
}

fn extract_content(body: &str) -> Result<String> {
    let response: CompletionResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AishError::Api("response contained no message content".to_string()))
}

fn extract_delta(data: &str) -> Result<Option<String>> {
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(StreamChunk {
            error: Some(error), ..
        }) => Err(AishError::Api(error.message)),
        Ok(chunk) => Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)),
        Err(e) => {
            tracing::warn!("Failed to parse SSE event: {} - {}", e, data);
            Ok(None)
        }
    }
}

/// Create a reqwest client identifying this program
pub fn create_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("aish/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let response = self.send(messages, false).await?;
        let body = response.text().await?;
        extract_content(&body)
    }

    async fn stream_completion(
        &self,
        messages: &[Message],
        output: &mut (dyn Write + Send),
    ) -> Result<String> {
        let response = self.send(messages, true).await?;

        let mut processor = SseProcessor::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            processor.push_chunk(&chunk);
            processor.process_events_with_output(output, extract_delta)?;
        }
        processor.finish_with_output(output, extract_delta)?;

        Ok(processor.into_response())
    }
}
