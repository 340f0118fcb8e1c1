pub mod openai;
pub mod streaming;

use crate::config::Config;
use crate::conversation::Message;
use crate::error::Result;
use async_trait::async_trait;
use std::io::Write;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends the whole conversation and waits for the full reply.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Sends the whole conversation, writing text deltas to `output` as they
    /// arrive. Returns the full reply.
    async fn stream_completion(
        &self,
        messages: &[Message],
        output: &mut (dyn Write + Send),
    ) -> Result<String>;
}

pub fn create_provider(config: &Config) -> Box<dyn LlmProvider> {
    Box::new(openai::OpenAIProvider::new(config))
}
