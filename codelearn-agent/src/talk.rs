//! Tech talk idea generator - streams topic ideas for a summit theme

use codelearn_core::{
    ChatMessage, CompletionRequest, Error, LlmProvider, Result, RetryPolicy, StreamChunk,
};
use futures_core::Stream;
use tracing::debug;

pub const DEFAULT_TOPIC: &str = "AI in DevOps";

/// User prompt for a topic. A blank topic falls back to `DEFAULT_TOPIC`.
pub fn talk_prompt(topic: &str) -> String {
    let topic = match topic.trim() {
        "" => DEFAULT_TOPIC,
        t => t,
    };
    format!(
        "Generate a list of engaging tech talk ideas for a technical summit about: {topic}

For each idea include:
- A catchy title
- A short description (2-3 sentences)
- Key takeaways for the audience

Use headings, sub-headings and bullet points. Suggest 5-7 ideas."
    )
}

pub struct TalkIdeas<P: LlmProvider> {
    provider: P,
    model: Option<String>,
    retry: RetryPolicy,
}

impl<P: LlmProvider> TalkIdeas<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, topic: &str) -> CompletionRequest {
        let request = CompletionRequest::new(vec![ChatMessage::user(talk_prompt(topic))])
            .with_streaming(true);
        match &self.model {
            Some(model) => request.with_model(model.clone()),
            None => request,
        }
    }

    /// Stream text deltas as the model produces them. Opening the stream is
    /// covered by the retry policy; a failure mid-stream ends it with an error.
    pub fn ideas(&self, topic: &str) -> impl Stream<Item = Result<String>> + '_ {
        let request = self.request(topic);
        async_stream::try_stream! {
            use futures_util::StreamExt;

            debug!(provider = self.provider.name(), "requesting talk ideas");
            let provider = &self.provider;
            let request = &request;
            let mut chunks = self
                .retry
                .run("talk::stream", move || {
                    let request = request.clone();
                    async move {
                        provider
                            .stream(request)
                            .await
                            .map_err(|e| e.into_error("talk::stream"))
                    }
                })
                .await?;

            while let Some(chunk) = chunks.next().await {
                match chunk {
                    StreamChunk::Text(text) => yield text,
                    StreamChunk::Done { .. } => break,
                    StreamChunk::Error(message) => {
                        Err::<(), Error>(
                            Error::external_service(message)
                                .with_operation("talk::stream")
                                .permanent(),
                        )?;
                    }
                }
            }
        }
    }
}
