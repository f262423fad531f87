//! HTTP client for a local chat endpoint.
//!
//! Request body is `{model, system_message, messages, stream}`. A non-streaming
//! reply is a single `{message: {content}}` object; a streaming reply is
//! newline-delimited JSON, one `{message: {content}, done}` object per line,
//! with `done: true` on the last one.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{LanguageModel, Message};
use crate::config::LlmConfig;
use crate::error::LlmError;

/// Tracing target of the full request dump emitted when `llm.verbose` is set.
pub const REQUEST_LOG_TARGET: &str = "smala::request";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_message: Option<&'a str>,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ReplyMessage>,
    #[serde(default)]
    done: bool,
}

/// [`LanguageModel`] backed by a chat endpoint such as Ollama's `/api/chat`.
#[derive(Debug, Clone)]
pub struct HttpLanguageModel {
    client: reqwest::Client,
    api_url: String,
    model: String,
    system_message: String,
    verbose: bool,
    request_timeout: Duration,
}

impl HttpLanguageModel {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            system_message: config.system_message.clone(),
            verbose: config.verbose,
            request_timeout,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request<'a>(
        &'a self,
        messages: &'a [Message],
        system_message: Option<&'a str>,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            system_message: Some(system_message.unwrap_or(self.system_message.as_str())),
            messages,
            stream,
        }
    }

    async fn post(
        &self,
        body: &ChatRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, LlmError> {
        if self.verbose {
            let json = serde_json::to_string(body).unwrap_or_default();
            info!(target: REQUEST_LOG_TARGET, url = %self.api_url, request = %json, "sending request");
        } else {
            debug!(url = %self.api_url, messages = body.messages.len(), stream = body.stream, "sending request");
        }

        let mut request = self.client.post(&self.api_url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status));
        }
        Ok(response)
    }

    /// Non-streaming generation with the failure kept visible.
    pub async fn try_generate(
        &self,
        messages: &[Message],
        system_message: Option<&str>,
    ) -> Result<String, LlmError> {
        let body = self.request(messages, system_message, false);
        let response = self.post(&body, Some(self.request_timeout)).await?;
        let bytes = response.bytes().await?;

        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(LlmError::MalformedBody)?;
        parsed
            .message
            .map(|m| m.content)
            .ok_or(LlmError::MissingContent)
    }

    /// Streaming generation with the failure kept visible.
    pub async fn try_generate_streaming(
        &self,
        messages: &[Message],
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, LlmError> {
        let body = self.request(messages, None, true);
        let mut response = self.post(&body, None).await?;

        let mut assembler = StreamAssembler::default();
        while let Some(chunk) = response.chunk().await? {
            if assembler.push(&chunk, on_fragment) {
                break;
            }
        }
        Ok(assembler.finish(on_fragment))
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(
        &self,
        messages: &[Message],
        system_message: Option<&str>,
    ) -> Option<String> {
        match self.try_generate(messages, system_message).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(url = %self.api_url, error = %error_chain(&e), "language model request failed");
                None
            }
        }
    }

    async fn generate_streaming(
        &self,
        messages: &[Message],
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Option<String> {
        match self.try_generate_streaming(messages, on_fragment).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(url = %self.api_url, error = %error_chain(&e), "streaming request failed");
                None
            }
        }
    }
}

/// Reassembles newline-delimited chunks into one reply.
///
/// Bytes are buffered until a full line is present, so a fragment (or a UTF-8
/// sequence) split across network reads is parsed only once it is complete.
#[derive(Debug, Default)]
pub(crate) struct StreamAssembler {
    buffer: Vec<u8>,
    reply: String,
    done: bool,
}

impl StreamAssembler {
    /// Feed raw bytes. Returns `true` once the terminal fragment has been seen.
    pub(crate) fn push(&mut self, bytes: &[u8], on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send)) -> bool {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.accept_line(&line[..pos], on_fragment);
            if self.done {
                return true;
            }
        }
        false
    }

    /// Flush a trailing line that arrived without a newline and return the reply.
    pub(crate) fn finish(mut self, on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send)) -> String {
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.accept_line(&line, on_fragment);
        }
        self.reply
    }

    fn accept_line(&mut self, line: &[u8], on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send)) {
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        match parse_fragment(line) {
            Ok(chunk) => {
                if let Some(message) = chunk.message {
                    if !message.content.is_empty() {
                        on_fragment(&message.content);
                        self.reply.push_str(&message.content);
                    }
                }
                self.done = chunk.done;
            }
            Err(e) => warn!(error = %error_chain(&e), "skipping stream fragment"),
        }
    }
}

fn parse_fragment(line: &[u8]) -> Result<ChatChunk, LlmError> {
    serde_json::from_slice(line).map_err(|source| LlmError::Fragment {
        line: String::from_utf8_lossy(line).into_owned(),
        source,
    })
}

/// Render an error with all of its sources, `outer: inner: root`.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut rendered = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        source = inner.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chunks: &[&[u8]]) -> (String, Vec<String>, bool) {
        let mut fragments = Vec::new();
        let mut sink = |f: &str| fragments.push(f.to_string());
        let mut assembler = StreamAssembler::default();
        let mut done = false;
        for chunk in chunks {
            if assembler.push(chunk, &mut sink) {
                done = true;
                break;
            }
        }
        let reply = assembler.finish(&mut sink);
        (reply, fragments, done)
    }

    #[test]
    fn assembles_fragments_until_done() {
        let (reply, fragments, done) = collect(&[
            b"{\"message\":{\"content\":\"Hel\"},\"done\":false}\n",
            b"{\"message\":{\"content\":\"lo\"},\"done\":false}\n",
            b"{\"message\":{\"content\":\"\"},\"done\":true}\n",
            b"{\"message\":{\"content\":\"ignored\"},\"done\":false}\n",
        ]);
        assert!(done);
        assert_eq!(reply, "Hello");
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[test]
    fn line_split_across_reads_is_joined() {
        let (reply, _, done) = collect(&[
            b"{\"message\":{\"con",
            b"tent\":\"caf\xc3",
            b"\xa9\"},\"done\":true}\n",
        ]);
        assert!(done);
        assert_eq!(reply, "café");
    }

    #[test]
    fn malformed_fragment_is_skipped() {
        let (reply, fragments, _) = collect(&[
            b"{\"message\":{\"content\":\"a\"}}\n",
            b"not json at all\n",
            b"\n",
            b"{\"message\":{\"content\":\"b\"},\"done\":true}\n",
        ]);
        assert_eq!(reply, "ab");
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn trailing_line_without_newline_is_kept() {
        let (reply, _, done) = collect(&[
            b"{\"message\":{\"content\":\"one \"}}\n",
            b"{\"message\":{\"content\":\"two\"}}",
        ]);
        assert!(!done);
        assert_eq!(reply, "one two");
    }

    #[test]
    fn request_falls_back_to_default_system_message() {
        let model = HttpLanguageModel::new(&LlmConfig::default()).unwrap();
        let messages = vec![Message::user("hi")];

        let body = serde_json::to_value(model.request(&messages, None, false)).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["system_message"], LlmConfig::default().system_message);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");

        let body = serde_json::to_value(model.request(&messages, Some("be brief"), true)).unwrap();
        assert_eq!(body["system_message"], "be brief");
        assert_eq!(body["stream"], true);
    }
}
