//! Chat-completions client with optional streaming.
//!
//! When streaming is enabled the response arrives as SSE `data:` lines;
//! each content fragment is appended to one growing buffer and the caller
//! observes the buffer after every increment, so partial output is visible
//! before the call completes.
//!
//! Rate limits are retried on the shared fixed-delay policy; when the
//! attempt cap is exhausted the call degrades to a literal fallback
//! message instead of failing the session.

use std::time::Duration;

use crate::config::ChatConfig;
use crate::error::PipelineError;
use crate::models::ChatMessage;
use crate::retry::RetryPolicy;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Returned when every retry attempt was rate limited.
pub const RATE_LIMIT_FALLBACK: &str =
    "Sorry, the request could not be completed due to rate limits. Please try again later.";

/// Observer for streamed output: called with (delta, full buffer so far)
/// after each received fragment. `Sync` so a streaming call can be held
/// across awaits inside `Send` futures.
pub type StreamObserver<'a> = &'a (dyn Fn(&str, &str) + Sync);

/// Client for the hosted chat-completions API.
pub struct CompletionClient {
    http: reqwest::Client,
    config: ChatConfig,
    url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl CompletionClient {
    /// Create a client from configuration. Fails if `OPENAI_API_KEY` is
    /// not set in the environment.
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_CHAT_URL.to_string()),
            api_key,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(config.retry_delay_secs),
            ),
            config: config.clone(),
        })
    }

    /// Send `messages` to the completion API and return the full answer.
    /// With an observer and streaming enabled, fragments are surfaced as
    /// they arrive. Exhausted rate-limit retries yield the fallback
    /// message rather than an error.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        observer: Option<StreamObserver<'_>>,
    ) -> Result<String, PipelineError> {
        let result = self
            .retry
            .run(|| self.complete_once(messages, observer))
            .await;

        match result {
            Ok(answer) => Ok(answer),
            Err(PipelineError::RateLimited(_)) => {
                // Nothing was streamed on the failed attempts; the
                // fallback has to reach the observer too or a streaming
                // caller would show nothing at all.
                if let Some(observe) = observer {
                    observe(RATE_LIMIT_FALLBACK, RATE_LIMIT_FALLBACK);
                }
                Ok(RATE_LIMIT_FALLBACK.to_string())
            }
            Err(e) => Err(e),
        }
    }

    async fn complete_once(
        &self,
        messages: &[ChatMessage],
        observer: Option<StreamObserver<'_>>,
    ) -> Result<String, PipelineError> {
        let stream = self.config.stream && observer.is_some();

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": stream,
        });

        let resp = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return if status.as_u16() == 429 {
                Err(PipelineError::RateLimited(format!(
                    "completions API {}: {}",
                    status, body_text
                )))
            } else if status.is_server_error() {
                Err(PipelineError::Transient(format!(
                    "completions API {}: {}",
                    status, body_text
                )))
            } else {
                Err(PipelineError::Upstream(format!(
                    "completions API {}: {}",
                    status, body_text
                )))
            };
        }

        if !stream {
            let json: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| PipelineError::Upstream(e.to_string()))?;
            return parse_completion_response(&json);
        }

        let mut resp = resp;
        let mut acc = SseAccumulator::new();
        while let Some(bytes) = resp
            .chunk()
            .await
            .map_err(|e| PipelineError::Transient(e.to_string()))?
        {
            for delta in acc.push(&bytes) {
                if let Some(observe) = observer {
                    observe(&delta, acc.buffer());
                }
            }
        }

        Ok(acc.into_buffer())
    }
}

/// Extract `choices[0].message.content` from a non-streaming response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String, PipelineError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            PipelineError::Upstream("invalid completion response: missing content".to_string())
        })
}

/// Incremental parser for SSE chat-completion streams.
///
/// Feed raw bytes with [`push`](SseAccumulator::push); content deltas are
/// returned per call and also appended to the single growing buffer.
pub struct SseAccumulator {
    pending: String,
    buffer: String,
    done: bool,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self {
            pending: String::new(),
            buffer: String::new(),
            done: false,
        }
    }

    /// The full output accumulated so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn into_buffer(self) -> String {
        self.buffer
    }

    /// Feed received bytes; returns the content deltas completed by this
    /// call, in arrival order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut deltas = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            if let Some(delta) = self.parse_line(line.trim()) {
                self.buffer.push_str(&delta);
                deltas.push(delta);
            }
        }
        deltas
    }

    fn parse_line(&mut self, line: &str) -> Option<String> {
        if self.done {
            return None;
        }
        let payload = line.strip_prefix("data:")?.trim();
        if payload == "[DONE]" {
            self.done = true;
            return None;
        }

        let json: serde_json::Value = serde_json::from_str(payload).ok()?;
        let content = json
            .get("choices")?
            .as_array()?
            .first()?
            .get("delta")?
            .get("content")?
            .as_str()?;
        if content.is_empty() {
            None
        } else {
            Some(content.to_string())
        }
    }
}

impl Default for SseAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_line(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn accumulates_deltas_into_growing_buffer() {
        let mut acc = SseAccumulator::new();
        let d1 = acc.push(data_line("Hel").as_bytes());
        assert_eq!(d1, vec!["Hel".to_string()]);
        assert_eq!(acc.buffer(), "Hel");

        let d2 = acc.push(data_line("lo!").as_bytes());
        assert_eq!(d2, vec!["lo!".to_string()]);
        assert_eq!(acc.buffer(), "Hello!");
    }

    #[test]
    fn handles_lines_split_across_chunks() {
        let line = data_line("partial");
        let (a, b) = line.split_at(10);

        let mut acc = SseAccumulator::new();
        assert!(acc.push(a.as_bytes()).is_empty());
        let deltas = acc.push(b.as_bytes());
        assert_eq!(deltas, vec!["partial".to_string()]);
    }

    #[test]
    fn multiple_data_lines_in_one_chunk() {
        let chunk = format!("{}{}", data_line("one "), data_line("two"));
        let mut acc = SseAccumulator::new();
        let deltas = acc.push(chunk.as_bytes());
        assert_eq!(deltas.len(), 2);
        assert_eq!(acc.buffer(), "one two");
    }

    #[test]
    fn done_marker_stops_parsing() {
        let mut acc = SseAccumulator::new();
        acc.push(data_line("end").as_bytes());
        acc.push(b"data: [DONE]\n");
        let after = acc.push(data_line("ignored").as_bytes());
        assert!(after.is_empty());
        assert_eq!(acc.buffer(), "end");
    }

    #[test]
    fn ignores_non_data_lines_and_empty_deltas() {
        let mut acc = SseAccumulator::new();
        assert!(acc.push(b": keepalive\n\n").is_empty());
        let empty = format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {}}]})
        );
        assert!(acc.push(empty.as_bytes()).is_empty());
        assert_eq!(acc.buffer(), "");
    }

    #[test]
    fn parses_non_streaming_response() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "The answer."}}]
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "The answer.");
    }

    #[test]
    fn missing_content_is_upstream_error() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_completion_response(&json),
            Err(PipelineError::Upstream(_))
        ));
    }

    #[test]
    fn complete_future_is_send() {
        fn assert_send<T: Send>(_: T) {}

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let client = CompletionClient::new(&ChatConfig::default()).unwrap();
        let messages = [ChatMessage::user("q")];
        let observer = |_: &str, _: &str| {};
        // Never polled; only the bound matters.
        assert_send(client.complete(&messages, Some(&observer)));
    }

    #[tokio::test]
    async fn exhausted_rate_limits_surface_fallback_to_observer() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Minimal server that answers 429 to every request.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let config = ChatConfig {
            url: Some(format!("http://{}", addr)),
            max_retries: 2,
            retry_delay_secs: 0,
            stream: true,
            ..ChatConfig::default()
        };
        let client = CompletionClient::new(&config).unwrap();

        let seen = std::sync::Mutex::new(Vec::new());
        let observer = |delta: &str, _buffer: &str| {
            seen.lock().unwrap().push(delta.to_string());
        };
        let answer = client
            .complete(&[ChatMessage::user("q")], Some(&observer))
            .await
            .unwrap();

        assert_eq!(answer, RATE_LIMIT_FALLBACK);
        // The degraded answer is visible through the stream too.
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            [RATE_LIMIT_FALLBACK.to_string()]
        );
    }
}
