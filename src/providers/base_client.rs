use crate::providers::{FragmentStream, ProviderError};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// `data: [DONE]` ends a stream; nothing after it is parsed.
const DONE_SENTINEL: &str = "[DONE]";

/// Turns one SSE line into an optional text fragment.
pub type StreamParser = fn(&str) -> Result<Option<String>, ProviderError>;

/// How the credential travels with the request.
#[derive(Debug, Clone, Copy)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Raw key in a vendor header such as `x-api-key`.
    Header(&'static str),
}

impl AuthScheme {
    fn header(&self, api_key: &str) -> (&'static str, String) {
        match self {
            AuthScheme::Bearer => ("Authorization", format!("Bearer {}", api_key)),
            AuthScheme::Header(name) => (name, api_key.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth: AuthScheme,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    pub fn new(auth: AuthScheme, extra_headers: Option<HashMap<String, String>>) -> Self {
        Self {
            client: Client::new(),
            auth,
            extra_headers: extra_headers.unwrap_or_default(),
        }
    }

    /// POST `payload` as JSON. Non-2xx answers become a `ProviderError`
    /// carrying the status and a summary of the error body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        base_url: &str,
        path: &str,
        api_key: &str,
        payload: &T,
    ) -> Result<Response, ProviderError> {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), path);
        let (auth_name, auth_value) = self.auth.header(api_key);

        let mut request = self
            .client
            .post(&url)
            .header(auth_name, auth_value)
            .header("Content-Type", "application/json");

        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        tracing::debug!(url = %url, "sending provider request");
        let response = request.json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match error_summary(&body) {
                Some(summary) => format!("{}: {}", status, summary),
                None => status.to_string(),
            };
            return Err(ProviderError::with_status(status.as_u16(), message));
        }

        Ok(response)
    }

    pub fn stream_response(&self, response: Response, parser: StreamParser) -> FragmentStream {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ProviderError::from));
        sse_fragments(body, parser)
    }
}

struct SseState {
    body: BoxStream<'static, Result<Vec<u8>, ProviderError>>,
    buffer: Vec<u8>,
    ready: VecDeque<Result<String, ProviderError>>,
    finished: bool,
}

impl SseState {
    fn drain_lines(&mut self, parser: StreamParser, at_end: bool) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.parse_line(&line[..pos], parser);
            if self.finished {
                return;
            }
        }
        if at_end && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.parse_line(&rest, parser);
        }
    }

    fn parse_line(&mut self, raw: &[u8], parser: StreamParser) {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(e) => {
                self.fail(ProviderError::new(format!("Invalid UTF-8 in stream: {}", e)));
                return;
            }
        };
        if data_payload(line) == Some(DONE_SENTINEL) {
            self.buffer.clear();
            self.finished = true;
            return;
        }
        match parser(line) {
            Ok(Some(fragment)) if !fragment.is_empty() => self.ready.push_back(Ok(fragment)),
            Ok(_) => {}
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, err: ProviderError) {
        self.ready.push_back(Err(err));
        self.buffer.clear();
        self.finished = true;
    }
}

/// Reassemble an SSE body into text fragments. Lines may be split across
/// chunks; fragments come out in the order their lines arrived. The stream
/// ends after the first error or a `[DONE]` line.
pub fn sse_fragments<S>(body: S, parser: StreamParser) -> FragmentStream
where
    S: Stream<Item = Result<Vec<u8>, ProviderError>> + Send + 'static,
{
    let state = SseState {
        body: body.boxed(),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                    state.drain_lines(parser, false);
                }
                Some(Err(e)) => state.fail(e),
                None => {
                    state.drain_lines(parser, true);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

/// Payload of an SSE `data:` line, if this is one.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Pull a one-line summary out of a vendor error body.
pub fn error_summary(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let summary = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .or_else(|| value.get("message").and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| trimmed.to_string()),
        Err(_) => trimmed.to_string(),
    };

    Some(summary.split_whitespace().collect::<Vec<_>>().join(" "))
}
