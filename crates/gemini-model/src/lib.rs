//! A model provider for the Google Gemini API.
//!
//! Requests go to `models/{model}:streamGenerateContent` with `alt=sse`,
//! and the returned event stream is surfaced as a [`ModelResponse`].
//!
//! [`ModelResponse`]: delta_assistant_model::ModelResponse

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use delta_assistant_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use mime::Mime;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};

pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig, GeminiConfigBuilder,
};
use io::{Chunks, Sse};
use proto::ErrorResponse;
use response::GeminiResponse;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Gemini model provider.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;
    type Response = GeminiResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let gemini_req = proto::create_request(req);
        let resp_fut = self
            .client
            .post(self.config.stream_url())
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .json(&gemini_req)
            .send();

        async move {
            let resp = resp_fut
                .await
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(status_error(status, &body));
            }

            check_content_type(resp.headers())?;

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(GeminiResponse::from_sse(sse))
        }
    }
}

fn check_content_type(headers: &HeaderMap) -> Result<(), Error> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let is_event_stream = content_type
        .and_then(|v| v.parse().ok())
        .is_some_and(|m: Mime| m.subtype().as_str() == "event-stream");
    if !is_event_stream {
        return Err(Error::new(
            format!("Unexpected content type: {content_type:?}"),
            ErrorKind::MalformedResponse,
        ));
    }
    Ok(())
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ErrorKind::Unauthenticated
        }
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    };
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|resp| resp.error.message)
        .filter(|message| !message.is_empty());
    let message = match detail {
        Some(detail) => format!("HTTP {status}: {detail}"),
        None => format!("HTTP {status}"),
    };
    debug!("request rejected: {message}");
    Error::new(message, kind)
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use delta_assistant_model::{
        ModelFinishReason, ModelResponse, ModelResponseEvent,
    };
    use reqwest::header::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves `response` to a single request and returns the base URL.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0; 4096];
            // Read the whole request before answering.
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                let Some(head_end) = text.find("\r\n\r\n") else {
                    continue;
                };
                let body_len = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + body_len {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn provider_for(base_url: String) -> GeminiProvider {
        let config = GeminiConfigBuilder::with_api_key("test-key")
            .with_base_url(base_url)
            .build();
        GeminiProvider {
            client: Client::builder().no_proxy().build().unwrap(),
            config: Arc::new(config),
        }
    }

    #[test]
    fn test_content_type_check() {
        let mut headers = HeaderMap::new();
        let err = check_content_type(&headers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let err = check_content_type(&headers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream; charset=utf-8"),
        );
        assert!(check_content_type(&headers).is_ok());
    }

    #[tokio::test]
    async fn test_send_request_maps_status() {
        let base_url = serve_once(http_response(
            "429 Too Many Requests",
            "application/json",
            r#"{"error": {"code": 429, "message": "Quota exceeded."}}"#,
        ))
        .await;
        let err = provider_for(base_url)
            .send_request(&ModelRequest::single_turn("hello"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(err.message(), "HTTP 429 Too Many Requests: Quota exceeded.");
    }

    #[tokio::test]
    async fn test_send_request_rejects_non_stream() {
        let base_url =
            serve_once(http_response("200 OK", "application/json", "{}")).await;
        let err = provider_for(base_url)
            .send_request(&ModelRequest::single_turn("hello"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_send_request_streams() {
        let body = "data: {\"candidates\": [{\"content\": {\"role\": \"model\", \
                    \"parts\": [{\"text\": \"print(1)\"}]}, \
                    \"finishReason\": \"STOP\"}]}\r\n\r\n";
        let base_url =
            serve_once(http_response("200 OK", "text/event-stream", body)).await;
        let resp = provider_for(base_url)
            .send_request(&ModelRequest::single_turn("hello"))
            .await
            .unwrap();

        let mut resp = pin!(resp);
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap()
        {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("print(1)".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[test]
    fn test_status_mapping() {
        let err = status_error(StatusCode::FORBIDDEN, "");
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(err.message(), "HTTP 403 Forbidden");

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);

        let err = status_error(StatusCode::BAD_GATEWAY, "<html></html>");
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_error_body_is_surfaced() {
        let body = r#"{
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        }"#;
        let err = status_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err.message(),
            "HTTP 400 Bad Request: API key not valid. Please pass a valid API key."
        );
        assert_eq!(
            err.to_string(),
            "HTTP 400 Bad Request: API key not valid. Please pass a valid \
             API key. (other)"
        );
    }
}
