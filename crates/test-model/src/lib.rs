//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use delta_assistant_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
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

pub struct TestModelResponse {
    preset: PresetResponse,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let events = &this.preset.events;
            let idx = this.event_idx;
            this.event_idx += 1;
            return match events.get(idx) {
                Some(PresetEvent::MessageDelta(msg)) => Poll::Ready(Ok(Some(
                    ModelResponseEvent::MessageDelta(msg.clone()),
                ))),
                Some(PresetEvent::StreamError(kind)) => {
                    // Nothing is produced after an error.
                    this.event_idx = usize::MAX;
                    Poll::Ready(Err(Error {
                        message: "preset stream error",
                        kind: *kind,
                    }))
                }
                None if idx == events.len() => Poll::Ready(Ok(Some(
                    ModelResponseEvent::Completed(ModelFinishReason::Stop),
                ))),
                // In case this method is called after completion.
                None => {
                    this.event_idx = usize::MAX;
                    Poll::Ready(Ok(None))
                }
            };
        }
        if this.event_idx > this.preset.events.len() {
            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, add one [`PresetResponse`] per user turn you
/// expect. The response is selected by counting the user messages in the
/// request, so the first user turn gets the first preset, and so on. A
/// single-turn request always gets the first preset. If there are not
/// enough presets, an error is returned.
///
/// Every request is recorded and can be inspected with
/// [`received_requests`](Self::received_requests). Clones share the
/// record.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    responses: Vec<PresetResponse>,
    delay: Option<Duration>,
    received: Arc<Mutex<Vec<ModelRequest>>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.responses.push(preset);
    }

    /// Sets the delay before each event. Defaults to 1ms.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests sent to this provider so far, oldest first.
    pub fn received_requests(&self) -> Vec<ModelRequest> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    fn select_response(
        &self,
        req: &ModelRequest,
    ) -> Result<PresetResponse, Error> {
        let user_turns = req
            .messages
            .iter()
            .filter(|msg| matches!(msg, ModelMessage::User(_)))
            .count();
        let Some(step_idx) = user_turns.checked_sub(1) else {
            return Err(Error {
                message: "request has no user message",
                kind: ErrorKind::Other,
            });
        };
        let Some(preset) = self.responses.get(step_idx) else {
            return Err(Error {
                message: "not enough preset responses",
                kind: ErrorKind::Other,
            });
        };
        if let Some(kind) = preset.failure {
            return Err(Error {
                message: "preset request failure",
                kind,
            });
        }
        Ok(preset.clone())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        if let Ok(mut received) = self.received.lock() {
            received.push(req.clone());
        }
        let result = self.select_response(req).map(|preset| TestModelResponse {
            preset,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> Result<String, Error> {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?;
            match event {
                Some(ModelResponseEvent::MessageDelta(delta)) => {
                    msg.push_str(&delta);
                }
                Some(ModelResponseEvent::Completed(_)) => {}
                None => break,
            }
        }
        Ok(msg)
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_text("Sure."));

        let mut req = ModelRequest::single_turn("Hi");
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "Hello, world!");

        req.messages
            .push(ModelMessage::Assistant("Hello, world!".to_owned()));
        req.messages.push(ModelMessage::User("Write a script".to_owned()));
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "Sure.");

        let received = provider.received_requests();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::failing(ErrorKind::Unauthenticated));
        let err = provider
            .send_request(&ModelRequest::single_turn("Hi"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("partial".to_owned()),
            PresetEvent::StreamError(ErrorKind::Moderated),
        ]));
        let resp = provider
            .send_request(&ModelRequest::single_turn("Hi"))
            .await
            .unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_not_enough_presets() {
        let provider = TestModelProvider::default();
        let err = provider
            .send_request(&ModelRequest::single_turn("Hi"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.received_requests().len(), 1);
    }
}
