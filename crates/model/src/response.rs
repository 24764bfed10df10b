use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed reply, produced by [`ModelProvider::send_request`].
///
/// [`ModelProvider::send_request`]: crate::ModelProvider::send_request
pub trait ModelResponse: Sized + Send + 'static {
    /// The error produced when the stream breaks.
    type Error: ModelProviderError;

    /// Polls for the next event of the reply.
    ///
    /// Yields `Ok(Some(_))` for every delta and for the final
    /// [`ModelResponseEvent::Completed`], then `Ok(None)` once the stream
    /// is exhausted and on every later call. An `Err` ends the stream and
    /// discards whatever text was produced so far.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped producing text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// Natural end of the answer.
    Stop,
    /// The output-length cap was reached.
    MaxTokens,
    /// The provider withheld (part of) the output for safety reasons.
    Blocked,
    /// Any other reason reported by the provider.
    Other,
}

/// One step of a streamed reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// A piece of text to be appended to the reply.
    MessageDelta(String),
    /// No more text follows.
    Completed(ModelFinishReason),
}
