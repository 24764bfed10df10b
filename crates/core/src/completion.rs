//! One-shot requests to the text-generation service.

use std::error::Error;
use std::fmt::{self, Display};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use delta_assistant_model::{
    ErrorKind, GenerationConfig, ModelFinishReason, ModelMessage,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

use crate::conversation::Message;

/// Persona and scope of the chat assistant.
pub const SYSTEM_INSTRUCTION: &str = "You are DeltaAI, an expert in Roblox \
    Lua scripting and game optimization. Help users create, debug, and \
    understand scripts. Keep answers concise and helpful.";

/// Reply used when the chat model answers with no text.
pub const CHAT_FALLBACK: &str = "I'm sorry, I couldn't process that.";
/// Reply used when script generation yields no text.
pub const GENERATE_FALLBACK: &str = "-- Failed to generate script";
/// Reply used when script explanation yields no text.
pub const EXPLAIN_FALLBACK: &str = "No explanation available.";

const GENERATE_PARAMS: GenerationConfig = GenerationConfig {
    temperature: Some(0.7),
    max_output_tokens: Some(1000),
};
const EXPLAIN_PARAMS: GenerationConfig = GenerationConfig {
    temperature: Some(0.5),
    max_output_tokens: Some(500),
};

/// A failed completion request.
///
/// Carries the provider's error kind and message. Callers facing users
/// are expected to show their own localized text instead of this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationFailure {
    kind: ErrorKind,
    message: String,
}

impl GenerationFailure {
    fn from_provider_error<E: ModelProviderError>(err: &E) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// A request that ended without an answer from the provider, such as
    /// a panicking provider.
    pub(crate) fn aborted(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Other,
            message: message.into(),
        }
    }

    /// Returns the kind of the underlying provider error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the underlying provider error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation failed: {}", self.message)
    }
}

impl Error for GenerationFailure {}

type CompleteResult = Result<Completion, GenerationFailure>;
type BoxedCompleteFuture = Pin<Box<dyn Future<Output = CompleteResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedCompleteFuture + Send + Sync>;

/// A wrapper around a model provider exposing the assistant's three
/// operations: multi-turn chat, script generation and script explanation.
///
/// The client is stateless. Credentials live in the provider, which is
/// configured once at construction. Every call is a single attempt with
/// no retry and no timeout of its own, and clones can be used
/// concurrently.
#[derive(Clone)]
pub struct CompletionClient {
    handler_fn: HandlerFn,
}

impl CompletionClient {
    /// Creates a client backed by `provider`.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `CompletionClient` doesn't
        // have a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("completion req")),
            )
        });
        Self { handler_fn }
    }

    /// Answers `text` in the context of `history`.
    ///
    /// Every message of `history` is replayed to the model ahead of the
    /// new user turn, after the fixed [`SYSTEM_INSTRUCTION`]. `text` is
    /// expected to be non-blank. An empty answer is replaced by
    /// [`CHAT_FALLBACK`].
    pub async fn chat(
        &self,
        history: &[Message],
        text: &str,
    ) -> Result<String, GenerationFailure> {
        let mut messages: Vec<ModelMessage> =
            history.iter().map(Message::to_model_message).collect();
        messages.push(ModelMessage::User(text.to_owned()));
        let req = ModelRequest {
            system_instruction: Some(SYSTEM_INSTRUCTION.to_owned()),
            messages,
            generation: GenerationConfig::default(),
        };

        let completion = self.complete(req).await?;
        if completion.text.trim().is_empty() {
            return Ok(CHAT_FALLBACK.to_owned());
        }
        Ok(completion.text)
    }

    /// Writes a Roblox Lua script for `prompt`. Returns code only.
    pub async fn generate_script(
        &self,
        prompt: &str,
    ) -> Result<String, GenerationFailure> {
        let mut req = ModelRequest::single_turn(format!(
            "Write a Lua script for Roblox based on this request: {prompt}. \
             Return ONLY the code, no markdown blocks, no extra text."
        ));
        req.generation = GENERATE_PARAMS;
        let completion = self.complete(req).await?;
        Ok(trimmed_or(completion.text, GENERATE_FALLBACK))
    }

    /// Explains what `code` does in simple terms.
    pub async fn explain_script(
        &self,
        code: &str,
    ) -> Result<String, GenerationFailure> {
        let mut req = ModelRequest::single_turn(format!(
            "Explain how this Roblox Lua script works in simple terms: \n\n{code}"
        ));
        req.generation = EXPLAIN_PARAMS;
        let completion = self.complete(req).await?;
        Ok(trimmed_or(completion.text, EXPLAIN_FALLBACK))
    }

    #[inline]
    async fn complete(&self, req: ModelRequest) -> CompleteResult {
        (self.handler_fn)(req).await
    }
}

#[inline]
fn trimmed_or(text: String, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// A completely received response.
#[derive(Clone, Debug)]
struct Completion {
    text: String,
    finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> CompleteResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("request failed: {err}");
            return Err(GenerationFailure::from_provider_error(&err));
        }
    };

    let mut text = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("response failed: {err}");
                return Err(GenerationFailure::from_provider_error(&err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason)
            }
        }
    }

    let completion = Completion {
        text,
        finish_reason,
    };
    if completion.finish_reason != Some(ModelFinishReason::Stop) {
        debug!("response finished with {:?}", completion.finish_reason);
    }
    trace!("finished a request");
    Ok(completion)
}
