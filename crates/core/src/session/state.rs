use std::fmt::{self, Debug};
use std::mem;

use delta_assistant_actor::{Actor, Message as ActorMessage};
use tracing::Instrument;

use super::builder::SessionBuilder;
use super::{RejectReason, SessionSnapshot, Submission};
use crate::completion::{CompletionClient, GenerationFailure};
use crate::conversation::{Conversation, Message};

/// The client lives in `Idle` and travels with the in-flight request, so
/// a second concurrent request cannot be issued.
pub(super) enum SessionStage {
    Idle(CompletionClient),
    Awaiting,
}

pub(super) struct SessionState {
    pub(super) conversation: Conversation,
    stage: SessionStage,
    failure_message: String,
    on_message: Option<Box<dyn Fn(&Message) + Send + Sync>>,
    on_busy_changed: Option<Box<dyn Fn(bool) + Send + Sync>>,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SessionState {
    pub(super) fn new(builder: SessionBuilder) -> Self {
        let SessionBuilder {
            client,
            greeting,
            failure_message,
            on_message,
            on_busy_changed,
            on_idle,
        } = builder;
        Self {
            conversation: Conversation::with_greeting(greeting),
            stage: SessionStage::Idle(client),
            failure_message,
            on_message,
            on_busy_changed,
            on_idle,
        }
    }

    #[inline]
    pub(super) fn is_busy(&self) -> bool {
        matches!(self.stage, SessionStage::Awaiting)
    }

    pub(super) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.conversation.messages().to_vec(),
            busy: self.is_busy(),
        }
    }

    pub(super) fn submit(
        &mut self,
        input: &str,
        handle: &Actor<Self>,
    ) -> Submission {
        let input = input.trim();
        if input.is_empty() {
            trace!("ignored blank input");
            return Submission::Rejected(RejectReason::Blank);
        }
        let client = match mem::replace(&mut self.stage, SessionStage::Awaiting)
        {
            SessionStage::Idle(client) => client,
            SessionStage::Awaiting => {
                debug!("ignored input while awaiting a reply");
                return Submission::Rejected(RejectReason::Busy);
            }
        };

        // The request carries the transcript as it was before this turn.
        let history = self.conversation.messages().to_vec();
        self.append(Message::user(input));
        self.notify_busy_changed();

        let text = input.to_owned();
        let session = handle.downgrade();
        let worker_client = client.clone();
        let worker = tokio::spawn(
            async move { worker_client.chat(&history, &text).await }
                .instrument(debug_span!("chat turn")),
        );
        // A panic in the worker still ends the turn.
        tokio::spawn(async move {
            let result = worker.await.unwrap_or_else(|err| {
                error!("chat turn aborted: {err}");
                Err(GenerationFailure::aborted(err.to_string()))
            });
            let finished = CompletionFinishedMessage { client, result };
            if session.send(finished).is_err() {
                debug!("session has been closed, discard the reply");
            }
        });
        Submission::Accepted
    }

    fn append(&mut self, message: Message) {
        if let Some(on_message) = &self.on_message {
            on_message(&message);
        }
        self.conversation.append(message);
    }

    fn notify_busy_changed(&self) {
        if let Some(on_busy_changed) = &self.on_busy_changed {
            on_busy_changed(self.is_busy());
        }
    }
}

struct CompletionFinishedMessage {
    client: CompletionClient,
    result: Result<String, GenerationFailure>,
}

impl Debug for CompletionFinishedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionFinishedMessage")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl ActorMessage<SessionState> for CompletionFinishedMessage {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        let reply = match self.result {
            Ok(reply) => reply,
            Err(err) => {
                // Every cause gets the same text.
                warn!("replying with the failure message: {err}");
                state.failure_message.clone()
            }
        };
        state.append(Message::assistant(reply));

        state.stage = SessionStage::Idle(self.client);
        state.notify_busy_changed();
        if let Some(on_idle) = &state.on_idle {
            on_idle();
        }
    }
}
