mod builder;
mod state;

use delta_assistant_actor::Actor;
pub use delta_assistant_actor::ActorDeadError as SessionClosed;

use crate::conversation::Message;
pub use builder::SessionBuilder;
use state::SessionState;

/// The outcome of [`ChatSession::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Submission {
    /// The user turn was appended and a reply is on its way.
    Accepted,
    /// Nothing happened.
    Rejected(RejectReason),
}

/// Why a submission was ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The input was empty or whitespace only.
    Blank,
    /// A reply for the previous submission is still pending.
    Busy,
}

/// What a chat panel needs to render: the transcript and whether input
/// should be disabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// All messages, greeting first.
    pub messages: Vec<Message>,
    /// `true` while a reply is pending.
    pub busy: bool,
}

/// A chat session, like a panel that displays messages and has an input
/// box.
///
/// The session runs on its own task and owns the transcript. At most one
/// reply is pending at a time: submissions made meanwhile, and blank
/// ones, are ignored. Failed replies never surface as errors, instead the
/// transcript gains the localized failure message.
///
/// The session stops when the last handle is dropped. A reply that
/// arrives afterwards is discarded.
#[derive(Clone)]
pub struct ChatSession {
    handle: Actor<SessionState>,
}

impl ChatSession {
    /// Submits a user input.
    ///
    /// The input is trimmed before being appended. Returns once the input
    /// has been accepted or rejected, not when the reply arrives; use
    /// [`SessionBuilder::on_idle`] or poll [`is_busy`](Self::is_busy) to
    /// learn about that.
    pub async fn submit<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<Submission, SessionClosed> {
        let input = input.into();
        self.handle
            .ask(move |state, handle| state.submit(&input, handle))
            .await
    }

    /// Returns the transcript and the busy flag in one consistent read.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionClosed> {
        self.handle.ask(|state, _| state.snapshot()).await
    }

    /// Returns all messages, greeting first.
    pub async fn transcript(&self) -> Result<Vec<Message>, SessionClosed> {
        self.handle
            .ask(|state, _| state.conversation.messages().to_vec())
            .await
    }

    /// Returns `true` while a reply is pending.
    pub async fn is_busy(&self) -> Result<bool, SessionClosed> {
        self.handle.ask(|state, _| state.is_busy()).await
    }
}

impl ChatSession {
    fn spawn_from_builder(builder: SessionBuilder) -> Self {
        let handle = Actor::spawn(SessionState::new(builder), Some("session"));
        Self { handle }
    }
}
