//! Core logic of the DeltaAI assistant: the conversation store, the
//! completion client and the chat session controller.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod completion;
pub mod conversation;
pub mod locale;
mod session;

pub use completion::{CompletionClient, GenerationFailure};
pub use conversation::{Conversation, Message, Role};
pub use locale::{Locale, LocaleStrings, UnknownLocale};
pub use session::{
    ChatSession, RejectReason, SessionBuilder, SessionClosed, SessionSnapshot,
    Submission,
};
