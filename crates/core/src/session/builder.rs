use delta_assistant_model::ModelProvider;

use super::ChatSession;
use crate::completion::CompletionClient;
use crate::conversation::Message;
use crate::locale::Locale;

/// [`ChatSession`] builder.
pub struct SessionBuilder {
    pub(crate) client: CompletionClient,
    pub(crate) greeting: String,
    pub(crate) failure_message: String,
    pub(crate) on_message: Option<Box<dyn Fn(&Message) + Send + Sync>>,
    pub(crate) on_busy_changed: Option<Box<dyn Fn(bool) + Send + Sync>>,
    pub(crate) on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified completion client.
    ///
    /// Strings default to the [`Locale::default`] ones.
    pub fn with_completion_client(client: CompletionClient) -> Self {
        let strings = Locale::default().strings();
        Self {
            client,
            greeting: strings.greeting.to_owned(),
            failure_message: strings.failure.to_owned(),
            on_message: None,
            on_busy_changed: None,
            on_idle: None,
        }
    }

    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_completion_client(CompletionClient::new(provider))
    }

    /// Uses the greeting and failure message of `locale`.
    #[inline]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        let strings = locale.strings();
        self.greeting = strings.greeting.to_owned();
        self.failure_message = strings.failure.to_owned();
        self
    }

    /// Overrides the first assistant message.
    #[inline]
    pub fn with_greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Overrides the assistant message appended when a reply fails.
    #[inline]
    pub fn with_failure_message<S: Into<String>>(mut self, message: S) -> Self {
        self.failure_message = message.into();
        self
    }

    /// Attaches a callback to be invoked for every appended message. The
    /// greeting is not reported.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(on_message));
        self
    }

    /// Attaches a callback to be invoked when the busy flag flips.
    #[inline]
    pub fn on_busy_changed(
        mut self,
        on_busy_changed: impl Fn(bool) + Send + Sync + 'static,
    ) -> Self {
        self.on_busy_changed = Some(Box::new(on_busy_changed));
        self
    }

    /// Attaches a callback to be invoked when a reply has been appended
    /// and the session accepts input again.
    #[inline]
    pub fn on_idle(mut self, on_idle: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds the session.
    ///
    /// Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> ChatSession {
        ChatSession::spawn_from_builder(self)
    }
}
