/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// Fixed instructions describing the assistant's persona and scope.
    pub system_instruction: Option<String>,
    /// The input messages, oldest first. The last one is usually the
    /// user turn to be answered.
    pub messages: Vec<ModelMessage>,
    /// Sampling parameters.
    pub generation: GenerationConfig,
}

impl ModelRequest {
    /// Creates a single-turn request containing only the given user text.
    #[inline]
    pub fn single_turn<S: Into<String>>(text: S) -> Self {
        Self {
            messages: vec![ModelMessage::User(text.into())],
            ..Default::default()
        }
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text of this message.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            ModelMessage::User(text) | ModelMessage::Assistant(text) => text,
        }
    }
}

/// Sampling parameters. `None` leaves the provider's default in place.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Upper bound of generated tokens.
    pub max_output_tokens: Option<u32>,
}
