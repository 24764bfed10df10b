use delta_assistant_model::{GenerationConfig, ModelMessage, ModelRequest};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types shared in both directions
// ------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Only text parts are produced or consumed. Other part kinds deserialize
/// with `text == None` and are skipped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    #[inline]
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            thought: None,
        }
    }
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub response_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

impl Candidate {
    /// Concatenated visible text of this candidate, `thought` parts
    /// excluded.
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let mut text = String::new();
        for part in &content.parts {
            if part.thought == Some(true) {
                continue;
            }
            if let Some(t) = &part.text {
                text.push_str(t);
            }
        }
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationParams>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: create_contents(&req.messages),
        system_instruction: req.system_instruction.as_ref().map(|text| {
            Content {
                role: None,
                parts: vec![Part::text(text.clone())],
            }
        }),
        generation_config: create_generation_params(req.generation),
    }
}

/// The API rejects conversations that open with a model turn, and expects
/// user and model turns to alternate. Leading assistant messages (such as
/// a canned greeting) are dropped and consecutive messages of the same
/// role are folded into one content with several parts.
fn create_contents(messages: &[ModelMessage]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::with_capacity(messages.len());
    for msg in messages {
        let (role, text) = match msg {
            ModelMessage::User(text) => (Role::User, text),
            ModelMessage::Assistant(text) => (Role::Model, text),
        };
        match contents.last_mut() {
            None if role == Role::Model => continue,
            Some(last) if last.role == Some(role) => {
                last.parts.push(Part::text(text.clone()));
            }
            _ => contents.push(Content {
                role: Some(role),
                parts: vec![Part::text(text.clone())],
            }),
        }
    }
    contents
}

#[inline]
fn create_generation_params(
    config: GenerationConfig,
) -> Option<GenerationParams> {
    if config.temperature.is_none() && config.max_output_tokens.is_none() {
        return None;
    }
    Some(GenerationParams {
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            system_instruction: Some("You are DeltaAI.".to_owned()),
            messages: vec![
                ModelMessage::Assistant("Hi! How can I help?".to_owned()),
                ModelMessage::User("Make a fly script".to_owned()),
                ModelMessage::Assistant("Sure.".to_owned()),
                ModelMessage::User("Now add".to_owned()),
                ModelMessage::User("noclip".to_owned()),
            ],
            generation: GenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: Some(500),
            },
        };
        let body = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Make a fly script" }] },
                    { "role": "model", "parts": [{ "text": "Sure." }] },
                    {
                        "role": "user",
                        "parts": [{ "text": "Now add" }, { "text": "noclip" }]
                    }
                ],
                "systemInstruction": { "parts": [{ "text": "You are DeltaAI." }] },
                "generationConfig": { "temperature": 0.5, "maxOutputTokens": 500 }
            })
        );
    }

    #[test]
    fn test_default_generation_is_omitted() {
        let request = ModelRequest::single_turn("hello");
        let body = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })
        );
    }

    #[test]
    fn test_candidate_text_skips_thoughts() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "print(" },
                        { "text": "'hi')" }
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(chunk.candidates[0].text().as_deref(), Some("print('hi')"));
    }
}
