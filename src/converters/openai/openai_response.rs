use crate::converters::openai::{OpenAIChoice, OpenAIUsage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIResponse {
    #[serde(default)]
    pub id: String,
    pub object: Option<String>,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAIResponse {
    /// Text of the first choice. `None` only when there is no choice at all;
    /// a null message body is treated as empty text.
    pub fn first_text(&self) -> Option<String> {
        self.choices
            .first()
            .map(|choice| choice.message.content.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_vision_completion() {
        let json_response = json!({
            "id": "chatcmpl-9abc",
            "object": "chat.completion",
            "created": 1757841257,
            "model": "gpt-4-vision-preview",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "# Invoice #123\n\n| Item | Qty |\n|---|---|\n| Widget | 2 |"
                    },
                    "finish_reason": "stop"
                }
            ],
            "usage": {
                "prompt_tokens": 812,
                "completion_tokens": 31,
                "total_tokens": 843
            }
        });
        let response: OpenAIResponse = serde_json::from_value(json_response).expect("Failed to parse OpenAI response");

        assert_eq!(response.model, "gpt-4-vision-preview");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.as_ref().unwrap().total_tokens, 843);
        assert!(response.first_text().unwrap().starts_with("# Invoice #123"));
    }

    #[test]
    fn test_null_content_is_empty_text() {
        let json_response = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4o",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": null, "refusal": "I can't help with that." }, "finish_reason": "stop" }
            ]
        });
        let response: OpenAIResponse = serde_json::from_value(json_response).unwrap();
        assert_eq!(response.first_text().as_deref(), Some(""));
        assert_eq!(response.choices[0].message.refusal.as_deref(), Some("I can't help with that."));
    }

    #[test]
    fn test_no_choices_has_no_text() {
        let response: OpenAIResponse = serde_json::from_value(json!({ "object": "chat.completion", "choices": [] })).unwrap();
        assert!(response.first_text().is_none());
    }
}
