//! One-shot extraction request: a fixed instruction plus the uploaded image,
//! shaped for either backend's chat API.

use crate::converters::ollama::{OllamaChatRequest, OllamaMessage};
use crate::converters::openai::{OpenAIContent, OpenAIContentItem, OpenAIMessage, OpenAIRequest};
use crate::upload::UploadedImage;

pub const HOSTED_INSTRUCTION: &str = "Extract all readable text from the image and format it as clear, structured Markdown. Use tables, lists, and headings where appropriate.";

pub const LOCAL_INSTRUCTION: &str = "Analyze the text in the provided image. Extract all readable content \
and present it in a structured Markdown format that is clear, concise, \
and well-organized. Ensure proper formatting (e.g., headings, lists, or \
code blocks) as necessary to represent the content effectively.";

#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub instruction: &'a str,
    pub image: &'a UploadedImage,
}

impl<'a> ModelRequest<'a> {
    pub fn new(instruction: &'a str, image: &'a UploadedImage) -> Self {
        Self { instruction, image }
    }

    /// Image travels as a data URL inside a multi-part user message.
    pub fn to_openai(&self, model: &str, max_tokens: u32) -> OpenAIRequest {
        OpenAIRequest {
            model: model.to_string(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: OpenAIContent::Array(vec![
                    OpenAIContentItem::text(self.instruction),
                    OpenAIContentItem::image_url(self.image.data_url()),
                ]),
            }],
            max_tokens: Some(max_tokens),
            temperature: None,
        }
    }

    pub fn to_ollama(&self, model: &str) -> OllamaChatRequest {
        OllamaChatRequest {
            model: model.to_string(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: self.instruction.to_string(),
                images: vec![self.image.base64()],
            }],
            stream: false,
        }
    }
}
