mod ollama_chat_request;
mod ollama_chat_response;
mod ollama_message;

pub use ollama_chat_request::OllamaChatRequest;
pub use ollama_chat_response::OllamaChatResponse;
pub use ollama_message::OllamaMessage;
