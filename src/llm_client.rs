use crate::config::{BackendConfig, Config, HostedParams, LocalParams};
use crate::converters::ollama::OllamaChatResponse;
use crate::converters::openai::OpenAIResponse;
use crate::error::OcrError;
use crate::prompt::{HOSTED_INSTRUCTION, LOCAL_INSTRUCTION, ModelRequest};
use crate::upload::UploadedImage;
use anyhow::anyhow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text returned by the backend for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResult {
    pub markdown: String,
    pub model: String,
}

#[derive(Debug)]
enum Backend {
    Hosted { params: HostedParams, api_key: String },
    Local(LocalParams),
}

/// Built once at start-up and shared by every request.
#[derive(Debug)]
pub struct LlmClient {
    http_client: Arc<reqwest::Client>,
    backend: Backend,
    instruction: String,
}

fn join_url(base: &str, path: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

impl LlmClient {
    pub fn new(http_client: Arc<reqwest::Client>, config: &Config) -> anyhow::Result<Self> {
        Self::with_secret_lookup(http_client, config, |name| std::env::var(name).ok())
    }

    pub fn with_secret_lookup<F>(http_client: Arc<reqwest::Client>, config: &Config, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (backend, default_instruction) = match &config.backend {
            BackendConfig::Hosted(params) => {
                let api_key = params.resolve_api_key(lookup).ok_or_else(|| {
                    anyhow!(
                        "no API key for the hosted backend: set `api_key` in the config or the {} environment variable",
                        params.api_key_env
                    )
                })?;
                (
                    Backend::Hosted {
                        params: params.clone(),
                        api_key,
                    },
                    HOSTED_INSTRUCTION,
                )
            }
            BackendConfig::Local(params) => (Backend::Local(params.clone()), LOCAL_INSTRUCTION),
        };
        let instruction = config
            .prompt
            .clone()
            .unwrap_or_else(|| default_instruction.to_string());

        Ok(Self {
            http_client,
            backend,
            instruction,
        })
    }

    pub fn backend_label(&self) -> &'static str {
        match self.backend {
            Backend::Hosted { .. } => "hosted",
            Backend::Local(_) => "local",
        }
    }

    pub fn model(&self) -> &str {
        match &self.backend {
            Backend::Hosted { params, .. } => &params.model,
            Backend::Local(params) => &params.model,
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    fn target_url(&self) -> String {
        match &self.backend {
            Backend::Hosted { params, .. } => join_url(&params.api_base, "chat/completions"),
            Backend::Local(params) => join_url(&params.host, "api/chat"),
        }
    }

    /// Send one extraction request and wait for the whole answer. No retries.
    pub async fn transcribe(&self, image: &UploadedImage) -> Result<ModelResult, OcrError> {
        let request = ModelRequest::new(&self.instruction, image);
        let target_url = self.target_url();

        let mut target_request = self
            .http_client
            .post(&target_url)
            .header("Content-Type", "application/json");

        target_request = match &self.backend {
            Backend::Hosted { params, api_key } => target_request
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&request.to_openai(&params.model, params.max_tokens)),
            Backend::Local(params) => target_request.json(&request.to_ollama(&params.model)),
        };

        info!(
            "Sending '{}' ({} bytes) to {} backend: {}",
            image.filename,
            image.bytes.len(),
            self.backend_label(),
            target_url
        );
        let response = target_request.send().await.map_err(|e| {
            warn!("Failed to send request to {}: {}", target_url, e);
            OcrError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Backend request failed with status {}: {}", status, body);
            return Err(OcrError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        debug!("response body: {}", body);

        let result = match &self.backend {
            Backend::Hosted { params, .. } => {
                let parsed: OpenAIResponse =
                    serde_json::from_str(&body).map_err(|e| OcrError::InvalidResponse(e.to_string()))?;
                let markdown = parsed
                    .first_text()
                    .ok_or_else(|| OcrError::InvalidResponse("response contained no choices".to_string()))?;
                ModelResult {
                    markdown,
                    model: if parsed.model.is_empty() { params.model.clone() } else { parsed.model },
                }
            }
            Backend::Local(params) => {
                let parsed: OllamaChatResponse =
                    serde_json::from_str(&body).map_err(|e| OcrError::InvalidResponse(e.to_string()))?;
                ModelResult {
                    markdown: parsed.message.content,
                    model: if parsed.model.is_empty() { params.model.clone() } else { parsed.model },
                }
            }
        };

        info!("Received {} characters of Markdown from {}", result.markdown.len(), result.model);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockito::Matcher;
    use serde_json::json;

    fn image() -> UploadedImage {
        UploadedImage::accept("invoice.png", Bytes::from_static(b"\x89PNG fake image")).unwrap()
    }

    fn hosted_config(api_base: String) -> Config {
        Config {
            backend: BackendConfig::Hosted(HostedParams {
                api_base,
                api_key: Some("sk-test".to_string()),
                ..HostedParams::default()
            }),
            ..Config::default()
        }
    }

    fn local_config(host: String) -> Config {
        Config {
            backend: BackendConfig::Local(LocalParams {
                host,
                ..LocalParams::default()
            }),
            ..Config::default()
        }
    }

    #[test]
    fn test_hosted_backend_requires_api_key() {
        let config = Config {
            backend: BackendConfig::Hosted(HostedParams::default()),
            ..Config::default()
        };
        let err = LlmClient::with_secret_lookup(Arc::new(reqwest::Client::new()), &config, |_| None).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let client =
            LlmClient::with_secret_lookup(Arc::new(reqwest::Client::new()), &config, |_| Some("sk-env".to_string()))
                .unwrap();
        assert_eq!(client.backend_label(), "hosted");
        assert_eq!(client.model(), "gpt-4-vision-preview");
        assert_eq!(client.instruction(), HOSTED_INSTRUCTION);
    }

    #[test]
    fn test_prompt_override_and_urls() {
        let mut config = local_config("http://localhost:11434/".to_string());
        config.prompt = Some("Only transcribe tables.".to_string());
        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &config).unwrap();
        assert_eq!(client.instruction(), "Only transcribe tables.");
        assert_eq!(client.target_url(), "http://localhost:11434/api/chat");

        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &hosted_config("https://api.openai.com/v1".to_string())).unwrap();
        assert_eq!(client.target_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_hosted_transcribe() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4-vision-preview",
                "max_tokens": 2000,
                "messages": [{ "role": "user" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1757841257,
                    "model": "gpt-4-vision-preview-2024",
                    "choices": [{ "index": 0, "message": { "role": "assistant", "content": "# Invoice #123" }, "finish_reason": "stop" }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &hosted_config(server.url())).unwrap();
        let result = client.transcribe(&image()).await.unwrap();

        assert_eq!(result.markdown, "# Invoice #123");
        assert_eq!(result.model, "gpt-4-vision-preview-2024");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_local_transcribe() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "gemma3:12b",
                "stream": false,
                "messages": [{ "role": "user", "content": LOCAL_INSTRUCTION }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "model": "gemma3:12b",
                    "message": { "role": "assistant", "content": "- line one\n- line two" },
                    "done": true
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &local_config(server.url())).unwrap();
        let result = client.transcribe(&image()).await.unwrap();

        assert_eq!(result.markdown, "- line one\n- line two");
        assert_eq!(result.model, "gemma3:12b");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("{\"error\":{\"message\":\"quota exceeded\"}}")
            .create_async()
            .await;

        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &hosted_config(server.url())).unwrap();
        let err = client.transcribe(&image()).await.unwrap_err();
        match err {
            OcrError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("quota exceeded"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_and_empty_responses() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("{\"object\":\"chat.completion\",\"choices\":[]}")
            .create_async()
            .await;
        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &hosted_config(server.url())).unwrap();
        assert!(matches!(client.transcribe(&image()).await, Err(OcrError::InvalidResponse(_))));

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;
        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &local_config(server.url())).unwrap();
        assert!(matches!(client.transcribe(&image()).await, Err(OcrError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let client = LlmClient::new(Arc::new(reqwest::Client::new()), &local_config("http://127.0.0.1:1".to_string())).unwrap();
        let err = client.transcribe(&image()).await.unwrap_err();
        assert!(matches!(err, OcrError::Transport(_)));
    }
}
