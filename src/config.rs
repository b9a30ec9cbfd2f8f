use serde::{Deserialize, Serialize};

pub const DEFAULT_HOSTED_MODEL: &str = "gpt-4-vision-preview";
pub const DEFAULT_HOSTED_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_LOCAL_HOST: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "gemma3:12b";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Replaces the backend's built-in extraction instruction.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Hosted(HostedParams),
    Local(LocalParams),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local(LocalParams::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedParams {
    #[serde(default = "default_hosted_model")]
    pub model: String,
    #[serde(default = "default_hosted_api_base")]
    pub api_base: String,
    /// Inline key; when absent the key is read from `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for HostedParams {
    fn default() -> Self {
        Self {
            model: default_hosted_model(),
            api_base: default_hosted_api_base(),
            api_key: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl HostedParams {
    /// Resolve the API credential, preferring the inline key over the secret lookup.
    pub fn resolve_api_key<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .or_else(|| lookup(&self.api_key_env))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalParams {
    #[serde(default = "default_local_host")]
    pub host: String,
    #[serde(default = "default_local_model")]
    pub model: String,
}

impl Default for LocalParams {
    fn default() -> Self {
        Self {
            host: default_local_host(),
            model: default_local_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    Hosted,
    Local,
}

fn default_hosted_model() -> String {
    DEFAULT_HOSTED_MODEL.to_string()
}

fn default_hosted_api_base() -> String {
    DEFAULT_HOSTED_API_BASE.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_local_host() -> String {
    DEFAULT_LOCAL_HOST.to_string()
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Switch to the requested backend, keeping the file's settings when it already matches.
    pub fn with_backend(mut self, kind: BackendKind) -> Self {
        self.backend = match (kind, self.backend) {
            (BackendKind::Hosted, BackendConfig::Hosted(p)) => BackendConfig::Hosted(p),
            (BackendKind::Local, BackendConfig::Local(p)) => BackendConfig::Local(p),
            (BackendKind::Hosted, _) => BackendConfig::Hosted(HostedParams::default()),
            (BackendKind::Local, _) => BackendConfig::Local(LocalParams::default()),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_uses_local_backend() {
        let config = Config::default();
        assert_eq!(
            config.backend,
            BackendConfig::Local(LocalParams {
                host: "http://localhost:11434".to_string(),
                model: "gemma3:12b".to_string(),
            })
        );
        assert!(config.prompt.is_none());
        assert_eq!(config.session.idle_timeout_secs, 3600);
    }

    #[test]
    fn test_from_file_hosted_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend:\n  type: hosted\n  api_key_env: MY_SECRET\nprompt: Transcribe this").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        match config.backend {
            BackendConfig::Hosted(params) => {
                assert_eq!(params.model, "gpt-4-vision-preview");
                assert_eq!(params.api_base, "https://api.openai.com/v1");
                assert_eq!(params.api_key_env, "MY_SECRET");
                assert_eq!(params.max_tokens, 2000);
            }
            other => panic!("expected hosted backend, got {:?}", other),
        }
        assert_eq!(config.prompt.as_deref(), Some("Transcribe this"));
    }

    #[test]
    fn test_from_file_local_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend:\n  type: local\n  host: http://10.0.0.5:11434\n  model: llava:7b\nsession:\n  idle_timeout_secs: 60"
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Local(LocalParams {
                host: "http://10.0.0.5:11434".to_string(),
                model: "llava:7b".to_string(),
            })
        );
        assert_eq!(config.session.idle_timeout_secs, 60);
    }

    #[test]
    fn test_from_file_rejects_unknown_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend:\n  type: cloud").unwrap();
        assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_resolve_api_key_prefers_inline_key() {
        let params = HostedParams {
            api_key: Some("inline".to_string()),
            ..HostedParams::default()
        };
        assert_eq!(params.resolve_api_key(|_| Some("from-env".to_string())).as_deref(), Some("inline"));
    }

    #[test]
    fn test_resolve_api_key_falls_back_to_lookup() {
        let params = HostedParams::default();
        let key = params.resolve_api_key(|name| {
            assert_eq!(name, "OPENAI_API_KEY");
            Some(" sk-test \n".to_string())
        });
        assert_eq!(key.as_deref(), Some("sk-test"));
        assert!(params.resolve_api_key(|_| Some("   ".to_string())).is_none());
        assert!(params.resolve_api_key(|_| None).is_none());
    }

    #[test]
    fn test_with_backend_switches_or_keeps() {
        let mut file_config = Config::default();
        file_config.backend = BackendConfig::Local(LocalParams {
            host: "http://gpu-box:11434".to_string(),
            model: "gemma3:27b".to_string(),
        });

        let kept = file_config.clone().with_backend(BackendKind::Local);
        assert_eq!(kept.backend, file_config.backend);

        let switched = file_config.with_backend(BackendKind::Hosted);
        assert_eq!(switched.backend, BackendConfig::Hosted(HostedParams::default()));
    }
}
