//! Text generation collaborators.
//!
//! The editor only sees [`ContentGenerator`]: a prompt and the current slide's
//! text go in, plain text comes out. Providers are either local CLIs
//! (`claude`, `codex`, `ollama`) or the OpenAI chat completions endpoint.

use std::process::Stdio;

use futures::future::BoxFuture;

use crate::config::{AiConfig, AiProvider};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

const INSTRUCTIONS: &str = "You write content for a single presentation slide. \
Reply with plain text only: a short heading on the first line, then a few \
concise lines of body text. No markdown, no bullet symbols, no commentary.";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("the provider returned no text")]
    Empty,

    #[error("{provider} is not available: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("no API key configured (set ai.api_key or {0})")]
    MissingApiKey(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Produces slide text from a prompt and the active slide's content.
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        context: &'a str,
    ) -> BoxFuture<'a, Result<String, GenerationError>>;
}

/// The full request text handed to a provider.
pub fn build_prompt(prompt: &str, context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        format!("{INSTRUCTIONS}\n\nRequest: {}", prompt.trim())
    } else {
        format!(
            "{INSTRUCTIONS}\n\nThe slide currently contains:\n{context}\n\nRequest: {}",
            prompt.trim()
        )
    }
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Runs a provider's command-line tool and reads its stdout.
pub struct CliGenerator {
    provider: AiProvider,
    binary: &'static str,
    model: Option<String>,
}

impl CliGenerator {
    pub fn new(provider: AiProvider, model: Option<String>) -> Result<Self, GenerationError> {
        let binary = provider
            .binary_name()
            .ok_or_else(|| GenerationError::Unavailable {
                provider: provider.display_name().to_string(),
                reason: "not a command-line provider".to_string(),
            })?;
        Ok(Self {
            provider,
            binary,
            model,
        })
    }

    fn args(&self, full_prompt: String) -> Vec<String> {
        let model = self
            .model
            .clone()
            .or_else(|| self.provider.default_model().map(str::to_string));
        let mut args = Vec::new();
        match self.provider {
            AiProvider::Claude => {
                args.push("-p".to_string());
                if let Some(model) = model {
                    args.extend(["--model".to_string(), model]);
                }
            }
            AiProvider::Codex => {
                args.push("exec".to_string());
                if let Some(model) = model {
                    args.extend(["--model".to_string(), model]);
                }
            }
            AiProvider::Ollama | AiProvider::OpenAi => {
                args.push("run".to_string());
                args.push(model.unwrap_or_else(|| OLLAMA_DEFAULT_MODEL.to_string()));
            }
        }
        args.push(full_prompt);
        args
    }
}

impl ContentGenerator for CliGenerator {
    fn name(&self) -> &str {
        self.provider.display_name()
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        context: &'a str,
    ) -> BoxFuture<'a, Result<String, GenerationError>> {
        Box::pin(async move {
            let binary = self.binary;
            log::debug!("Running {binary} for content generation");
            let output = tokio::process::Command::new(binary)
                .args(self.args(build_prompt(prompt, context)))
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| GenerationError::Unavailable {
                    provider: binary.to_string(),
                    reason: e.to_string(),
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(GenerationError::Failed(format!(
                    "{binary} exited with {}: {}",
                    output.status,
                    stderr.trim()
                )));
            }
            non_empty(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}

/// OpenAI chat completions over HTTPS.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
        }
    }

    fn request(api_key: &str, body: &serde_json::Value) -> Result<String, GenerationError> {
        let response: serde_json::Value = ureq::post(OPENAI_CHAT_URL)
            .header("Authorization", &format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .send_json(body)
            .map_err(|e| GenerationError::Failed(format!("OpenAI request failed: {e}")))?
            .body_mut()
            .read_json()
            .map_err(|e| GenerationError::Failed(format!("Invalid OpenAI response: {e}")))?;

        let text = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(GenerationError::Empty)?;
        non_empty(text.to_string())
    }
}

impl ContentGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        context: &'a str,
    ) -> BoxFuture<'a, Result<String, GenerationError>> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": INSTRUCTIONS },
                { "role": "user", "content": build_prompt(prompt, context) },
            ],
        });
        let api_key = self.api_key.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || Self::request(&api_key, &body))
                .await
                .map_err(|e| GenerationError::Failed(e.to_string()))?
        })
    }
}

/// Build the configured provider. Falls back to the `claude` CLI when no
/// `ai` section exists.
pub fn from_config(config: Option<&AiConfig>) -> Result<Box<dyn ContentGenerator>, GenerationError> {
    let Some(ai) = config else {
        return Ok(Box::new(CliGenerator::new(AiProvider::Claude, None)?));
    };
    match ai.provider {
        AiProvider::OpenAi => {
            let key = ai
                .resolve_api_key()
                .ok_or(GenerationError::MissingApiKey(AiProvider::OPENAI_KEY_VAR))?;
            Ok(Box::new(OpenAiGenerator::new(key, ai.model.clone())))
        }
        ref cli => Ok(Box::new(CliGenerator::new(cli.clone(), ai.model.clone())?)),
    }
}
