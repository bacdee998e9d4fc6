//! Rig completion client.
//!
//! Wraps Rig's agents behind our `LlmClient` trait. Used for the fast,
//! non-streaming calls: intent classification and search-phrase refinement.

use async_trait::async_trait;

use answer_engine_core::{
    config::ClassifierConfig,
    traits::{LlmClient, LlmResponse, LlmUsage},
    Error, Result,
};

use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAI,
    Anthropic,
}

impl RigProvider {
    /// Provider serving `model`, by model-name family.
    pub fn for_model(model: &str) -> Self {
        if model.to_lowercase().starts_with("claude") {
            RigProvider::Anthropic
        } else {
            RigProvider::OpenAI
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            RigProvider::OpenAI => "OPENAI_API_KEY",
            RigProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Configuration for Rig client.
#[derive(Debug, Clone)]
pub struct RigConfig {
    pub provider: RigProvider,
    pub model: String,
    pub temperature: f64,
}

impl RigConfig {
    /// Config for the classifier model.
    ///
    /// Temperature is zero; classification wants stable output.
    pub fn from_classifier(config: &ClassifierConfig) -> Self {
        Self {
            provider: RigProvider::for_model(&config.model),
            model: config.model.clone(),
            temperature: 0.0,
        }
    }
}

/// Rig-based completion client.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    fn ensure_key(&self) -> Result<()> {
        // Rig's from_env panics on a missing key.
        let var = self.config.provider.key_var();
        match std::env::var(var) {
            Ok(v) if !v.is_empty() => Ok(()),
            _ => Err(Error::model_provider(format!("{} not set", var))),
        }
    }

    async fn call_openai(&self, prompt: &str) -> Result<String> {
        use rig::providers::openai;

        let client = openai::Client::from_env();
        client
            .agent(&self.config.model)
            .temperature(self.config.temperature)
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("OpenAI error: {}", e)))
    }

    async fn call_anthropic(&self, prompt: &str) -> Result<String> {
        use rig::providers::anthropic;

        let client = anthropic::Client::from_env();
        client
            .agent(&self.config.model)
            .temperature(self.config.temperature)
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("Anthropic error: {}", e)))
    }
}

/// Rough token estimate; Rig's prompt API does not report usage.
fn estimate_usage(prompt: &str, response: &str) -> LlmUsage {
    let prompt_tokens = (prompt.len() / 4) as u64;
    let completion_tokens = (response.len() / 4) as u64;
    LlmUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.ensure_key()?;
        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Calling LLM"
        );

        let content = match self.config.provider {
            RigProvider::OpenAI => self.call_openai(prompt).await?,
            RigProvider::Anthropic => self.call_anthropic(prompt).await?,
        };

        Ok(LlmResponse {
            usage: estimate_usage(prompt, &content),
            content,
            finish_reason: "stop".to_string(),
        })
    }
}

/// A client for the classifier model, if its provider key is present.
pub fn create_fast_client(config: &ClassifierConfig) -> Option<RigLlmClient> {
    let client = RigLlmClient::new(RigConfig::from_classifier(config));
    match client.ensure_key() {
        Ok(()) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "Fast completion client disabled; heuristics only");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_for_model() {
        assert_eq!(RigProvider::for_model("claude-3-haiku-20240307"), RigProvider::Anthropic);
        assert_eq!(RigProvider::for_model("gpt-4o-mini"), RigProvider::OpenAI);

        let config = ClassifierConfig {
            model: "Claude-3-5-haiku".into(),
            ..Default::default()
        };
        let rig = RigConfig::from_classifier(&config);
        assert_eq!(rig.provider, RigProvider::Anthropic);
        assert_eq!(rig.model, "Claude-3-5-haiku");
        assert_eq!(rig.temperature, 0.0);
    }

    #[test]
    fn test_usage_estimate() {
        let usage = estimate_usage("12345678", "1234");
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.completion_tokens, 1);
        assert_eq!(usage.total_tokens, 3);
    }
}
