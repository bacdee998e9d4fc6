use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
    pub research: ResearchConfig,
    pub providers: ProvidersConfig,
    pub generation: GenerationConfig,
    pub protocol: ProtocolConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub enable_metrics: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Upper bound on the provider call before falling back to the heuristic.
    pub timeout_ms: u64,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResearchConfig {
    pub adapter_timeout_ms: u64,
    pub max_citations: usize,
    pub per_source_char_budget: usize,
    pub max_key_facts: usize,
    pub retry_failed_sources: bool,
    pub refine_queries: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub web: AdapterConfig,
    pub academic: AdapterConfig,
    pub news: AdapterConfig,
    pub synthesis: AdapterConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AdapterConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    /// Overrides `research.adapter_timeout_ms` for this adapter.
    pub timeout_ms: Option<u64>,
    /// Model name, for adapters backed by a chat-completion API.
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<Secret<String>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProtocolConfig {
    pub max_frame_bytes: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SERVER__PORT=3000 to server.port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            enable_cors: true,
            enable_metrics: true,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 800,
            model: "gpt-4o-mini".into(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_ms: 8000,
            max_citations: 8,
            per_source_char_budget: 4000,
            max_key_facts: 6,
            retry_failed_sources: false,
            refine_queries: false,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            web: AdapterConfig {
                enabled: true,
                base_url: "https://api.exa.ai".into(),
                ..Default::default()
            },
            academic: AdapterConfig {
                enabled: true,
                base_url: "https://api.semanticscholar.org".into(),
                ..Default::default()
            },
            news: AdapterConfig {
                enabled: false,
                base_url: "https://newsapi.org".into(),
                ..Default::default()
            },
            synthesis: AdapterConfig {
                enabled: true,
                base_url: "https://api.perplexity.ai".into(),
                model: Some("sonar".into()),
                ..Default::default()
            },
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 1024 * 1024, // 1MB
        }
    }
}
