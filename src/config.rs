use clap::Parser;
use clap::error::ErrorKind;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default proxy endpoint of the barista persona.
pub const DEFAULT_ENDPOINT: &str = "https://alcuino-chatbot.azurewebsites.net/api/OpenAIProxy";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default persona instruction.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly coffee shop barista expert who specializes in creating recipes for coffee shop drinks like milkshakes, frappes, lattes, smoothies, and other beverages. Provide detailed recipes with ingredients and step-by-step instructions. Be enthusiastic and helpful. Always format your responses in clean HTML with proper tags like <strong>, <ul>, <li>, <br>, etc. No markdown format. Answer directly without extra formatting.";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Proxy endpoint URL
    #[arg(long, env = "PROXY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model identifier sent to the proxy
    #[arg(long, env = "PROXY_MODEL")]
    pub model: Option<String>,

    /// Bearer token sent to the proxy
    #[arg(long, env = "OPENAI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// What to do with a send while a reply is outstanding (serialize | concurrent)
    #[arg(long, env = "OVERLAP_POLICY")]
    pub overlap_policy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub proxy: ProxyConfig,
    pub widget: WidgetConfig,
    pub persona: PersonaConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub static_dir: String,
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ProxyConfig {
    pub endpoint: String,
    pub model: String,
    pub instructions: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            static_dir: "static".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

impl ProxyConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Behaviour when a message is sent while a reply is still outstanding.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Reject the send; at most one request in flight.
    #[default]
    Serialize,
    /// Let turns overlap; each settles its own placeholder.
    Concurrent,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WidgetConfig {
    pub overlap_policy: OverlapPolicy,
    /// Forget the continuation id when the chat is cleared.
    pub reset_continuation_on_clear: bool,
    pub preferences_path: String,
    pub session_timeout_secs: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            overlap_policy: OverlapPolicy::Serialize,
            reset_continuation_on_clear: false,
            preferences_path: "data/preferences.json".to_string(),
            session_timeout_secs: 30 * 60,
        }
    }
}

impl WidgetConfig {
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

/// Fixed copy shown by the widget.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PersonaConfig {
    /// Glyph prepended to every assistant turn.
    pub bot_prefix: String,
    pub greeting: String,
    pub cleared_greeting: String,
    pub loading_text: String,
    pub fallback_text: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            bot_prefix: "👽 ".to_string(),
            greeting: "Hello! I'm your coffee shop recipe expert! Ask me about any drink recipe — milkshakes, frappes, lattes, smoothies, and more!".to_string(),
            cleared_greeting: "Chat cleared! Let's start fresh ☕".to_string(),
            loading_text: "Preparing your recipe...".to_string(),
            fallback_text: "Sorry, I encountered an error. Please try again! ☕".to_string(),
        }
    }
}

impl PersonaConfig {
    /// `text` with the bot prefix in front.
    #[must_use]
    pub fn prefixed(&self, text: &str) -> String {
        format!("{}{text}", self.bot_prefix)
    }

    /// Content of the assistant turn rendered when a request fails.
    #[must_use]
    pub fn fallback_turn(&self) -> String {
        self.prefixed(&self.fallback_text)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            // --help and --version print to stdout and exit 0.
            Err(e) if exits_cleanly(&e) => e.exit(),
            Err(e) => return Err(config::ConfigError::Message(e.to_string())),
        };

        // 1. Defaults
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        // 2. Config file: explicit path, else ./config.{yaml,toml,json} if present
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment (BARISTA_PROXY__MODEL=...)
        builder = builder.add_source(
            Environment::with_prefix("BARISTA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their env fallbacks) win
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(endpoint) = cli.endpoint {
            builder = builder.set_override("proxy.endpoint", endpoint)?;
        }
        if let Some(model) = cli.model {
            builder = builder.set_override("proxy.model", model)?;
        }
        if let Some(key) = cli.api_key {
            builder = builder.set_override("proxy.api_key", key)?;
        }
        if let Some(policy) = cli.overlap_policy {
            builder = builder.set_override("widget.overlap_policy", policy.to_lowercase())?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let endpoint = url::Url::parse(&self.proxy.endpoint).map_err(|e| {
            config::ConfigError::Message(format!(
                "proxy.endpoint `{}` is not a valid URL: {e}",
                self.proxy.endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(config::ConfigError::Message(format!(
                "proxy.endpoint must be http or https, got `{}`",
                endpoint.scheme()
            )));
        }
        if self.proxy.model.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "proxy.model cannot be empty".to_string(),
            ));
        }
        // The proxy call runs inside the request that started it.
        if self.proxy.timeout_secs >= self.server.request_timeout_secs {
            return Err(config::ConfigError::Message(format!(
                "proxy.timeout_secs ({}) must be below server.request_timeout_secs ({})",
                self.proxy.timeout_secs, self.server.request_timeout_secs
            )));
        }
        Ok(())
    }
}

/// Whether a parse "error" is really a help or version request.
fn exits_cleanly(e: &clap::Error) -> bool {
    matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}
