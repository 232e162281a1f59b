use std::time::Duration;

use secrecy::SecretString;

use crate::consts::{
    BASE_URL, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL, DEFAULT_TOKEN_URL, EVENTS_CHANNEL_LABEL,
    OPENAI_API_KEY,
};
use crate::types::audio::Voice;

pub struct Config {
    base_url: String,
    api_key: SecretString,
    model: String,
    voice: Voice,
    instructions: String,
    token_url: String,
    channel_label: String,
    capacity: usize,
    negotiation_timeout: Option<Duration>,
}

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.config.instructions = instructions.to_string();
        self
    }

    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.config.token_url = token_url.to_string();
        self
    }

    pub fn with_channel_label(mut self, label: &str) -> Self {
        self.config.channel_label = label.to_string();
        self
    }

    /// Capacity of the peer event queue.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity.max(1);
        self
    }

    /// Bounds the offer/answer exchange. Unset means wait indefinitely.
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.config.negotiation_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            // An empty key is fine for clients that fetch credentials from the token service.
            api_key: std::env::var(OPENAI_API_KEY)
                .unwrap_or_else(|_| "".to_string())
                .into(),
            model: DEFAULT_MODEL.to_string(),
            voice: Voice::Verse,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            channel_label: EVENTS_CHANNEL_LABEL.to_string(),
            capacity: 1024,
            negotiation_timeout: None,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn channel_label(&self) -> &str {
        &self.channel_label
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout
    }

    /// `{base_url}/realtime/sessions`
    pub fn sessions_url(&self) -> String {
        format!("{}/realtime/sessions", self.base_url)
    }

    /// `{base_url}/realtime?model={model}`
    pub fn negotiation_url(&self) -> String {
        format!("{}/realtime?model={}", self.base_url, self.model)
    }
}
