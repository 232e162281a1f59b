pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a francophone AI assistant. Always respond in French.";
pub const DEFAULT_TOKEN_URL: &str = "http://127.0.0.1:3000/api/openai/token";

/// Label of the data channel the provider listens on for JSON events.
pub const EVENTS_CHANNEL_LABEL: &str = "oai-events";

pub const SDP_CONTENT_TYPE: &str = "application/sdp";
