use crate::audio::Voice;

/// Body of the upstream `POST /realtime/sessions` call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionRequest {
    model: String,
    voice: Voice,
}

impl SessionRequest {
    pub fn new(model: &str, voice: Voice) -> Self {
        Self {
            model: model.to_string(),
            voice,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }
}

/// The part of the session-creation response this crate relies on.
/// Any other field the provider returns is ignored here but relayed verbatim
/// by the token service.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionCreated {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    client_secret: ClientSecret,
}

impl SessionCreated {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }

    pub fn into_client_secret(self) -> ClientSecret {
        self.client_secret
    }
}

/// Ephemeral key minted for a single real-time session.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct ClientSecret {
    value: String,
    /// Unix timestamp (seconds) after which the key is rejected.
    #[serde(default)]
    expires_at: Option<i64>,
}

impl ClientSecret {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn into_parts(self) -> (String, Option<i64>) {
        (self.value, self.expires_at)
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
