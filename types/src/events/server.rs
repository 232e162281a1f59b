mod error;

pub use error::ErrorDetails;

use crate::content::ResponseResource;

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// Details about the error
    error: ErrorDetails,
}

impl ErrorEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn error(&self) -> &ErrorDetails {
        &self.error
    }
}

/// `session.created` / `session.updated` event. The session body is kept as
/// raw JSON; it is only ever logged.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    session: serde_json::Value,
}

impl SessionEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn session(&self) -> &serde_json::Value {
        &self.session
    }
}

/// `response.text.delta` and `response.text.delta.assistant` events
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextDeltaEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    item_id: Option<String>,
    /// The delta in the text content
    delta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<DeltaResponse>,
}

/// The `response` object some deltas carry.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DeltaResponse {
    #[serde(default)]
    completed: bool,
}

impl DeltaResponse {
    pub fn completed(&self) -> bool {
        self.completed
    }
}

impl TextDeltaEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn delta(&self) -> &str {
        &self.delta
    }

    /// True when the delta belongs to a response already marked completed.
    pub fn response_completed(&self) -> bool {
        self.response.as_ref().is_some_and(DeltaResponse::completed)
    }
}

/// `response.text.done` event
///
/// The completed text arrives either flat in `text` or inside the embedded
/// response's first output item.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResponseTextDoneEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    response: Option<ResponseResource>,
}

impl ResponseTextDoneEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn response(&self) -> Option<&ResponseResource> {
        self.response.as_ref()
    }
}

/// `response.done` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResponseDoneEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// The response resource
    response: ResponseResource,
}

impl ResponseDoneEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn response(&self) -> &ResponseResource {
        &self.response
    }
}
