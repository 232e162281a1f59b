pub mod client;
mod server;

pub use client::*;
pub use server::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate(SessionUpdateEvent),
}

/// Notifications received over the signaling channel.
///
/// Only the events the transcript depends on are modelled; every other `type`
/// lands in `Unknown`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "session.created")]
    SessionCreated(SessionEvent),
    #[serde(rename = "session.updated")]
    SessionUpdated(SessionEvent),
    /// Partial text of the user's side of the conversation.
    #[serde(rename = "response.text.delta")]
    ResponseTextDelta(TextDeltaEvent),
    /// Final text of the user's side of the conversation.
    #[serde(rename = "response.text.done")]
    ResponseTextDone(ResponseTextDoneEvent),
    /// Partial text of the assistant's reply.
    #[serde(rename = "response.text.delta.assistant")]
    AssistantTextDelta(TextDeltaEvent),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseDoneEvent),
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Error(_) => "error",
            ServerEvent::SessionCreated(_) => "session.created",
            ServerEvent::SessionUpdated(_) => "session.updated",
            ServerEvent::ResponseTextDelta(_) => "response.text.delta",
            ServerEvent::ResponseTextDone(_) => "response.text.done",
            ServerEvent::AssistantTextDelta(_) => "response.text.delta.assistant",
            ServerEvent::ResponseDone(_) => "response.done",
            ServerEvent::Unknown => "unknown",
        }
    }
}
