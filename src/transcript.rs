//! Folding signaling-channel notifications into a transcript.
//!
//! [`Notification::parse`] turns one raw channel message into a role × finality
//! variant, [`fold`] applies it to a [`Transcript`], and [`Reducer`] owns the
//! running transcript and publishes every change on a watch channel.

mod stats;

pub use stats::Stats;

use tokio::sync::watch;

use crate::types::{OutputItem, ServerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One contiguous utterance by a single speaker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Turn {
    role: Role,
    text: String,
    complete: bool,
}

impl Turn {
    pub fn open(role: Role, text: &str) -> Self {
        Self {
            role,
            text: text.to_string(),
            complete: false,
        }
    }

    pub fn closed(role: Role, text: &str) -> Self {
        Self {
            role,
            text: text.to_string(),
            complete: true,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Ordered turns. Only the tail turn is ever amended.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// A classified signaling-channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `new_turn` forces a fresh turn even when the tail is open.
    Delta {
        role: Role,
        fragment: String,
        new_turn: bool,
    },
    Final { role: Role, text: String },
    /// Any event outside the role × finality taxonomy, by its `type`.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed notification: {0}")]
pub struct MalformedNotification(String);

impl Notification {
    /// Parses and classifies one raw channel message.
    pub fn parse(raw: &str) -> Result<Self, MalformedNotification> {
        let (event, kind) = parse_event(raw)?;
        Self::classify(&event, &kind)
    }

    /// Classifies an already decoded event. `kind` is the wire `type`, used
    /// only to name events this crate does not model.
    pub fn classify(event: &ServerEvent, kind: &str) -> Result<Self, MalformedNotification> {
        match event {
            ServerEvent::ResponseTextDelta(e) => Ok(Notification::Delta {
                role: Role::User,
                fragment: e.delta().to_string(),
                new_turn: e.response_completed(),
            }),
            ServerEvent::AssistantTextDelta(e) => Ok(Notification::Delta {
                role: Role::Assistant,
                fragment: e.delta().to_string(),
                new_turn: e.response_completed(),
            }),
            ServerEvent::ResponseTextDone(e) => {
                let text = match (e.text(), e.response()) {
                    (Some(text), _) => text,
                    (None, Some(response)) => response
                        .output()
                        .ok_or_else(|| {
                            MalformedNotification("response.text.done without response.output".to_string())
                        })?
                        .first()
                        .and_then(OutputItem::text)
                        .unwrap_or(""),
                    (None, None) => {
                        return Err(MalformedNotification(
                            "response.text.done carries neither text nor response".to_string(),
                        ))
                    }
                };
                Ok(Notification::Final {
                    role: Role::User,
                    text: text.to_string(),
                })
            }
            ServerEvent::ResponseDone(e) => {
                let output = e.response().output().ok_or_else(|| {
                    MalformedNotification("response.done without response.output".to_string())
                })?;
                Ok(Notification::Final {
                    role: Role::Assistant,
                    text: first_readable(output).unwrap_or("").to_string(),
                })
            }
            _ => Ok(Notification::Other(kind.to_string())),
        }
    }
}

/// The first content block, in output order, that carries readable text.
fn first_readable(output: &[OutputItem]) -> Option<&str> {
    output.iter().find_map(|item| {
        item.content()
            .iter()
            .find_map(|part| part.readable())
            .or_else(|| item.text())
    })
}

fn parse_event(raw: &str) -> Result<(ServerEvent, String), MalformedNotification> {
    let json = serde_json::from_str::<serde_json::Value>(raw)
        .map_err(|e| MalformedNotification(format!("not JSON: {e}")))?;

    let kind = json
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MalformedNotification("missing type".to_string()))?
        .to_string();
    let event_id = json.get("event_id").and_then(|v| v.as_str());
    tracing::debug!(
        "received message: {}, id={}",
        kind,
        event_id.unwrap_or("unknown")
    );

    let event = serde_json::from_value::<ServerEvent>(json)
        .map_err(|e| MalformedNotification(format!("{kind}: {e}")))?;
    Ok((event, kind))
}

/// Applies one notification. Pure: the result depends only on the inputs.
pub fn fold(mut transcript: Transcript, notification: &Notification) -> Transcript {
    match notification {
        Notification::Delta {
            role,
            fragment,
            new_turn,
        } => match transcript.turns.last_mut() {
            Some(tail) if tail.role == *role && !tail.complete && !new_turn => {
                tail.text.push_str(fragment)
            }
            _ => transcript.turns.push(Turn::open(*role, fragment)),
        },
        Notification::Final { role, text } => match transcript.turns.last_mut() {
            Some(tail) if tail.role == *role => {
                tail.text.clear();
                tail.text.push_str(text);
                tail.complete = true;
            }
            _ => transcript.turns.push(Turn::closed(*role, text)),
        },
        Notification::Other(_) => {}
    }
    transcript
}

/// Outcome of [`Reducer::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The message was a transcript notification and has been folded.
    Folded,
    /// Valid, but not part of the transcript.
    Ignored,
    /// Malformed; logged and discarded.
    Dropped,
}

/// Owns the running transcript for one session.
pub struct Reducer {
    transcript: Transcript,
    stats: Stats,
    tx: watch::Sender<Transcript>,
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Transcript::new());
        Self {
            transcript: Transcript::new(),
            stats: Stats::new(),
            tx,
        }
    }

    /// Parses, classifies and folds one raw channel message.
    pub fn apply(&mut self, raw: &str) -> Applied {
        let (event, kind) = match parse_event(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("dropping notification: {}", e);
                return Applied::Dropped;
            }
        };

        match &event {
            ServerEvent::Error(e) => {
                tracing::error!(
                    "provider error: type={}, code={:?}, message={}",
                    e.error().error_type(),
                    e.error().code(),
                    e.error().message()
                );
            }
            ServerEvent::ResponseDone(done) => {
                if let Some(usage) = done.response().usage() {
                    self.stats.record(usage);
                    tracing::debug!(
                        "total_tokens: {}, input_tokens: {}, output_tokens: {}",
                        usage.total_tokens(),
                        usage.input_tokens(),
                        usage.output_tokens()
                    );
                }
            }
            _ => {}
        }

        match Notification::classify(&event, &kind) {
            Ok(Notification::Other(_)) => Applied::Ignored,
            Ok(notification) => {
                self.apply_notification(&notification);
                Applied::Folded
            }
            Err(e) => {
                tracing::warn!("dropping notification: {}", e);
                Applied::Dropped
            }
        }
    }

    pub fn apply_notification(&mut self, notification: &Notification) {
        let transcript = std::mem::take(&mut self.transcript);
        self.transcript = fold(transcript, notification);
        self.tx.send_replace(self.transcript.clone());
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Receives a snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(role: Role, fragment: &str) -> Notification {
        Notification::Delta {
            role,
            fragment: fragment.to_string(),
            new_turn: false,
        }
    }

    fn finished(role: Role, text: &str) -> Notification {
        Notification::Final {
            role,
            text: text.to_string(),
        }
    }

    fn fold_all(notifications: &[Notification]) -> Transcript {
        notifications.iter().fold(Transcript::new(), fold)
    }

    #[test]
    fn deltas_concatenate_in_arrival_order() {
        let cases: &[&[&str]] = &[
            &["a"],
            &["Bon", "jour"],
            &["", "x", ""],
            &["Je ", "suis ", "là", "."],
            &["é", "t", "é"],
        ];
        for fragments in cases {
            for role in [Role::User, Role::Assistant] {
                let notifications: Vec<_> = fragments.iter().map(|f| delta(role, f)).collect();
                let transcript = fold_all(&notifications);
                assert_eq!(transcript.turns(), &[Turn::open(role, &fragments.concat())]);
            }
        }
    }

    #[test]
    fn final_is_idempotent() {
        let once = fold_all(&[delta(Role::User, "Bon"), finished(Role::User, "Bonjour")]);
        let twice = fold(once.clone(), &finished(Role::User, "Bonjour"));
        assert_eq!(once, twice);

        let once = fold_all(&[finished(Role::Assistant, "Salut")]);
        let twice = fold(once.clone(), &finished(Role::Assistant, "Salut"));
        assert_eq!(once, twice);
    }

    #[test]
    fn interleaved_roles_make_distinct_turns() {
        let transcript = fold_all(&[delta(Role::User, "Hi"), delta(Role::Assistant, "Hel")]);
        assert_eq!(
            transcript.turns(),
            &[Turn::open(Role::User, "Hi"), Turn::open(Role::Assistant, "Hel")]
        );
    }

    #[test]
    fn empty_final_closes_the_open_turn() {
        let transcript = fold_all(&[delta(Role::Assistant, "Hel"), finished(Role::Assistant, "")]);
        assert_eq!(transcript.turns(), &[Turn::closed(Role::Assistant, "")]);
    }

    #[test]
    fn delta_after_closed_turn_starts_a_new_turn() {
        let transcript = fold_all(&[finished(Role::User, "Hi"), delta(Role::User, "Again")]);
        assert_eq!(
            transcript.turns(),
            &[Turn::closed(Role::User, "Hi"), Turn::open(Role::User, "Again")]
        );
    }

    #[test]
    fn delta_of_completed_response_starts_a_new_turn() {
        let mut reducer = Reducer::new();
        reducer.apply(r#"{"type":"response.text.delta","delta":"Bon"}"#);
        reducer.apply(r#"{"type":"response.text.delta","delta":"Oui","response":{"completed":true}}"#);
        reducer.apply(r#"{"type":"response.text.delta","delta":" merci","response":{"completed":false}}"#);

        assert_eq!(
            reducer.transcript().turns(),
            &[Turn::open(Role::User, "Bon"), Turn::open(Role::User, "Oui merci")]
        );
    }

    #[test]
    fn user_scenario() {
        let transcript = fold_all(&[
            delta(Role::User, "Bon"),
            delta(Role::User, "jour"),
            finished(Role::User, "Bonjour"),
        ]);
        assert_eq!(transcript.turns(), &[Turn::closed(Role::User, "Bonjour")]);
    }

    #[test]
    fn user_then_assistant_scenario() {
        let transcript = fold_all(&[
            finished(Role::User, "Hi"),
            delta(Role::Assistant, "Hel"),
            delta(Role::Assistant, "lo"),
            finished(Role::Assistant, "Hello"),
        ]);
        assert_eq!(
            transcript.turns(),
            &[Turn::closed(Role::User, "Hi"), Turn::closed(Role::Assistant, "Hello")]
        );
    }

    #[test]
    fn classifies_wire_types() {
        assert_eq!(
            Notification::parse(r#"{"type":"response.text.delta","delta":"Bon"}"#).unwrap(),
            delta(Role::User, "Bon")
        );
        assert_eq!(
            Notification::parse(r#"{"type":"response.text.delta.assistant","delta":"Sa"}"#).unwrap(),
            delta(Role::Assistant, "Sa")
        );
        assert_eq!(
            Notification::parse(r#"{"type":"response.text.done","text":"Bonjour"}"#).unwrap(),
            finished(Role::User, "Bonjour")
        );
        assert_eq!(
            Notification::parse(
                r#"{"type":"response.text.done","response":{"output":[{"text":"Bonjour"}]}}"#
            )
            .unwrap(),
            finished(Role::User, "Bonjour")
        );
        assert_eq!(
            Notification::parse(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).unwrap(),
            Notification::Other("rate_limits.updated".to_string())
        );
    }

    #[test]
    fn response_done_uses_first_available_content_block() {
        let raw = r#"{"type":"response.done","response":{"output":[
            {"type":"function_call","content":[]},
            {"type":"message","content":[{"type":"audio"},{"type":"audio","transcript":"Salut"}]},
            {"type":"message","content":[{"type":"audio","transcript":"ignored"}]}
        ]}}"#;
        assert_eq!(
            Notification::parse(raw).unwrap(),
            finished(Role::Assistant, "Salut")
        );

        let empty = r#"{"type":"response.done","response":{"output":[]}}"#;
        assert_eq!(Notification::parse(empty).unwrap(), finished(Role::Assistant, ""));
    }

    #[test]
    fn missing_fields_are_malformed() {
        for raw in [
            "not json",
            r#"{"delta":"no type"}"#,
            r#"{"type":"response.text.delta"}"#,
            r#"{"type":"response.text.delta.assistant","delta":7}"#,
            r#"{"type":"response.text.done"}"#,
            r#"{"type":"response.text.done","response":{}}"#,
            r#"{"type":"response.done"}"#,
            r#"{"type":"response.done","response":{"status":"completed"}}"#,
        ] {
            assert!(Notification::parse(raw).is_err(), "{raw} should be malformed");
        }
    }

    #[test]
    fn reducer_drops_malformed_and_keeps_going() {
        let mut reducer = Reducer::new();
        assert_eq!(
            reducer.apply(r#"{"type":"response.text.delta","delta":"Bon"}"#),
            Applied::Folded
        );
        let before = reducer.transcript().clone();

        assert_eq!(reducer.apply(r#"{"type":"response.text.delta"}"#), Applied::Dropped);
        assert_eq!(reducer.apply("{{{"), Applied::Dropped);
        assert_eq!(reducer.transcript(), &before);

        assert_eq!(
            reducer.apply(r#"{"type":"response.text.delta","delta":"jour"}"#),
            Applied::Folded
        );
        assert_eq!(reducer.transcript().turns(), &[Turn::open(Role::User, "Bonjour")]);
    }

    #[test]
    fn reducer_ignores_other_events_and_counts_usage() {
        let mut reducer = Reducer::new();
        assert_eq!(
            reducer.apply(r#"{"type":"session.created","session":{"id":"sess_1"}}"#),
            Applied::Ignored
        );
        assert_eq!(
            reducer.apply(
                r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#
            ),
            Applied::Ignored
        );
        assert!(reducer.transcript().is_empty());

        let done = r#"{"type":"response.done","response":{
            "output":[{"content":[{"transcript":"Bonjour"}]}],
            "usage":{"total_tokens":12,"input_tokens":5,"output_tokens":7}}}"#;
        assert_eq!(reducer.apply(done), Applied::Folded);
        assert_eq!(reducer.stats().responses(), 1);
        assert_eq!(reducer.stats().total_tokens(), 12);
        assert_eq!(
            reducer.transcript().turns(),
            &[Turn::closed(Role::Assistant, "Bonjour")]
        );
    }

    #[test]
    fn usage_totals_saturate_instead_of_overflowing() {
        let mut reducer = Reducer::new();
        let done = format!(
            r#"{{"type":"response.done","response":{{"output":[],"usage":{{"total_tokens":{max},"input_tokens":{max},"output_tokens":{max}}}}}}}"#,
            max = u64::MAX
        );

        assert_eq!(reducer.apply(&done), Applied::Folded);
        assert_eq!(reducer.apply(&done), Applied::Folded);

        assert_eq!(reducer.stats().responses(), 2);
        assert_eq!(reducer.stats().total_tokens(), u64::MAX);
        assert_eq!(reducer.stats().input_tokens(), u64::MAX);
        assert_eq!(reducer.stats().output_tokens(), u64::MAX);
    }

    #[test]
    fn negative_usage_is_malformed() {
        let mut reducer = Reducer::new();
        let done = r#"{"type":"response.done","response":{"output":[],"usage":{"total_tokens":-5}}}"#;

        assert_eq!(reducer.apply(done), Applied::Dropped);
        assert_eq!(reducer.stats().responses(), 0);
        assert!(reducer.transcript().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_each_change() {
        let mut reducer = Reducer::new();
        let mut rx = reducer.subscribe();

        reducer.apply(r#"{"type":"response.text.delta.assistant","delta":"Sa"}"#);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().turns(), &[Turn::open(Role::Assistant, "Sa")]);

        reducer.apply(r#"{"type":"response.text.delta.assistant","delta":"lut"}"#);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().turns(), &[Turn::open(Role::Assistant, "Salut")]);
    }
}
