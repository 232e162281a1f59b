//! Lifecycle of one real-time voice session.
//!
//! [`Negotiator`] walks `Idle → AcquiringCredential → AcquiringMedia →
//! Negotiating → Connected` and ends in `Closed` or `Failed`. Peer callbacks
//! never touch the session directly: they are queued as [`PeerEvent`]s and
//! handled one at a time by [`Negotiator::handle_event`].

mod endpoint;
mod media;
mod peer;
mod playback;
mod rtc;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

pub use endpoint::{HttpNegotiationEndpoint, NegotiationEndpoint};
#[cfg(feature = "utils")]
pub use media::Microphone;
pub use media::{LocalAudio, LocalTrack, MediaSource};
pub use peer::{
    PeerConnection, PeerConnector, PeerEvent, PeerEventRx, PeerEventTx, PlaybackSink, RemoteTrack,
};
pub use playback::{PlaybackFrame, RtpPlayback};
pub use rtc::{RtcConnector, RtcPeer};

use crate::config::Config;
use crate::credential::{Credential, CredentialSource};
use crate::error::{NegotiationError, SessionError};
use crate::transcript::{Reducer, Stats, Transcript};
use crate::types::events::client::SessionUpdateEvent;
use crate::types::session::Session;
use crate::types::ClientEvent;

/// What ended a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Credential,
    MediaAccess,
    Negotiation,
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AcquiringCredential,
    AcquiringMedia,
    Negotiating,
    Connected,
    Closed,
    Failed(FailureKind),
}

impl SessionState {
    /// States in which the peer connection exists and may report events.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Negotiating | SessionState::Connected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed(_))
    }
}

/// The pieces a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialSource>,
    pub media: Arc<dyn MediaSource>,
    pub connector: Arc<dyn PeerConnector>,
    pub endpoint: Arc<dyn NegotiationEndpoint>,
    pub sink: Arc<dyn PlaybackSink>,
}

pub struct Negotiator {
    config: Config,
    collaborators: Collaborators,
    state: SessionState,
    reducer: Reducer,
    audio: Option<LocalAudio>,
    peer: Option<Box<dyn PeerConnection>>,
    pending_tracks: Vec<RemoteTrack>,
    configured: bool,
    events_tx: Option<PeerEventTx>,
    events_rx: PeerEventRx,
}

impl Negotiator {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.capacity());
        Self {
            config,
            collaborators,
            state: SessionState::Idle,
            reducer: Reducer::new(),
            audio: None,
            peer: None,
            pending_tracks: Vec::new(),
            configured: false,
            events_tx: Some(events_tx),
            events_rx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        self.reducer.transcript()
    }

    pub fn stats(&self) -> &Stats {
        self.reducer.stats()
    }

    /// Receives a transcript snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.reducer.subscribe()
    }

    /// Runs setup up to the applied answer. The session is `Negotiating` on
    /// success and becomes `Connected` once the signaling channel opens.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "start",
            });
        }

        self.transition(SessionState::AcquiringCredential);
        let credential = match self.collaborators.credentials.issue().await {
            Ok(credential) => credential,
            Err(e) => return Err(self.fail(FailureKind::Credential, e.into()).await),
        };

        self.transition(SessionState::AcquiringMedia);
        match self.collaborators.media.acquire().await {
            Ok(audio) => self.audio = Some(audio),
            Err(e) => return Err(self.fail(FailureKind::MediaAccess, e.into()).await),
        }

        self.transition(SessionState::Negotiating);
        let negotiated = match self.config.negotiation_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.negotiate(&credential))
                .await
                .unwrap_or(Err(NegotiationError::Timeout(limit))),
            None => self.negotiate(&credential).await,
        };
        if let Err(e) = negotiated {
            return Err(self.fail(FailureKind::Negotiation, e.into()).await);
        }
        Ok(())
    }

    async fn negotiate(&mut self, credential: &Credential) -> Result<(), NegotiationError> {
        let events = self
            .events_tx
            .take()
            .ok_or_else(|| NegotiationError::Peer("peer events already claimed".to_string()))?;
        let peer = self
            .peer
            .insert(self.collaborators.connector.connect(events).await?);

        if let Some(audio) = &self.audio {
            peer.add_local_audio(audio).await?;
        }
        peer.create_signaling_channel(self.config.channel_label()).await?;

        let offer = peer.create_offer().await?;
        let answer = self.collaborators.endpoint.exchange(credential, &offer).await?;
        peer.apply_answer(&answer).await?;

        tracing::info!("answer applied, waiting for the signaling channel");
        Ok(())
    }

    pub async fn handle_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::ChannelOpen => match self.state {
                SessionState::Negotiating => {
                    if let Err(e) = self.configure().await {
                        tracing::error!("failed to configure the session: {}", e);
                        self.teardown(SessionState::Failed(FailureKind::Negotiation))
                            .await;
                        return;
                    }
                    self.transition(SessionState::Connected);
                    for track in std::mem::take(&mut self.pending_tracks) {
                        self.collaborators.sink.attach(track);
                    }
                }
                SessionState::Connected => {
                    tracing::debug!("signaling channel open again, session already configured");
                }
                state => tracing::warn!("channel open rejected while {:?}", state),
            },
            PeerEvent::Message(raw) => {
                if self.state == SessionState::Connected {
                    self.reducer.apply(&raw);
                } else {
                    tracing::warn!("message rejected while {:?}", self.state);
                }
            }
            PeerEvent::RemoteTrack(track) => match self.state {
                SessionState::Connected => self.collaborators.sink.attach(track),
                SessionState::Negotiating => {
                    tracing::debug!("queueing remote track {} until connected", track.id());
                    self.pending_tracks.push(track);
                }
                state => tracing::warn!("remote track {} rejected while {:?}", track.id(), state),
            },
            PeerEvent::ChannelClosed => {
                if self.state.is_live() {
                    tracing::info!("signaling channel closed");
                    self.teardown(SessionState::Closed).await;
                }
            }
            PeerEvent::ConnectionLost(reason) => {
                if self.state.is_live() {
                    tracing::error!("connection lost: {}", reason);
                    self.teardown(SessionState::Failed(FailureKind::ConnectionLost))
                        .await;
                }
            }
        }
    }

    /// Waits for the next queued peer event.
    pub async fn next_event(&mut self) -> Option<PeerEvent> {
        self.events_rx.recv().await
    }

    /// Handles peer events until the session stops being live.
    pub async fn run(&mut self) {
        while self.state.is_live() {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event).await,
                None => {
                    tracing::warn!("peer event queue closed");
                    self.teardown(SessionState::Closed).await;
                }
            }
        }
    }

    /// Releases media and closes the connection. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.teardown(SessionState::Closed).await;
    }

    /// Pushes the session configuration once. Without it the session cannot
    /// be used, so a failure here ends the session.
    async fn configure(&mut self) -> Result<(), NegotiationError> {
        if self.configured {
            return Ok(());
        }
        let peer = self
            .peer
            .as_ref()
            .ok_or_else(|| NegotiationError::Peer("no peer connection".to_string()))?;

        let session = Session::new()
            .with_instructions(self.config.instructions())
            .build();
        let event = ClientEvent::SessionUpdate(SessionUpdateEvent::new(session));
        let text = serde_json::to_string(&event)
            .map_err(|e| NegotiationError::Peer(format!("session.update not serializable: {e}")))?;

        peer.send(&text).await?;
        self.configured = true;
        tracing::debug!("session.update sent");
        Ok(())
    }

    async fn fail(&mut self, kind: FailureKind, error: SessionError) -> SessionError {
        tracing::error!("session setup failed: {}", error);
        self.teardown(SessionState::Failed(kind)).await;
        error
    }

    async fn teardown(&mut self, next: SessionState) {
        if let Some(mut audio) = self.audio.take() {
            audio.stop();
        }
        if let Some(peer) = self.peer.take() {
            if let Err(e) = peer.close().await {
                tracing::warn!("failed to close peer connection: {}", e);
            }
        }
        self.pending_tracks.clear();
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::info!("session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
