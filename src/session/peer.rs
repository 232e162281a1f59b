use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use webrtc::track::track_remote::TrackRemote;

use crate::error::NegotiationError;
use crate::session::media::LocalAudio;

pub type PeerEventTx = mpsc::Sender<PeerEvent>;
pub type PeerEventRx = mpsc::Receiver<PeerEvent>;

/// Everything the peer connection reports back, in the order it happened.
#[derive(Debug)]
pub enum PeerEvent {
    /// The signaling channel opened.
    ChannelOpen,
    /// A text message arrived on the signaling channel.
    Message(String),
    /// The provider started sending a media track.
    RemoteTrack(RemoteTrack),
    /// The signaling channel closed.
    ChannelClosed,
    /// The peer connection failed or disconnected.
    ConnectionLost(String),
}

/// An inbound media track.
pub struct RemoteTrack {
    id: String,
    stream_id: String,
    rtc: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    /// A track that is described but not backed by a live RTP source.
    pub fn new(id: &str, stream_id: &str) -> Self {
        Self {
            id: id.to_string(),
            stream_id: stream_id.to_string(),
            rtc: None,
        }
    }

    pub(crate) fn from_rtc(track: Arc<TrackRemote>) -> Self {
        Self {
            id: track.id(),
            stream_id: track.stream_id(),
            rtc: Some(track),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub(crate) fn rtc(&self) -> Option<&Arc<TrackRemote>> {
        self.rtc.as_ref()
    }
}

impl std::fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("live", &self.rtc.is_some())
            .finish()
    }
}

/// Creates peer connections whose callbacks report into `events`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(&self, events: PeerEventTx) -> Result<Box<dyn PeerConnection>, NegotiationError>;
}

/// One live peer connection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_local_audio(&self, audio: &LocalAudio) -> Result<(), NegotiationError>;

    /// Creates the bidirectional event channel. Its open/message/close
    /// notifications arrive as [`PeerEvent`]s.
    async fn create_signaling_channel(&self, label: &str) -> Result<(), NegotiationError>;

    /// Creates the local offer, sets it as local description and returns its SDP.
    async fn create_offer(&self) -> Result<String, NegotiationError>;

    async fn apply_answer(&self, sdp: &str) -> Result<(), NegotiationError>;

    /// Sends one text message over the signaling channel.
    async fn send(&self, text: &str) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

/// Where remote media goes. Each track is attached on its own.
#[cfg_attr(test, automock)]
pub trait PlaybackSink: Send + Sync {
    fn attach(&self, track: RemoteTrack);
}
