use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use super::media::LocalAudio;
use super::peer::{PeerConnection, PeerConnector, PeerEvent, PeerEventTx, RemoteTrack};
use crate::error::NegotiationError;

const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Builds webrtc peer connections.
pub struct RtcConnector {
    ice_servers: Vec<String>,
}

impl Default for RtcConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcConnector {
    pub fn new() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<String>) -> Self {
        self.ice_servers = ice_servers;
        self
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn connect(&self, events: PeerEventTx) -> Result<Box<dyn PeerConnection>, NegotiationError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: self
                .ice_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(config).await?);

        let tx = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            tracing::debug!("peer connection state: {}", state);
            let tx = tx.clone();
            Box::pin(async move {
                if matches!(
                    state,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected
                ) {
                    let _ = tx.send(PeerEvent::ConnectionLost(state.to_string())).await;
                }
            })
        }));

        let tx = events.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = tx.clone();
            Box::pin(async move {
                tracing::debug!(
                    "remote track: id={}, codec={}",
                    track.id(),
                    track.codec().capability.mime_type
                );
                let _ = tx.send(PeerEvent::RemoteTrack(RemoteTrack::from_rtc(track))).await;
            })
        }));

        Ok(Box::new(RtcPeer {
            pc,
            events,
            channel: Mutex::new(None),
        }))
    }
}

/// A live webrtc peer connection and its signaling channel.
pub struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
    events: PeerEventTx,
    channel: Mutex<Option<Arc<RTCDataChannel>>>,
}

#[async_trait]
impl PeerConnection for RtcPeer {
    /// Announces one audio line per local track. The line is receive-only:
    /// captured audio is never encoded, so there is nothing to send.
    async fn add_local_audio(&self, audio: &LocalAudio) -> Result<(), NegotiationError> {
        for local in audio.tracks() {
            self.pc
                .add_transceiver_from_kind(
                    RTPCodecType::Audio,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await?;
            tracing::debug!("audio line added for local track {} (receive-only)", local.id());
        }
        Ok(())
    }

    async fn create_signaling_channel(&self, label: &str) -> Result<(), NegotiationError> {
        let dc = self.pc.create_data_channel(label, None).await?;

        let tx = self.events.clone();
        dc.on_open(Box::new(move || {
            Box::pin(async move {
                let _ = tx.send(PeerEvent::ChannelOpen).await;
            })
        }));

        let tx = self.events.clone();
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = tx.clone();
            Box::pin(async move {
                if !msg.is_string {
                    tracing::warn!("ignoring binary message ({} bytes)", msg.data.len());
                    return;
                }
                match String::from_utf8(msg.data.to_vec()) {
                    Ok(text) => {
                        let _ = tx.send(PeerEvent::Message(text)).await;
                    }
                    Err(e) => tracing::warn!("ignoring non-UTF-8 message: {}", e),
                }
            })
        }));

        let tx = self.events.clone();
        dc.on_close(Box::new(move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(PeerEvent::ChannelClosed).await;
            })
        }));

        *self.channel.lock().await = Some(dc);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String, NegotiationError> {
        let offer = self.pc.create_offer(None).await?;
        let mut gathered = self.pc.gathering_complete_promise().await;
        self.pc.set_local_description(offer).await?;
        let _ = gathered.recv().await;

        self.pc
            .local_description()
            .await
            .map(|desc| desc.sdp)
            .ok_or_else(|| NegotiationError::Peer("no local description".to_string()))
    }

    async fn apply_answer(&self, sdp: &str) -> Result<(), NegotiationError> {
        let answer = RTCSessionDescription::answer(sdp.to_string())?;
        self.pc.set_remote_description(answer).await?;
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), NegotiationError> {
        let channel = self.channel.lock().await;
        let dc = channel
            .as_ref()
            .ok_or_else(|| NegotiationError::Peer("signaling channel not created".to_string()))?;
        dc.send_text(text.to_string()).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        if let Some(dc) = self.channel.lock().await.take() {
            dc.close().await?;
        }
        self.pc.close().await?;
        Ok(())
    }
}
