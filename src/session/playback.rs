use bytes::Bytes;
use tokio::sync::mpsc;

use super::peer::{PlaybackSink, RemoteTrack};

/// One RTP payload received on a remote track.
#[derive(Debug, Clone)]
pub struct PlaybackFrame {
    pub track_id: String,
    pub payload: Bytes,
}

/// Drains each attached remote track on its own task and forwards the raw
/// RTP payloads. Decoding is left to whoever holds the receiver.
pub struct RtpPlayback {
    tx: mpsc::Sender<PlaybackFrame>,
}

impl RtpPlayback {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PlaybackFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl PlaybackSink for RtpPlayback {
    fn attach(&self, track: RemoteTrack) {
        let Some(rtc) = track.rtc().cloned() else {
            tracing::debug!("track {} has no RTP source, nothing to play", track.id());
            return;
        };
        let tx = self.tx.clone();
        let track_id = track.id().to_string();
        tokio::spawn(async move {
            tracing::info!("playing remote track {}", track_id);
            let mut packets: u64 = 0;
            loop {
                match rtc.read_rtp().await {
                    Ok((packet, _)) => {
                        if packet.payload.is_empty() {
                            continue;
                        }
                        packets += 1;
                        let frame = PlaybackFrame {
                            track_id: track_id.clone(),
                            payload: packet.payload,
                        };
                        // A lagging consumer loses frames rather than stalling the track.
                        if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(frame) {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("track {} ended: {}", track_id, e);
                        break;
                    }
                }
            }
            tracing::info!("remote track {} stopped after {} packets", track_id, packets);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn descriptive_track_is_ignored() {
        let (playback, mut rx) = RtpPlayback::new(4);
        playback.attach(RemoteTrack::new("audio", "remote"));
        drop(playback);
        assert!(rx.recv().await.is_none());
    }
}
