use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::MediaAccessError;

/// Describes one captured track to be offered to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    id: String,
    stream_id: String,
}

impl LocalTrack {
    pub fn new(id: &str, stream_id: &str) -> Self {
        Self {
            id: id.to_string(),
            stream_id: stream_id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
}

/// Captured local audio. Holding it keeps the capture device open; it is
/// released by [`LocalAudio::stop`] or on drop.
pub struct LocalAudio {
    tracks: Vec<LocalTrack>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl LocalAudio {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self {
            tracks,
            release: None,
        }
    }

    /// Runs `release` exactly once, when the audio is stopped or dropped.
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    pub fn stop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for LocalAudio {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LocalAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAudio")
            .field("tracks", &self.tracks)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Grants access to the local microphone.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<LocalAudio, MediaAccessError>;
}

#[cfg(feature = "utils")]
pub use microphone::Microphone;

#[cfg(feature = "utils")]
mod microphone {
    use async_trait::async_trait;
    use realtime_voice_utils::capture::Capture;

    use super::{LocalAudio, LocalTrack, MediaSource};
    use crate::error::MediaAccessError;

    /// Claims a cpal input device for the session.
    ///
    /// The device is opened and held until the audio is released, which is
    /// how a missing or refused microphone fails the session. No samples are
    /// forwarded to the peer.
    pub struct Microphone {
        device_name: Option<String>,
    }

    impl Microphone {
        pub fn new(device_name: Option<String>) -> Self {
            Self { device_name }
        }
    }

    #[async_trait]
    impl MediaSource for Microphone {
        async fn acquire(&self) -> Result<LocalAudio, MediaAccessError> {
            let device_name = self.device_name.clone();
            let mut capture = tokio::task::spawn_blocking(move || Capture::start(device_name))
                .await
                .map_err(|e| MediaAccessError::Unsupported(e.to_string()))??;

            let info = capture.info().clone();
            tracing::info!(
                "microphone open: device={:?}, {}ch, {}hz",
                info.device_name,
                info.channels,
                info.sample_rate
            );

            Ok(LocalAudio::new(vec![LocalTrack::new("microphone", "local")]).with_release(
                move || {
                    capture.stop();
                    tracing::debug!("microphone released");
                },
            ))
        }
    }
}
