use std::time::Duration;

use crate::session::SessionState;

/// Failure to obtain a short-lived credential.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Non-success status or an unusable body from the credential issuer.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("credential request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure to open the local capture device.
#[derive(Debug, thiserror::Error)]
pub enum MediaAccessError {
    #[error("no capture device: {0}")]
    NoDevice(String),
    #[error("capture device access denied: {0}")]
    Denied(String),
    #[error("capture device unusable: {0}")]
    Unsupported(String),
}

/// Failure during the offer/answer exchange or while setting up the peer.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("negotiation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("negotiation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("peer connection error: {0}")]
    Peer(String),
    #[error("negotiation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<webrtc::Error> for NegotiationError {
    fn from(e: webrtc::Error) -> Self {
        NegotiationError::Peer(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },
}

#[cfg(feature = "utils")]
impl From<realtime_voice_utils::DeviceError> for MediaAccessError {
    fn from(e: realtime_voice_utils::DeviceError) -> Self {
        use realtime_voice_utils::DeviceError;
        match e {
            DeviceError::NoDevice(reason) => MediaAccessError::NoDevice(reason),
            DeviceError::Denied(reason) => MediaAccessError::Denied(reason),
            DeviceError::Unsupported(reason) => MediaAccessError::Unsupported(reason),
        }
    }
}
