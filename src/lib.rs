pub mod config;
pub mod consts;
pub mod credential;
pub mod error;
pub mod session;
pub mod transcript;

pub use realtime_voice_types as types;

pub use config::{Config, ConfigBuilder};
pub use credential::{Credential, CredentialSource, TokenEndpointClient, UpstreamCredentialProvider};
pub use error::{CredentialError, MediaAccessError, NegotiationError, SessionError};
pub use session::{Collaborators, FailureKind, Negotiator, SessionState};
pub use transcript::{Notification, Reducer, Role, Transcript, Turn};

#[cfg(feature = "utils")]
pub use realtime_voice_utils as utils;
