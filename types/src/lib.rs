pub mod session;
pub mod audio;
pub mod credential;
pub mod events;
mod content;

pub use content::{ContentPart, OutputItem, ResponseResource, Usage};
pub use credential::{ClientSecret, SessionCreated};
pub use events::{ClientEvent, ServerEvent};
