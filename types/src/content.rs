mod items;
mod parts;
mod response;

pub use items::OutputItem;
pub use parts::ContentPart;
pub use response::{ResponseResource, Usage};
