use crate::content::parts::ContentPart;

/// An item produced by a response (`response.output[]`).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    /// "message", "function_call", ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    /// Flat text some text-only events carry directly on the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default)]
    content: Vec<ContentPart>,
}

impl OutputItem {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn content(&self) -> &[ContentPart] {
        &self.content
    }
}
