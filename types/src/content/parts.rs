/// One content block of an output item.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContentPart {
    /// "text", "audio", ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    /// Transcript of an audio block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transcript: Option<String>,
}

impl ContentPart {
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// The readable text of this block: the transcript for audio, the text otherwise.
    pub fn readable(&self) -> Option<&str> {
        self.transcript().or_else(|| self.text())
    }
}
