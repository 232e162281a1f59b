use crate::audio::{AudioFormat, Voice};

/// Session-level configuration pushed upstream in a `session.update` event.
///
/// Every field is optional; only the fields that were set are serialized, so a
/// session carrying just instructions goes out as `{"instructions": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    /// The set of modalities the model can respond with, e.g. `["text", "audio"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<Vec<String>>,

    /// The default system instructions prepended to model calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,

    /// The voice the model uses to respond. Cannot be changed once the model has responded with audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<Voice>,

    /// The format of output audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    output_audio_format: Option<AudioFormat>,

    /// Sampling temperature for the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl Session {
    pub fn new() -> SessionConfigurator {
        SessionConfigurator::new()
    }

    pub fn modalities(&self) -> Option<&[String]> {
        self.modalities.as_deref()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

pub struct SessionConfigurator {
    session: Session,
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfigurator {
    pub fn new() -> Self {
        Self {
            session: Session::default(),
        }
    }

    pub fn with_modalities(mut self, modalities: Vec<String>) -> Self {
        self.session.modalities = Some(modalities);
        self
    }

    pub fn with_modalities_enable_audio(mut self) -> Self {
        self.session.modalities = Some(vec!["text".to_string(), "audio".to_string()]);
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.session.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.session.voice = Some(voice);
        self
    }

    pub fn with_output_audio_format(mut self, format: AudioFormat) -> Self {
        self.session.output_audio_format = Some(format);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.session.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_only_session_serializes_single_field() {
        let session = Session::new().with_instructions("Réponds en français.").build();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json, serde_json::json!({"instructions": "Réponds en français."}));
    }

    #[test]
    fn configurator_sets_voice_and_modalities() {
        let session = Session::new()
            .with_modalities_enable_audio()
            .with_voice(Voice::Verse)
            .build();
        assert_eq!(session.voice(), Some(&Voice::Verse));
        assert_eq!(
            session.modalities(),
            Some(&["text".to_string(), "audio".to_string()][..])
        );
        assert_eq!(session.instructions(), None);
    }
}
