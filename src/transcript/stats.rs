use crate::types::Usage;

/// Token usage accumulated from `response.done` events.
///
/// Counts saturate at `u64::MAX`; the values come from the provider.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    responses: u64,
    total_tokens: u64,
    input_tokens: u64,
    output_tokens: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, usage: &Usage) {
        self.responses = self.responses.saturating_add(1);
        self.total_tokens = self.total_tokens.saturating_add(usage.total_tokens());
        self.input_tokens = self.input_tokens.saturating_add(usage.input_tokens());
        self.output_tokens = self.output_tokens.saturating_add(usage.output_tokens());
    }

    pub fn responses(&self) -> u64 {
        self.responses
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }
}
