/// The wire-contract families this service knows how to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hugging Face inference API: `{"inputs": ...}` against a model URL.
    HuggingFace,
    /// Gradio-style Space: `{"data": [...]}` against a handful of
    /// well-known predict paths.
    HfSpace,
    /// A self-hosted service with a flat `{"text": ...}` contract.
    Custom,
}

impl ProviderKind {
    /// Case-insensitive parse; anything unrecognized falls back to the
    /// default Hugging Face contract.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hf-space" => Self::HfSpace,
            "custom" => Self::Custom,
            _ => Self::HuggingFace,
        }
    }
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::HuggingFace
    }
}

/// Everything the orchestrator needs to know about the configured AI
/// backend. Built once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    /// Endpoint path override; `None` means each provider's default.
    pub path: Option<String>,
    /// Attached as `Authorization: Bearer <token>` when present.
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_with_default() {
        assert_eq!(ProviderKind::parse("HF-Space"), ProviderKind::HfSpace);
        assert_eq!(ProviderKind::parse(" custom "), ProviderKind::Custom);
        assert_eq!(ProviderKind::parse("huggingface"), ProviderKind::HuggingFace);
        assert_eq!(ProviderKind::parse("anything-else"), ProviderKind::HuggingFace);
        assert_eq!(ProviderKind::parse(""), ProviderKind::HuggingFace);
    }
}
