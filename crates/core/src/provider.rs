use crate::error::{Result, VidbriefError};

/// Chat-completions backends that can produce summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

/// Where a provider's chat-completions API lives and which model summarizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub url: &'static str,
    pub summary_model: &'static str,
    pub key_var: &'static str,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Grok, Provider::Openai, Provider::Gemini];

    pub fn endpoint(self) -> Endpoint {
        match self {
            Provider::Grok => Endpoint {
                url: "https://api.x.ai/v1/chat/completions",
                summary_model: "grok-3-mini",
                key_var: "XAI_API_KEY",
            },
            Provider::Openai => Endpoint {
                url: "https://api.openai.com/v1/chat/completions",
                summary_model: "gpt-4o-mini",
                key_var: "OPENAI_API_KEY",
            },
            Provider::Gemini => Endpoint {
                url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                summary_model: "gemini-2.0-flash",
                key_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provider::Grok => "Grok",
            Provider::Openai => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }

    /// API key from the process environment
    pub fn api_key(self) -> Result<String> {
        self.api_key_from(|var| std::env::var(var).ok())
    }

    /// A blank value counts as missing.
    pub fn api_key_from(self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        let key_var = self.endpoint().key_var;
        lookup(key_var)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| VidbriefError::MissingApiKey {
                env_var: key_var.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_has_its_own_key() {
        let vars: Vec<_> = Provider::ALL.iter().map(|p| p.endpoint().key_var).collect();
        assert_eq!(vars, ["XAI_API_KEY", "OPENAI_API_KEY", "GEMINI_API_KEY"]);
        assert!(
            Provider::ALL
                .iter()
                .all(|p| p.endpoint().url.ends_with("/chat/completions"))
        );
    }

    #[test]
    fn key_is_read_and_trimmed() {
        let key = Provider::Openai
            .api_key_from(|var| (var == "OPENAI_API_KEY").then(|| " sk-test \n".to_string()))
            .unwrap();
        assert_eq!(key, "sk-test");
    }

    #[test]
    fn blank_or_absent_key_is_missing() {
        for value in [None, Some(String::new()), Some("   ".to_string())] {
            let err = Provider::Gemini
                .api_key_from(|_| value.clone())
                .unwrap_err();
            assert!(matches!(
                err,
                VidbriefError::MissingApiKey { ref env_var } if env_var == "GEMINI_API_KEY"
            ));
        }
    }
}
