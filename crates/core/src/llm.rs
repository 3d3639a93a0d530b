use async_trait::async_trait;

use crate::{
    error::{Result, VidbriefError},
    provider::Provider,
    summarize::SummaryModel,
    types::{GenerationParams, SummaryCandidate},
};

/// Summarization through a provider's chat-completions endpoint.
pub struct ChatSummaryModel {
    provider: Provider,
    api_key: String,
    client: reqwest::Client,
}

impl ChatSummaryModel {
    pub fn load(provider: Provider) -> Result<Self> {
        let api_key = provider.api_key()?;
        Ok(Self {
            provider,
            api_key,
            client: reqwest::Client::new(),
        })
    }
}

fn system_prompt(params: &GenerationParams) -> String {
    format!(
        r#"You are a summarization model. Summarize the text the user sends.

Rules:
- Write between {min} and {max} tokens of plain prose
- Keep only what the text actually says, do not add context
- Output ONLY the summary, nothing else"#,
        min = params.min_length,
        max = params.max_length
    )
}

/// Pull every `choices[].message.content` string out of a chat-completions response
pub fn candidates_from_response(response: &serde_json::Value) -> Result<Vec<SummaryCandidate>> {
    let candidates: Vec<SummaryCandidate> = response["choices"]
        .as_array()
        .map(|choices| {
            choices
                .iter()
                .filter_map(|choice| choice["message"]["content"].as_str())
                .map(|text| SummaryCandidate {
                    summary_text: text.trim().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if candidates.is_empty() {
        return Err(VidbriefError::SummaryFailed {
            reason: format!("Invalid API response: {:?}", response),
        });
    }
    Ok(candidates)
}

#[async_trait]
impl SummaryModel for ChatSummaryModel {
    async fn summarize(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<Vec<SummaryCandidate>> {
        let endpoint = self.provider.endpoint();
        let temperature = if params.do_sample { 0.7 } else { 0.0 };

        let response = self
            .client
            .post(endpoint.url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": endpoint.summary_model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt(params),
                    },
                    {
                        "role": "user",
                        "content": text,
                    },
                ],
                "temperature": temperature,
                "max_tokens": params.max_length,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        candidates_from_response(&response)
    }
}
