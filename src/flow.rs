use crate::config::{AiConfig, ModelConfig};
use crate::types::{NotifierError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// What the two-stage flow produces for one article.
#[derive(Debug, Clone, Deserialize)]
pub struct Assessment {
    pub summary: String,
    /// 1 to 5 keywords, ordered as the model produced them.
    pub keywords: Vec<String>,
    pub is_high_quality: bool,
}

/// Summarize-then-judge pipeline. Failures here propagate as run-level
/// errors; this is the one collaborator the run does not isolate.
#[async_trait]
pub trait QualityFlow: Send + Sync {
    async fn assess(&self, text: &str) -> Result<Assessment>;
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary: String,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JudgeOutput {
    is_high_quality: bool,
}

/// OpenAI-backed flow: one structured chat completion to summarize and
/// extract keywords, a second to judge whether the summary is worth sending.
pub struct OpenAiFlow {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    config: AiConfig,
}

impl OpenAiFlow {
    pub fn new(config: AiConfig, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            config,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn structured(
        &self,
        model: &ModelConfig,
        schema_name: &str,
        schema: serde_json::Value,
        user_content: String,
    ) -> Result<String> {
        let request = json!({
            "model": model.model,
            "temperature": model.temperature,
            "messages": [
                { "role": "system", "content": model.system_prompt },
                { "role": "user", "content": user_content },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                    "strict": true,
                },
            },
        });

        debug!(model = %model.model, schema = schema_name, "chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Flow(format!(
                "OpenAI API error ({status}): {body}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| NotifierError::Flow("completion had no content".to_string()))
    }

    async fn summarize(&self, text: &str) -> Result<SummaryOutput> {
        let schema = json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": 5,
                },
            },
            "required": ["summary", "keywords"],
            "additionalProperties": false,
        });

        let content = self
            .structured(
                &self.config.summarize,
                "article_summary",
                schema,
                format!("記事の内容: {text}"),
            )
            .await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn judge(&self, summary: &str) -> Result<JudgeOutput> {
        let schema = json!({
            "type": "object",
            "properties": {
                "is_high_quality": { "type": "boolean" },
            },
            "required": ["is_high_quality"],
            "additionalProperties": false,
        });

        let content = self
            .structured(
                &self.config.judge,
                "summary_judgement",
                schema,
                format!("要約の内容: {summary}"),
            )
            .await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl QualityFlow for OpenAiFlow {
    async fn assess(&self, text: &str) -> Result<Assessment> {
        let summarized = self.summarize(text).await?;
        let verdict = self.judge(&summarized.summary).await?;
        Ok(Assessment {
            summary: summarized.summary,
            keywords: summarized.keywords,
            is_high_quality: verdict.is_high_quality,
        })
    }
}

/// Deterministic flow for development and tests: extractive summary, crude
/// keywords, and a verdict based on article length.
pub struct MockQualityFlow {
    min_text_chars: usize,
}

impl MockQualityFlow {
    pub fn new() -> Self {
        Self { min_text_chars: 0 }
    }

    /// Articles shorter than `min` characters are judged low quality.
    pub fn with_min_text_chars(mut self, min: usize) -> Self {
        self.min_text_chars = min;
        self
    }
}

impl Default for MockQualityFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QualityFlow for MockQualityFlow {
    async fn assess(&self, text: &str) -> Result<Assessment> {
        let summary: String = text.chars().take(120).collect();

        let mut keywords: Vec<String> = text
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .map(|word| word.to_lowercase())
            .collect();
        keywords.dedup();
        keywords.truncate(5);
        if keywords.is_empty() {
            keywords.push("news".to_string());
        }

        Ok(Assessment {
            summary,
            keywords,
            is_high_quality: text.chars().count() >= self.min_text_chars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_flow_limits_keywords_and_judges_by_length() {
        let flow = MockQualityFlow::new().with_min_text_chars(20);

        let long = flow
            .assess("artificial intelligence breakthrough reshapes robotics research worldwide")
            .await
            .unwrap();
        assert!(long.is_high_quality);
        assert!((1..=5).contains(&long.keywords.len()));

        let short = flow.assess("tiny note").await.unwrap();
        assert!(!short.is_high_quality);
        assert!(!short.keywords.is_empty());
    }
}
