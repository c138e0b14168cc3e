//! Language-model completion backends.
//!
//! [`LanguageModel`] is the single outbound generation capability:
//! a system message and a user message in, answer text out. Providers make
//! one HTTP call per completion and map credential rejections (401/403) to
//! [`GenerationError::Unauthorized`].

mod anthropic;
mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::{credential, LlmConfig, ANTHROPIC_API_KEY, OPENAI_API_KEY};
use crate::error::GenerationError;

pub use anthropic::AnthropicModel;
pub use openai::OpenAiModel;

/// Request envelope shared by the providers.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// Build the configured language model.
///
/// Returns `Ok(None)` when the provider's credential is not set; the
/// orchestrator treats that as the credential-guard state.
pub fn create_model(config: &LlmConfig) -> Result<Option<Arc<dyn LanguageModel>>> {
    let var = match config.provider.as_str() {
        "openai" => OPENAI_API_KEY,
        "anthropic" => ANTHROPIC_API_KEY,
        other => anyhow::bail!("Unknown llm provider: {}", other),
    };
    let Some(api_key) = credential(var) else {
        info!("{} not set; answers will be the contact apology", var);
        return Ok(None);
    };

    let name = config.model_name().to_string();
    let model: Arc<dyn LanguageModel> = match (config.provider.as_str(), &config.url) {
        ("anthropic", Some(url)) => {
            Arc::new(AnthropicModel::new(api_key, name, config.timeout_secs)?.with_base_url(url))
        }
        ("anthropic", None) => Arc::new(AnthropicModel::new(api_key, name, config.timeout_secs)?),
        (_, Some(url)) => {
            Arc::new(OpenAiModel::new(api_key, name, config.timeout_secs)?.with_base_url(url))
        }
        (_, None) => Arc::new(OpenAiModel::new(api_key, name, config.timeout_secs)?),
    };
    info!(provider = %config.provider, model = model.model_name(), "language model ready");
    Ok(Some(model))
}

/// Turn a non-success HTTP response into a [`GenerationError`].
async fn error_for_status(provider: &str, resp: reqwest::Response) -> GenerationError {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        GenerationError::Unauthorized(format!("{} returned {}: {}", provider, status, body))
    } else {
        GenerationError::Api {
            status: status.as_u16(),
            body,
        }
    }
}
