//! Query orchestration: guard, retrieve, compose, generate.
//!
//! [`Assistant`] is constructed once at startup with its backends injected
//! and then shared by handle. Each [`Assistant::answer`] call is an
//! independent pipeline with no state carried between queries; the caller
//! owns the conversation history.
//!
//! Failure policy:
//! - no language model configured: fixed contact apology, no backend call
//! - retrieval failure of any kind: answer from the fallback selector
//! - credential failure during generation: fixed "trouble connecting" apology
//! - any other generation failure: returned to the caller

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::StructuredContent;
use crate::embedding::{create_provider, DisabledProvider, EmbeddingProvider};
use crate::error::{GenerationError, RetrievalError};
use crate::fallback::select_context;
use crate::index::create_index;
use crate::llm::{create_model, CompletionRequest, LanguageModel};
use crate::models::ConversationTurn;
use crate::prompt::{compose, DEFAULT_HISTORY_TURNS, SYSTEM_MESSAGE};
use crate::store::ContextStore;

/// Where a query's context came from. Exactly one source per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Vector,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub source: ContextSource,
    pub passages: Vec<String>,
}

pub struct Assistant {
    store: ContextStore,
    content: StructuredContent,
    model: Option<Arc<dyn LanguageModel>>,
    temperature: f32,
    max_tokens: usize,
    history_turns: usize,
}

impl Assistant {
    pub fn new(
        store: ContextStore,
        content: StructuredContent,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            store,
            content,
            model,
            temperature: 0.7,
            max_tokens: 500,
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }

    pub fn with_generation(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// Wire up every backend from configuration.
    ///
    /// Missing credentials never fail construction: without an index (or
    /// without a usable embedder) the assistant runs in fallback mode, and
    /// without a language-model key it answers with the contact apology.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let content = load_content(&config.content.path)?;

        let mut index = create_index(&config.index).await?;
        let embedder: Arc<dyn EmbeddingProvider> = if index.is_some() {
            match create_provider(&config.embedding) {
                Ok(provider) => Arc::from(provider),
                Err(e) => {
                    warn!("embedding provider unavailable, using fallback context only: {}", e);
                    index = None;
                    Arc::new(DisabledProvider)
                }
            }
        } else {
            Arc::new(DisabledProvider)
        };

        let store = ContextStore::new(embedder, index).with_top_k(config.index.top_k);
        let model = create_model(&config.llm)?;
        info!(
            vector_index = store.has_index(),
            embedder = store.embedder_name(),
            language_model = model.is_some(),
            "assistant ready"
        );

        Ok(Self::new(store, content, model)
            .with_generation(config.llm.temperature, config.llm.max_tokens)
            .with_history_turns(config.llm.history_turns))
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Vector passages when retrieval succeeds, fallback lines otherwise.
    pub async fn retrieve(&self, query: &str) -> RetrievedContext {
        match self.store.try_query(query, self.store.top_k()).await {
            Ok(passages) => RetrievedContext {
                source: ContextSource::Vector,
                passages,
            },
            Err(e) => {
                match &e {
                    RetrievalError::IndexUnavailable | RetrievalError::NoMatches => {
                        debug!("no vector context: {}", e);
                    }
                    RetrievalError::Embedding(_) | RetrievalError::Index(_) => {
                        warn!("vector retrieval failed, using fallback context: {}", e);
                    }
                }
                RetrievedContext {
                    source: ContextSource::Fallback,
                    passages: select_context(query, &self.content),
                }
            }
        }
    }

    /// Answer `query` given the caller's conversation so far.
    pub async fn answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<String, GenerationError> {
        let Some(model) = &self.model else {
            return Ok(self.unconfigured_apology());
        };

        let context = self.retrieve(query).await;
        debug!(
            source = ?context.source,
            passages = context.passages.len(),
            "context selected"
        );

        let request = CompletionRequest {
            system: SYSTEM_MESSAGE.to_string(),
            user: compose(query, &context.passages, history, self.history_turns),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match model.complete(&request).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_credential_failure() => {
                warn!("language model rejected credentials: {}", e);
                Ok(self.connection_apology())
            }
            Err(e) => Err(e),
        }
    }

    fn unconfigured_apology(&self) -> String {
        format!(
            "I'm sorry, the assistant isn't available right now. \
             Please reach out directly at {}.",
            self.content.contact.email
        )
    }

    fn connection_apology(&self) -> String {
        format!(
            "I'm having trouble connecting right now. \
             Please try again later or contact me directly at {}.",
            self.content.contact.email
        )
    }
}

fn load_content(path: &Path) -> Result<StructuredContent> {
    Ok(StructuredContent::load(path)?)
}
