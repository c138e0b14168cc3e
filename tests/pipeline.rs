//! End-to-end query behavior with stub backends.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use portfolio_rag::content::{
    Contact, Education, Experience, Profile, Project, SkillCategory, StructuredContent,
};
use portfolio_rag::embedding::EmbeddingProvider;
use portfolio_rag::error::{EmbeddingError, GenerationError, IndexError};
use portfolio_rag::index::{InMemoryIndex, VectorIndex};
use portfolio_rag::llm::{CompletionRequest, LanguageModel};
use portfolio_rag::models::{
    Chunk, ConversationTurn, DocumentKind, EmbeddingRecord, IndexMatch,
};
use portfolio_rag::orchestrator::{Assistant, ContextSource};
use portfolio_rag::store::ContextStore;

// ============ Stubs ============

/// Constant-direction embedder that counts calls.
#[derive(Default)]
struct StubEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_name(&self) -> &str {
        "stub"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.5, 0.25]).collect())
    }
}

/// Index that counts queries and always fails.
#[derive(Default)]
struct BrokenIndex {
    queries: AtomicUsize,
}

#[async_trait]
impl VectorIndex for BrokenIndex {
    fn name(&self) -> &str {
        "broken"
    }
    async fn upsert(&self, _records: &[EmbeddingRecord]) -> Result<(), IndexError> {
        Err(IndexError::NotFound("portfolio".into()))
    }
    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Err(IndexError::NotFound("portfolio".into()))
    }
}

enum Behavior {
    Echo,
    Fail(fn() -> GenerationError),
}

/// Language model that echoes the composed prompt or fails on demand.
struct StubModel {
    behavior: Behavior,
    calls: AtomicUsize,
    last: Mutex<Option<CompletionRequest>>,
}

impl StubModel {
    fn echo() -> Arc<Self> {
        Self::with(Behavior::Echo)
    }

    fn failing(err: fn() -> GenerationError) -> Arc<Self> {
        Self::with(Behavior::Fail(err))
    }

    fn with(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    fn last_request(&self) -> CompletionRequest {
        self.last.lock().unwrap().clone().expect("model was not called")
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.behavior {
            Behavior::Echo => Ok(request.user.clone()),
            Behavior::Fail(err) => Err(err()),
        }
    }
}

// ============ Fixtures ============

fn portfolio() -> StructuredContent {
    StructuredContent {
        profile: Profile {
            name: "Sam Rivera".into(),
            title: "Backend Engineer".into(),
            bio: "Builds reliable distributed systems.".into(),
            location: Some("Lisbon".into()),
        },
        skills: vec![SkillCategory {
            category: "Languages".into(),
            skills: vec!["Rust".into(), "Go".into(), "SQL".into()],
        }],
        contact: Contact {
            email: "sam@example.com".into(),
            github: Some("github.com/samr".into()),
            ..Default::default()
        },
        projects: vec![Project {
            title: "Ledger".into(),
            description: "Double-entry accounting service".into(),
            tech: vec!["Rust".into(), "Postgres".into()],
            link: None,
        }],
        experience: vec![
            Experience {
                role: "Senior Engineer".into(),
                company: "Acme Corp".into(),
                period: "2021 - present".into(),
                responsibilities: vec!["Owns the payments platform".into()],
                stack: vec!["Rust".into(), "Kafka".into()],
                impact: BTreeMap::from([("uptime".into(), "99.99%".into())]),
                ..Default::default()
            },
            Experience {
                role: "Engineer".into(),
                company: "Initech".into(),
                period: "2017 - 2021".into(),
                ..Default::default()
            },
        ],
        education: vec![Education {
            degree: "MSc Software Engineering".into(),
            institution: "University of Porto".into(),
            period: "2015 - 2017".into(),
            details: None,
        }],
    }
}

fn fallback_only(model: Option<Arc<StubModel>>) -> (Assistant, Arc<StubEmbedder>) {
    let embedder = Arc::new(StubEmbedder::default());
    let store = ContextStore::new(embedder.clone(), None);
    let model = model.map(|m| m as Arc<dyn LanguageModel>);
    (Assistant::new(store, portfolio(), model), embedder)
}

// ============ Fallback context ============

#[tokio::test]
async fn experience_question_includes_every_company() {
    let model = StubModel::echo();
    let (assistant, _) = fallback_only(Some(model.clone()));

    let answer = assistant
        .answer("Tell me about his experience", &[])
        .await
        .unwrap();

    assert!(answer.contains("Acme Corp"));
    assert!(answer.contains("Initech"));
    assert!(answer.contains("Question: Tell me about his experience"));
}

#[tokio::test]
async fn company_name_alone_selects_experience() {
    let model = StubModel::echo();
    let (assistant, _) = fallback_only(Some(model.clone()));

    let answer = assistant
        .answer("What did he do at Acme Corp?", &[])
        .await
        .unwrap();
    assert!(answer.contains("Senior Engineer at Acme Corp"));

    let unrelated = assistant.answer("Any hobbies?", &[]).await.unwrap();
    assert!(!unrelated.contains("Acme Corp"));
}

#[tokio::test]
async fn no_index_still_answers_without_embedding() {
    let model = StubModel::echo();
    let (assistant, embedder) = fallback_only(Some(model.clone()));

    let answer = assistant.answer("Where is he based?", &[]).await.unwrap();

    assert!(!answer.is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_uses_fixed_parameters() {
    let model = StubModel::echo();
    let (assistant, _) = fallback_only(Some(model.clone()));

    assistant.answer("Hi", &[]).await.unwrap();

    let request = model.last_request();
    assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(request.max_tokens, 500);
    assert!(!request.system.is_empty());
}

#[tokio::test]
async fn history_is_trimmed_to_recent_turns() {
    let model = StubModel::echo();
    let (assistant, _) = fallback_only(Some(model.clone()));
    let history: Vec<ConversationTurn> = (0..10)
        .map(|i| {
            if i % 2 == 0 {
                ConversationTurn::user(format!("question {}", i))
            } else {
                ConversationTurn::assistant(format!("reply {}", i))
            }
        })
        .collect();

    let answer = assistant.answer("And then?", &history).await.unwrap();

    assert!(!answer.contains("question 2\n"));
    assert!(answer.contains("user: question 4"));
    assert!(answer.contains("assistant: reply 9"));
}

// ============ Vector context ============

#[tokio::test]
async fn vector_context_replaces_fallback() {
    let embedder = Arc::new(StubEmbedder::default());
    let index = Arc::new(InMemoryIndex::new());
    let store = ContextStore::new(embedder.clone(), Some(index));
    store
        .ingest(&[Chunk {
            text: "Sam migrated the billing pipeline to Rust in 2022.".into(),
            source: "resume.pdf".into(),
            kind: DocumentKind::Pdf,
            chunk_index: 0,
            total_chunks: 1,
        }])
        .await
        .unwrap();

    let model = StubModel::echo();
    let assistant = Assistant::new(store, portfolio(), Some(model.clone()));

    let context = assistant.retrieve("billing").await;
    assert_eq!(context.source, ContextSource::Vector);

    let answer = assistant.answer("What about billing?", &[]).await.unwrap();
    assert!(answer.contains("migrated the billing pipeline"));
    assert!(!answer.contains("Contact - Email"));
}

#[tokio::test]
async fn index_failure_falls_back() {
    let embedder = Arc::new(StubEmbedder::default());
    let index = Arc::new(BrokenIndex::default());
    let store = ContextStore::new(embedder.clone(), Some(index.clone()));
    let model = StubModel::echo();
    let assistant = Assistant::new(store, portfolio(), Some(model.clone()));

    let answer = assistant.answer("How do I reach him?", &[]).await.unwrap();

    assert_eq!(index.queries.load(Ordering::SeqCst), 1);
    assert!(answer.contains("Contact - Email: sam@example.com"));
}

// ============ Credential handling ============

#[tokio::test]
async fn missing_model_returns_apology_without_backend_calls() {
    let embedder = Arc::new(StubEmbedder::default());
    let index = Arc::new(BrokenIndex::default());
    let store = ContextStore::new(embedder.clone(), Some(index.clone()));
    let assistant = Assistant::new(store, portfolio(), None);

    let answer = assistant.answer("Tell me about his experience", &[]).await.unwrap();

    assert!(answer.contains("sam@example.com"));
    assert!(!assistant.is_configured());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(index.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_credentials_become_connection_apology() {
    let model = StubModel::failing(|| GenerationError::Unauthorized("401 Unauthorized".into()));
    let (assistant, _) = fallback_only(Some(model.clone()));

    let answer = assistant.answer("Hi", &[]).await.unwrap();

    assert!(answer.contains("trouble connecting"));
    assert!(answer.contains("sam@example.com"));
}

#[tokio::test]
async fn credential_text_in_transport_error_is_recognized() {
    let model = StubModel::failing(|| {
        GenerationError::Transport("Incorrect API key provided: sk-****".into())
    });
    let (assistant, _) = fallback_only(Some(model));

    let answer = assistant.answer("Hi", &[]).await.unwrap();
    assert!(answer.contains("trouble connecting"));
}

#[tokio::test]
async fn other_generation_failures_propagate() {
    let model = StubModel::failing(|| GenerationError::Api {
        status: 529,
        body: "overloaded".into(),
    });
    let (assistant, _) = fallback_only(Some(model));

    let err = assistant.answer("Hi", &[]).await.unwrap_err();
    assert!(matches!(err, GenerationError::Api { status: 529, .. }));
}

#[tokio::test]
async fn server_error_with_numeric_body_is_not_a_credential_failure() {
    let model = StubModel::failing(|| GenerationError::Api {
        status: 500,
        body: "upstream failure, request id req_84013".into(),
    });
    let (assistant, _) = fallback_only(Some(model));

    let err = assistant.answer("Hi", &[]).await.unwrap_err();
    assert!(matches!(err, GenerationError::Api { status: 500, .. }));
}
