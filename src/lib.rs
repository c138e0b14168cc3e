//! # Portfolio RAG
//!
//! A retrieval-augmented assistant that answers natural-language questions
//! about one person's professional background, grounded in their resume,
//! notes, and curated structured content.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Documents  │──▶│  Processor  │──▶│ ContextStore │
//! │ pdf/md/json │   │   chunking  │   │ embed+index  │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ passages (or nothing)
//!                   ┌──────────────┐   ┌─────▼──────┐   ┌───────────┐
//!                   │   Fallback   │──▶│ Assistant  │──▶│    LLM    │
//!                   │   selector   │   │  answer()  │   │ complete  │
//!                   └──────────────┘   └─────┬──────┘   └───────────┘
//!                                      ┌─────┴──────┐
//!                                      ▼            ▼
//!                                 ┌────────┐   ┌──────────┐
//!                                 │  CLI   │   │   HTTP   │
//!                                 │(folio) │   │/api/chat │
//!                                 └────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`content`] | Structured portfolio content |
//! | [`chunk`] | Sentence and markdown chunking |
//! | [`extract`] | PDF and UTF-8 text extraction |
//! | [`processor`] | Document processor |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index backends |
//! | [`store`] | Batched ingestion and retrieval |
//! | [`fallback`] | Rule-based context selection |
//! | [`prompt`] | Grounding prompt assembly |
//! | [`llm`] | Language-model backends |
//! | [`orchestrator`] | Per-query pipeline |
//! | [`ingest`] | Ingestion command |
//! | [`server`] | HTTP chat server |
//! | [`error`] | Error types |

pub mod chunk;
pub mod config;
pub mod content;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod processor;
pub mod prompt;
pub mod server;
pub mod store;
