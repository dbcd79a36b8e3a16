//! # pdfqa
//!
//! Incremental PDF ingestion into a vector index plus a conversational
//! retrieval chain that answers questions grounded in those documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌──────────────┐
//! │  docs/   │──▶│ Load → Chunk →    │──▶│ Vector index │
//! │  *.pdf   │   │ Embed → Upsert    │   │ (namespace)  │
//! └──────────┘   └─────────┬─────────┘   └──────┬───────┘
//!                          ▼                    │
//!                   processed/*.processed       │
//!                                               ▼
//!              question + history ──▶ Condense → Retrieve → Generate
//!                                               │
//!                                      { text, sourceDocuments }
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pdfqa ingest                         # embed new PDFs from docs/
//! pdfqa ask "What does chapter 2 cover?"
//! pdfqa serve                          # POST /api/chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`tracker`] | Processed-document markers |
//! | [`loader`] | PDF text extraction |
//! | [`chunk`] | Recursive character text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index backends |
//! | [`ingest`] | Ingestion pipeline |
//! | [`llm`] | Chat model clients |
//! | [`prompt`] | Instruction templates |
//! | [`chain`] | Conversational retrieval chain |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chain;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
mod http;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod server;
pub mod tracker;
