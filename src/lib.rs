//! # rag-chat
//!
//! A local document cache and query orchestrator for retrieval-augmented
//! answering services.
//!
//! Documents are collected in a durable local cache. When a question is
//! submitted, every cached document is uploaded to the service's ingestion
//! endpoint, one at a time, and only then is the question sent to the
//! answering endpoint. The exchange is recorded in an append-only
//! transcript.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ CacheStore │──▶│   Session   │──▶│  RagBackend  │
//! │ (kv/SQLite)│   │ upload+ask  │   │ ingest / ask │
//! └────────────┘   └──────┬──────┘   └──────────────┘
//!                         ▼
//!                   ┌────────────┐
//!                   │ Transcript │
//!                   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragchat init                              # create the cache database
//! ragchat add ./report.pdf                  # cache a document
//! ragchat ask "Summarize this" --language french
//! ragchat chat                              # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`codec`] | Base64 encoding of document bytes |
//! | [`kv`] | Key-value persistence backends |
//! | [`cache`] | Durable document cache |
//! | [`client`] | Remote service client |
//! | [`upload`] | Sequential upload of cached documents |
//! | [`transcript`] | Append-only conversation log |
//! | [`pipeline`] | The upload-then-query session |
//! | [`commands`] | CLI command implementations |

pub mod cache;
pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod transcript;
pub mod upload;
