//! Typed failures for the cache, upload and query stages.
//!
//! Infrastructure code (config, database, CLI) reports errors with
//! `anyhow`; these types exist where callers need to tell the failure
//! kinds apart.

use thiserror::Error;

/// A persisted document body that is not valid base64.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid encoded content: {0}")]
pub struct CodecError(pub String);

/// The query was empty and there were no cached documents to ask about.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("type a question or add a document first")]
pub struct ValidationError;

/// The first document the ingestion endpoint refused.
///
/// Later documents in the same pass were never attempted.
#[derive(Error, Debug)]
#[error("upload of '{name}' (#{index}) failed: {reason}")]
pub struct UploadError {
    pub index: usize,
    pub name: String,
    pub reason: anyhow::Error,
}

/// The answering endpoint could not produce a usable response.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("answering endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
}
