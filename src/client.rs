//! Remote retrieval-augmented answering service.
//!
//! [`RagBackend`] is the seam between the session and the network: the
//! session only ever talks to the trait, and [`HttpRagClient`] is the
//! production implementation.
//!
//! # Wire format
//!
//! | Call | Request | Success |
//! |------|---------|---------|
//! | ingest | `POST` multipart, one `file` part (bytes + filename) | any 2xx with a JSON body |
//! | ask | `POST` JSON `{"question": "..."}` | 2xx JSON `{"answer": "...", "sources": [...]}` |
//!
//! Both `answer` and `sources` are optional in the response.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EndpointsConfig;
use crate::error::QueryError;

/// Body sent to the answering endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    pub question: String,
}

/// Body returned by the answering endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

#[async_trait]
pub trait RagBackend: Send + Sync {
    /// Register one document with the retrieval backend.
    async fn ingest(&self, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Ask a question against everything ingested so far.
    async fn ask(&self, question: &str) -> Result<AnswerResponse, QueryError>;
}

/// [`RagBackend`] over HTTP.
pub struct HttpRagClient {
    client: reqwest::Client,
    ingest_url: String,
    query_url: String,
}

impl HttpRagClient {
    pub fn new(config: &EndpointsConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            ingest_url: config.ingest_url.clone(),
            query_url: config.query_url.clone(),
        })
    }
}

#[async_trait]
impl RagBackend for HttpRagClient {
    async fn ingest(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.ingest_url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.ingest_url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("ingestion endpoint returned {}: {}", status, body_text);
        }

        // Content is ignored, but it must be JSON.
        let _: serde_json::Value = response
            .json()
            .await
            .with_context(|| "ingestion endpoint returned a non-JSON body")?;
        debug!(name, "document ingested");
        Ok(())
    }

    async fn ask(&self, question: &str) -> Result<AnswerResponse, QueryError> {
        let body = QuestionRequest {
            question: question.to_string(),
        };

        let response = self.client.post(&self.query_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let text = response.text().await?;
        let answer: AnswerResponse =
            serde_json::from_str(&text).map_err(|e| QueryError::Parse(e.to_string()))?;
        debug!(has_answer = answer.answer.is_some(), "answer received");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_fields_optional() {
        let a: AnswerResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(a, AnswerResponse::default());

        let a: AnswerResponse =
            serde_json::from_str(r#"{"answer":"x","sources":["p1","p2"],"extra":1}"#).unwrap();
        assert_eq!(a.answer.as_deref(), Some("x"));
        assert_eq!(a.sources.unwrap(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_question_body_shape() {
        let body = QuestionRequest {
            question: "Respond in french: Summarize this".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"question":"Respond in french: Summarize this"}"#
        );
    }
}
