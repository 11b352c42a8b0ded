//! Sequential hand-off of cached documents to the ingestion endpoint.

use tracing::{info, warn};

use crate::client::RagBackend;
use crate::codec;
use crate::error::UploadError;
use crate::models::CachedDocument;

/// Submit every document to the ingestion endpoint, one at a time, in order.
///
/// Stops at the first document that fails to decode or that the endpoint
/// rejects; later documents are not attempted. Nothing is remembered between
/// calls, so a retry re-sends the whole set.
///
/// Returns the number of documents uploaded.
pub async fn upload_all(
    backend: &dyn RagBackend,
    documents: &[CachedDocument],
) -> Result<usize, UploadError> {
    for (index, doc) in documents.iter().enumerate() {
        let bytes = match codec::decode(&doc.content) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(name = %doc.name, index, error = %e, "document does not decode, stopping");
                return Err(UploadError {
                    index,
                    name: doc.name.clone(),
                    reason: e.into(),
                });
            }
        };

        if let Err(reason) = backend.ingest(&doc.name, bytes).await {
            warn!(name = %doc.name, index, error = %reason, "upload failed, stopping");
            return Err(UploadError {
                index,
                name: doc.name.clone(),
                reason,
            });
        }
        info!(name = %doc.name, index, total = documents.len(), "uploaded");
    }

    Ok(documents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AnswerResponse;
    use crate::error::QueryError;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every ingest call; rejects names listed in `reject`.
    struct Recorder {
        reject: Vec<&'static str>,
        calls: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl RagBackend for Recorder {
        async fn ingest(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
            self.calls.lock().unwrap().push((name.to_string(), bytes));
            if self.reject.iter().any(|r| *r == name) {
                bail!("500 Internal Server Error");
            }
            Ok(())
        }

        async fn ask(&self, _question: &str) -> Result<AnswerResponse, QueryError> {
            unreachable!("upload never asks")
        }
    }

    fn docs(names: &[&str]) -> Vec<CachedDocument> {
        names
            .iter()
            .map(|n| CachedDocument::from_bytes(*n, n.as_bytes()))
            .collect()
    }

    #[tokio::test]
    async fn test_uploads_in_order_with_original_bytes() {
        let backend = Recorder {
            reject: vec![],
            calls: Mutex::new(vec![]),
        };
        let n = upload_all(&backend, &docs(&["a", "b", "c"])).await.unwrap();
        assert_eq!(n, 3);
        let calls = backend.calls.lock().unwrap();
        let names: Vec<&str> = calls.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(calls[1].1, b"b");
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let backend = Recorder {
            reject: vec!["b"],
            calls: Mutex::new(vec![]),
        };
        let err = upload_all(&backend, &docs(&["a", "b", "c"]))
            .await
            .unwrap_err();
        assert_eq!(err.name, "b");
        assert_eq!(err.index, 1);
        assert_eq!(backend.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_document_is_attributed() {
        let backend = Recorder {
            reject: vec![],
            calls: Mutex::new(vec![]),
        };
        let mut set = docs(&["a"]);
        set.push(CachedDocument {
            name: "broken".to_string(),
            content: "%%%".to_string(),
        });
        let err = upload_all(&backend, &set).await.unwrap_err();
        assert_eq!(err.name, "broken");
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_set_is_success() {
        let backend = Recorder {
            reject: vec![],
            calls: Mutex::new(vec![]),
        };
        assert_eq!(upload_all(&backend, &[]).await.unwrap(), 0);
    }
}
