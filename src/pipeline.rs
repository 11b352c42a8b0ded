//! Upload-then-query session.
//!
//! A [`Session`] owns the transcript, the draft/language state, the busy
//! flag and the document cache, and drives one question at a time through:
//!
//! ```text
//! Idle ─▶ Validating ─▶ Uploading ─▶ Querying ─▶ Idle
//!              │             │            │
//!              └─────────────┴────────────┴──▶ Idle (failure)
//! ```
//!
//! `busy` is true in every state but Idle. It is taken with a
//! compare-and-swap on entry and released by a drop guard, so a second
//! `submit` while one is in flight is rejected rather than interleaved, and
//! no exit path can leave the session stuck busy.
//!
//! Failures never escape [`Session::submit`]: an empty question with an
//! empty cache is a silent no-op, and upload or answering failures become
//! assistant messages in the transcript.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::client::RagBackend;
use crate::error::ValidationError;
use crate::models::{CachedDocument, Language, Message, SessionState};
use crate::transcript::Transcript;
use crate::upload;

/// User message shown when documents are submitted without a question.
pub const USER_PLACEHOLDER: &str = "Ask something about the uploaded documents";
/// Question sent when documents are submitted without a question.
pub const DEFAULT_QUESTION: &str = "Summarize the uploaded documents";
/// Assistant message when the answering endpoint returns no answer text.
pub const NO_RESPONSE: &str = "No response from API";
/// Assistant message when the answering call fails.
pub const QUERY_FAILED: &str = "Something went wrong while fetching response.";

/// How a call to [`Session::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission was in flight; nothing happened.
    Busy,
    /// Empty question and empty cache; nothing happened.
    Invalid(ValidationError),
    /// A document was refused; the question was never sent.
    UploadFailed { index: usize, name: String },
    /// An assistant answer was appended.
    Answered,
    /// The answering call failed; an error message was appended.
    QueryFailed(String),
}

/// Build the question sent to the answering endpoint.
///
/// An empty `query` is replaced with [`DEFAULT_QUESTION`].
pub fn build_question(query: &str, language: Language) -> String {
    let query = if query.is_empty() {
        DEFAULT_QUESTION
    } else {
        query
    };
    format!("Respond in {}: {}", language, query)
}

/// Holds the busy flag for the lifetime of one submission.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Session {
    backend: Arc<dyn RagBackend>,
    cache: RwLock<CacheStore>,
    transcript: Mutex<Transcript>,
    draft_query: Mutex<String>,
    language: Mutex<Language>,
    busy: AtomicBool,
}

impl Session {
    pub fn new(backend: Arc<dyn RagBackend>, cache: CacheStore, language: Language) -> Self {
        Self {
            backend,
            cache: RwLock::new(cache),
            transcript: Mutex::new(Transcript::new()),
            draft_query: Mutex::new(String::new()),
            language: Mutex::new(language),
            busy: AtomicBool::new(false),
        }
    }

    // ============ Session state ============

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        *lock(&self.draft_query) = text.into();
    }

    pub fn select_language(&self, language: Language) {
        *lock(&self.language) = language;
    }

    /// Snapshot of draft, language and busy flag.
    pub fn state(&self) -> SessionState {
        SessionState {
            draft_query: lock(&self.draft_query).clone(),
            language: *lock(&self.language),
            busy: self.is_busy(),
        }
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Vec<Message> {
        lock(&self.transcript).messages().to_vec()
    }

    fn append(&self, message: Message) {
        lock(&self.transcript).push(message);
    }

    // ============ Cache ============

    pub async fn documents(&self) -> Vec<CachedDocument> {
        self.cache.read().await.list().to_vec()
    }

    pub async fn add_document(&self, doc: CachedDocument) -> Result<()> {
        self.cache.write().await.add(doc).await
    }

    pub async fn add_file(&self, path: &Path) -> Result<()> {
        self.cache.write().await.add_file(path).await
    }

    pub async fn remove_document(&self, index: usize) -> Result<Option<CachedDocument>> {
        self.cache.write().await.remove(index).await
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.write().await.clear().await
    }

    // ============ Submission ============

    /// Submit the stored draft in the selected language.
    pub async fn submit_draft(&self) -> SubmitOutcome {
        let state = self.state();
        self.submit(&state.draft_query, state.language).await
    }

    /// Run one validate → upload → query cycle.
    pub async fn submit(&self, draft_query: &str, language: Language) -> SubmitOutcome {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("submit ignored, session busy");
            return SubmitOutcome::Busy;
        };

        let query = draft_query.trim();
        let documents = self.documents().await;
        if query.is_empty() && documents.is_empty() {
            debug!("submit ignored, nothing to ask");
            return SubmitOutcome::Invalid(ValidationError);
        }

        let shown = if query.is_empty() {
            USER_PLACEHOLDER
        } else {
            query
        };
        self.append(Message::user(shown));
        lock(&self.draft_query).clear();

        if !documents.is_empty() {
            info!(count = documents.len(), "uploading cached documents");
            if let Err(e) = upload::upload_all(self.backend.as_ref(), &documents).await {
                self.append(Message::assistant(format!(
                    "File upload failed: {}.",
                    e.name
                )));
                return SubmitOutcome::UploadFailed {
                    index: e.index,
                    name: e.name,
                };
            }
        }

        let question = build_question(query, language);
        info!(language = %language, "asking question");
        match self.backend.ask(&question).await {
            Ok(response) => {
                let answer = response
                    .answer
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| NO_RESPONSE.to_string());
                let sources = response.sources.unwrap_or_default();
                self.append(Message::assistant(answer).with_sources(sources));
                SubmitOutcome::Answered
            }
            Err(e) => {
                warn!(error = %e, "answering endpoint failed");
                self.append(Message::assistant(QUERY_FAILED));
                SubmitOutcome::QueryFailed(e.to_string())
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
