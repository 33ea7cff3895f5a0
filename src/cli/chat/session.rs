//! One chat session: context flags, the conversation log and the backend.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::consumer::{consume, Consumed, FAILURE_MESSAGE};
use super::context::{ContextState, DocumentHandle};
use super::conversation_state::{ConversationState, Turn};
use super::lock;
use super::router::route;
use crate::backend_client::Backend;
use crate::error::ClientError;

pub const STATUS_UPLOADING: &str = "Uploading document...";
pub const STATUS_DOCUMENT_READY: &str = "Document processed";
pub const STATUS_UPLOAD_FAILED: &str = "Upload failed";
pub const STATUS_ARTICLE_READY: &str = "Article analyzed";
pub const STATUS_ARTICLE_FAILED: &str = "Could not load the article";

/// Progress reported while a turn is being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ArticleLoading(String),
    Status(String),
    Chunk(String),
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Blank input with nothing attached; nothing was recorded or sent.
    Skipped,
    Streamed(String),
    Answered(String),
    /// A failure turn was written.
    Failed(ClientError),
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub proceed_on_article_failure: bool,
}

/// Clears the busy flag when the outstanding operation ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Session {
    backend: Arc<dyn Backend>,
    options: SessionOptions,
    context: Mutex<ContextState>,
    log: Mutex<ConversationState>,
    status: Mutex<Option<String>>,
    busy: AtomicBool,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, options: SessionOptions) -> Self {
        Self {
            backend,
            options,
            context: Mutex::new(ContextState::new()),
            log: Mutex::new(ConversationState::new()),
            status: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    /// Only one send or upload may be outstanding at a time.
    fn begin(&self) -> Result<InFlight<'_>, ClientError> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| InFlight(&self.busy))
            .map_err(|_| ClientError::Busy)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_status(&self, status: Option<&str>) {
        *lock(&self.status) = status.map(str::to_string);
    }

    pub fn status(&self) -> Option<String> {
        lock(&self.status).clone()
    }

    pub fn context(&self) -> ContextState {
        lock(&self.context).clone()
    }

    pub fn turns(&self) -> Vec<Turn> {
        lock(&self.log).get_messages().to_vec()
    }

    pub fn clear_log(&self) {
        lock(&self.log).clear();
    }

    /// Attach a document and have the backend ingest it.
    ///
    /// On failure the document is detached again and the error is returned.
    /// A document detached while its upload runs stays detached.
    pub async fn attach_document(&self, path: PathBuf) -> Result<(), ClientError> {
        let _in_flight = self.begin()?;
        let handle = DocumentHandle::new(path);

        lock(&self.context).attach_document(handle.clone());
        self.set_status(Some(STATUS_UPLOADING));

        match self.backend.upload_document(&handle).await {
            Ok(()) => {
                {
                    let mut context = lock(&self.context);
                    if context.document() != Some(&handle) {
                        info!("Document {} was detached during upload", handle.name);
                        return Ok(());
                    }
                    context.mark_document_ready();
                }
                self.set_status(Some(STATUS_DOCUMENT_READY));
                info!("Document {} is ready", handle.name);
                Ok(())
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", handle.name, e);
                lock(&self.context).detach_document();
                self.set_status(Some(STATUS_UPLOAD_FAILED));
                Err(e)
            }
        }
    }

    pub fn detach_document(&self) {
        lock(&self.context).detach_document();
        self.set_status(None);
    }

    pub fn forget_article(&self) {
        lock(&self.context).forget_article();
        info!("Article context cleared");
    }

    /// Handle one user turn end to end.
    ///
    /// Only `ClientError::Busy` is returned as an error; every other failure
    /// is written to the log and reported as `SendOutcome::Failed`.
    pub async fn send(
        &self,
        text: &str,
        on_event: &mut (dyn FnMut(SessionEvent) + Send),
    ) -> Result<SendOutcome, ClientError> {
        let _in_flight = self.begin()?;

        let decision = {
            let context = lock(&self.context);
            route(text, &context, context.document_attached())
        };
        let Some(decision) = decision else {
            return Ok(SendOutcome::Skipped);
        };
        debug!(
            "Sending to /{} via {}: {:?}",
            decision.endpoint.path(),
            decision.rule,
            decision.payload.text()
        );

        if let Some(turn) = &decision.user_turn {
            lock(&self.log).add_user_message(turn);
        }

        if let Some(url) = &decision.preload_article {
            on_event(SessionEvent::ArticleLoading(url.clone()));

            match self.backend.load_article(url).await {
                Ok(()) => {
                    lock(&self.context).mark_article_ready();
                    self.set_status(Some(STATUS_ARTICLE_READY));
                    on_event(SessionEvent::Status(STATUS_ARTICLE_READY.to_string()));
                }
                Err(e) => {
                    warn!("Loading article {} failed: {}", url, e);
                    lock(&self.context).mark_article_failed();
                    self.set_status(Some(STATUS_ARTICLE_FAILED));
                    on_event(SessionEvent::Status(STATUS_ARTICLE_FAILED.to_string()));

                    if !self.options.proceed_on_article_failure {
                        lock(&self.log).add_assistant_message(FAILURE_MESSAGE);
                        return Ok(SendOutcome::Failed(e));
                    }
                }
            }
        }

        let response = self.backend.dispatch(&decision).await;
        let consumed = consume(response, &self.log, &mut |chunk: &str| {
            on_event(SessionEvent::Chunk(chunk.to_string()))
        })
        .await;

        Ok(match consumed {
            Consumed::Streamed(text) => SendOutcome::Streamed(text),
            Consumed::Answered(answer) => SendOutcome::Answered(answer),
            Consumed::Failed(e) => SendOutcome::Failed(e),
        })
    }
}
