use std::sync::{Arc, Mutex, PoisonError};

use gloss_types::AnnotateConfig;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::annotate::{AnnotatedDocument, Annotator};
use crate::extract::{ExtractionError, TextExtractor};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("run {0} was superseded by a newer document")]
    Superseded(u64),
}

/// Run-level status line shown to the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Reading,
    Annotating,
    Succeeded,
    Failed(String),
}

impl RunStatus {
    pub fn message(&self) -> &str {
        match self {
            RunStatus::Idle => "Waiting for a document.",
            RunStatus::Reading => "Reading document…",
            RunStatus::Annotating => "Extracting and annotating text…",
            RunStatus::Succeeded => "Document processed successfully.",
            RunStatus::Failed(message) => message,
        }
    }
}

/// Handle for one submitted document. Newer tickets supersede older ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
}

impl RunTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PublishedDocument {
    pub generation: u64,
    pub title: Option<String>,
    pub dictionary_mode: String,
    pub html: String,
    #[serde(flatten)]
    pub document: AnnotatedDocument,
}

#[derive(Debug, Default)]
struct SessionState {
    generation: u64,
    current: Option<Arc<PublishedDocument>>,
    status: RunStatus,
}

/// The single display slot and its status line.
///
/// Only the most recently started run may write either. Older runs still
/// finish (their lookups warm the shared cache) but their output is dropped.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_run(&self) -> RunTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.status = RunStatus::Reading;
        RunTicket {
            generation: state.generation,
        }
    }

    pub fn is_current(&self, ticket: RunTicket) -> bool {
        self.lock().generation == ticket.generation
    }

    /// Update the status line; ignored for superseded runs.
    pub fn set_status(&self, ticket: RunTicket, status: RunStatus) -> bool {
        let mut state = self.lock();
        if state.generation != ticket.generation {
            return false;
        }
        state.status = status;
        true
    }

    pub fn status(&self) -> RunStatus {
        self.lock().status.clone()
    }

    pub fn current(&self) -> Option<Arc<PublishedDocument>> {
        self.lock().current.clone()
    }

    /// Install `document` as the displayed one if `ticket` is still the newest run.
    pub fn publish(
        &self,
        ticket: RunTicket,
        document: PublishedDocument,
    ) -> Result<Arc<PublishedDocument>, RunError> {
        let mut state = self.lock();
        if state.generation != ticket.generation {
            return Err(RunError::Superseded(ticket.generation));
        }
        let document = Arc::new(document);
        state.current = Some(Arc::clone(&document));
        state.status = RunStatus::Succeeded;
        Ok(document)
    }

    /// Extract, annotate and publish one document.
    ///
    /// Extraction failures end the run with a `Failed` status and leave the
    /// displayed document untouched.
    pub async fn process(
        &self,
        extractor: &dyn TextExtractor,
        annotator: &Annotator,
        bytes: &[u8],
        title: Option<String>,
        config: &AnnotateConfig,
    ) -> Result<Arc<PublishedDocument>, RunError> {
        let ticket = self.begin_run();
        let text = match extractor.extract(bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!(run = ticket.generation, error = %err, "document extraction failed");
                self.set_status(
                    ticket,
                    RunStatus::Failed("Failed to extract text from document.".to_string()),
                );
                return Err(err.into());
            }
        };

        self.set_status(ticket, RunStatus::Annotating);
        let document = annotator.annotate(&text, config).await;
        let published = PublishedDocument {
            generation: ticket.generation,
            title,
            dictionary_mode: config.dictionary_mode.as_str().to_string(),
            html: document.render_markup(),
            document,
        };
        match self.publish(ticket, published) {
            Ok(doc) => {
                info!(run = ticket.generation, "document published");
                Ok(doc)
            }
            Err(err) => {
                info!(run = ticket.generation, "discarding superseded run output");
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
