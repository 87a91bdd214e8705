use std::path::{Path, PathBuf};

use guided_study::api::SupabaseClient;
use guided_study::document::Document;
use guided_study::questions::QuestionStore;
use guided_study::study::TimerRequest;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{ErrorInfo, Result, StudyError};

use super::state::AppMessage;

/// Where documents and questions are read from.
#[derive(Clone)]
pub enum DocumentSource {
    File {
        document: PathBuf,
        questions: Option<PathBuf>,
    },
    Backend {
        client: SupabaseClient,
        document_id: String,
    },
}

impl DocumentSource {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if let Some(document) = &config.source.document {
            return Ok(Self::File {
                document: document.clone(),
                questions: config.source.questions.clone(),
            });
        }
        match &config.source.document_id {
            Some(id) => Ok(Self::Backend {
                client: SupabaseClient::new(&config.supabase.url, &config.supabase.anon_key),
                document_id: id.clone(),
            }),
            None => Err(StudyError::Config("no document source configured".into())),
        }
    }

    pub async fn load_document(&self) -> Result<Document> {
        match self {
            Self::File { document, .. } => read_document(document),
            Self::Backend {
                client,
                document_id,
            } => client.fetch_document(document_id).await,
        }
    }

    pub async fn load_questions(&self) -> Result<QuestionStore> {
        match self {
            Self::File {
                questions: Some(path),
                ..
            } => QuestionStore::load(path),
            Self::File {
                questions: None, ..
            } => Ok(QuestionStore::new()),
            Self::Backend {
                client,
                document_id,
            } => client.fetch_questions(document_id).await,
        }
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)?;
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled");
    Document::from_lexical_json(title, &raw)
}

pub(super) fn spawn_load(source: &DocumentSource, tx: &mpsc::UnboundedSender<AppMessage>) {
    let source = source.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let loaded = async {
            let document = source.load_document().await?;
            let questions = source.load_questions().await?;
            Ok::<_, StudyError>((document, questions))
        }
        .await;
        let msg = match loaded {
            Ok((document, questions)) => AppMessage::Loaded {
                document,
                questions,
            },
            Err(e) => {
                warn!(error = %e, "Initial load failed");
                AppMessage::LoadError(ErrorInfo::from_study_error(&e))
            }
        };
        let _ = tx.send(msg);
    });
}

/// Re-read the document and its questions. Failures are logged and the
/// current content stays in place.
pub(super) fn spawn_reload(source: &DocumentSource, tx: &mpsc::UnboundedSender<AppMessage>) {
    let source = source.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let document = match source.load_document().await {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "Document reload failed");
                return;
            }
        };
        let questions = match source.load_questions().await {
            Ok(questions) => Some(questions),
            Err(e) => {
                warn!(error = %e, "Question reload failed");
                None
            }
        };
        let _ = tx.send(AppMessage::DocumentReloaded {
            document,
            questions,
        });
    });
}

/// Pending delayed callbacks, each a sleeping task that reports back as
/// `AppMessage::Timer`.
#[derive(Default)]
pub struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub fn apply(&mut self, requests: Vec<TimerRequest>, tx: &mpsc::UnboundedSender<AppMessage>) {
        for request in requests {
            match request {
                TimerRequest::CancelAll => {
                    debug!(count = self.handles.len(), "Cancelling timers");
                    for handle in self.handles.drain(..) {
                        handle.abort();
                    }
                }
                TimerRequest::Schedule { timer, after } => {
                    self.handles.retain(|h| !h.is_finished());
                    let tx = tx.clone();
                    self.handles.push(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(AppMessage::Timer(timer));
                    }));
                }
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}
