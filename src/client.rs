use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::backend::{DocumentBackend, HttpBackend};
use crate::completion::CompletionClient;
use crate::config::{Config, MockDelays};
use crate::error::{DocQaError, Result};
use crate::mock::{self, MOCK_CONTEXT, MOCK_DOCUMENT_TITLE};
use crate::models::{AskRequest, Document, QAResponse, UploadFile};

pub const DEFAULT_CHUNK_COUNT: u32 = 3;

/// Where requests go
#[derive(Clone)]
pub enum ClientMode {
    /// Fixtures with artificial latency
    Mock(MockDelays),
    Live(Arc<dyn DocumentBackend>),
}

/// Request client for listing, uploading and asking.
///
/// The completion adapter is optional and independent of the mode; the mock
/// strategy uses it for answers when present.
#[derive(Clone)]
pub struct ApiClient {
    mode: ClientMode,
    completion: Option<Arc<CompletionClient>>,
}

impl ApiClient {
    pub fn new(mode: ClientMode, completion: Option<Arc<CompletionClient>>) -> Self {
        Self { mode, completion }
    }

    pub fn from_config(cfg: &Config, completion: Option<Arc<CompletionClient>>) -> Result<Self> {
        let mode = if cfg.api.use_mock_data {
            tracing::info!("Request client running against mock data");
            ClientMode::Mock(cfg.api.mock_delays)
        } else {
            tracing::info!("Request client running against {}", cfg.api.base_url);
            ClientMode::Live(Arc::new(HttpBackend::new(&cfg.api)?))
        };
        Ok(Self::new(mode, completion))
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mode, ClientMode::Mock(_))
    }

    /// Never fails: live errors fall back to the built-in documents.
    pub async fn list_documents(&self) -> Vec<Document> {
        match &self.mode {
            ClientMode::Mock(delays) => {
                sleep(Duration::from_millis(delays.list_ms)).await;
                mock::mock_documents()
            }
            ClientMode::Live(backend) => match backend.fetch_documents().await {
                Ok(docs) => docs,
                Err(e) => {
                    tracing::warn!("Failed to fetch documents, using built-in list: {}", e);
                    mock::mock_documents()
                }
            },
        }
    }

    pub async fn upload_document(&self, file: &UploadFile, title: &str) -> Result<Document> {
        match &self.mode {
            ClientMode::Mock(delays) => {
                sleep(Duration::from_millis(delays.upload_ms)).await;
                Ok(mock::synthesize_uploaded(file, title))
            }
            ClientMode::Live(backend) => {
                backend.create_document(file, title).await.map_err(|e| {
                    tracing::error!("Failed to upload document {}: {}", file.name, e);
                    DocQaError::upload_failed()
                })
            }
        }
    }

    /// `processing_time` is always set to the elapsed milliseconds of this call.
    pub async fn ask_question(
        &self,
        document_id: &str,
        question: &str,
        chunk_count: Option<u32>,
    ) -> Result<QAResponse> {
        let start = Instant::now();

        let mut response = match &self.mode {
            ClientMode::Mock(delays) => self.mock_answer(question, delays).await,
            ClientMode::Live(backend) => {
                let req = AskRequest {
                    document_id: document_id.to_string(),
                    question: question.to_string(),
                    chunk_count: chunk_count.unwrap_or(DEFAULT_CHUNK_COUNT),
                };
                backend.post_question(&req).await.map_err(|e| {
                    tracing::error!("Failed to ask question about {}: {}", document_id, e);
                    DocQaError::question_failed()
                })?
            }
        };

        response.processing_time = Some(start.elapsed().as_millis() as u64);
        Ok(response)
    }

    async fn mock_answer(&self, question: &str, delays: &MockDelays) -> QAResponse {
        if let Some(completion) = &self.completion {
            match completion
                .generate_answer(question, MOCK_CONTEXT, MOCK_DOCUMENT_TITLE)
                .await
            {
                Ok(ai) => {
                    return QAResponse {
                        answer: ai.answer.clone(),
                        sources: mock::mock_ai_sources(),
                        document_title: MOCK_DOCUMENT_TITLE.to_string(),
                        ai_response: Some(ai),
                        processing_time: None,
                    };
                }
                Err(e) => {
                    tracing::warn!("Completion failed, using canned mock answer: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(delays.ask_ms)).await;
        mock::mock_qa_response()
    }
}
