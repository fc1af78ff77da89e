pub mod backend;
pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod mock;
pub mod models;
pub mod transport;
pub mod upload;

use std::sync::Arc;

use crate::client::ApiClient;
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::Result;
use crate::transport::{CompletionTransport, TogetherTransport};
use crate::upload::UploadOrchestrator;

pub use crate::error::DocQaError;
pub use crate::models::{AIResponse, Document, DocumentStatus, QAResponse, UploadFile};

/// Everything a front end needs, wired from one config.
pub struct DocQaService {
    client: Arc<ApiClient>,
    completion: Option<Arc<CompletionClient>>,
    uploads: UploadOrchestrator,
}

impl DocQaService {
    pub fn new(cfg: &Config) -> Result<Self> {
        let completion = TogetherTransport::from_config(&cfg.completion)?.map(|transport| {
            Arc::new(CompletionClient::new(
                Arc::new(transport) as Arc<dyn CompletionTransport>,
                cfg.completion.model.clone(),
            ))
        });
        if completion.is_none() {
            tracing::info!("No completion credential configured; model features disabled");
        }

        let client = Arc::new(ApiClient::from_config(cfg, completion.clone())?);
        Ok(Self::from_parts(client, completion, cfg))
    }

    /// Assemble from pre-built parts, e.g. fakes in tests.
    pub fn from_parts(
        client: Arc<ApiClient>,
        completion: Option<Arc<CompletionClient>>,
        cfg: &Config,
    ) -> Self {
        let uploads = UploadOrchestrator::new(Arc::clone(&client), cfg.upload.clone());
        Self {
            client,
            completion,
            uploads,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn completion(&self) -> Option<&CompletionClient> {
        self.completion.as_deref()
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }
}
