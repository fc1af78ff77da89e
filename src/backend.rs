use async_trait::async_trait;
use reqwest::{Client, Response, multipart};

use crate::config::ApiConfig;
use crate::error::{DocQaError, Result};
use crate::models::{AskRequest, Document, DocumentList, QAResponse, UploadFile};

#[cfg(test)]
use mockall::automock;

/// Raw calls against the document backend. Errors are not softened here.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentBackend: Send + Sync + 'static {
    async fn fetch_documents(&self) -> Result<Vec<Document>>;
    async fn create_document(&self, file: &UploadFile, title: &str) -> Result<Document>;
    async fn post_question(&self, req: &AskRequest) -> Result<QAResponse>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn check(endpoint: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        tracing::error!("API request failed for {}: status {}", endpoint, status);
        Err(DocQaError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        let response = self.client.get(self.url("/documents/")).send().await?;
        let list: DocumentList = Self::check("/documents/", response).await?.json().await?;
        Ok(list.results.unwrap_or_default())
    }

    async fn create_document(&self, file: &UploadFile, title: &str) -> Result<Document> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("text/plain")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("title", title.to_string());

        let response = self
            .client
            .post(self.url("/documents/"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check("/documents/", response).await?.json().await?)
    }

    async fn post_question(&self, req: &AskRequest) -> Result<QAResponse> {
        let response = self
            .client
            .post(self.url("/questions/"))
            .json(req)
            .send()
            .await?;
        Ok(Self::check("/questions/", response).await?.json().await?)
    }
}
