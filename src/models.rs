use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a document on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Uploading => write!(f, "uploading"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Ready => write!(f, "ready"),
            DocumentStatus::Error => write!(f, "error"),
        }
    }
}

/// Document record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_type: String,
    pub size: u64,
    pub pages: u32,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }
}

/// Documents that can be asked about.
pub fn ready_documents(docs: &[Document]) -> Vec<Document> {
    docs.iter().filter(|d| d.is_ready()).cloned().collect()
}

pub fn find_document<'a>(docs: &'a [Document], id: &str) -> Option<&'a Document> {
    docs.iter().find(|d| d.id == id)
}

// GET /documents/ body
#[derive(Debug, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub results: Option<Vec<Document>>,
}

/// A file selected for upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Text after the last dot; the whole name when there is none.
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub chunk_index: u32,
    pub content: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn is_consistent(&self) -> bool {
        u64::from(self.prompt_tokens) + u64::from(self.completion_tokens)
            == u64::from(self.total_tokens)
    }
}

/// Normalised answer from the hosted completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIResponse {
    pub answer: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QAResponse {
    pub answer: String,
    pub sources: Vec<SourceChunk>,
    pub document_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<AIResponse>,
    /// Client-measured elapsed milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
}

// POST /questions/ body
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub document_id: String,
    pub question: String,
    pub chunk_count: u32,
}

// Hosted completion request format
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

// Hosted completion response format
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: Option<String>,
}

impl CompletionResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, status: DocumentStatus) -> Document {
        Document {
            id: id.to_string(),
            title: format!("{id}.txt"),
            file_type: "txt".to_string(),
            size: 10,
            pages: 1,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_document_deserializes_backend_shape() {
        let json = r#"{
            "id": "7",
            "title": "Notes.txt",
            "file_type": "txt",
            "size": 3456,
            "pages": 2,
            "status": "processing",
            "created_at": "2024-01-13T09:15:00Z",
            "updated_at": "2024-01-13T09:18:00Z"
        }"#;
        let d: Document = serde_json::from_str(json).unwrap();
        assert_eq!(d.status, DocumentStatus::Processing);
        assert_eq!(d.size, 3456);
        assert!(!d.is_ready());
    }

    #[test]
    fn test_ready_documents_filters_and_find() {
        let docs = vec![
            doc("1", DocumentStatus::Ready),
            doc("2", DocumentStatus::Processing),
            doc("3", DocumentStatus::Ready),
        ];
        let ready = ready_documents(&docs);
        assert_eq!(ready.len(), 2);
        assert!(find_document(&ready, "2").is_none());
        assert_eq!(find_document(&docs, "3").map(|d| d.id.as_str()), Some("3"));
    }

    #[test]
    fn test_document_list_without_results() {
        let list: DocumentList = serde_json::from_str("{}").unwrap();
        assert!(list.results.is_none());
    }

    #[test]
    fn test_upload_file_extension() {
        assert_eq!(UploadFile::new("a.b.txt", vec![]).extension(), "txt");
        assert_eq!(UploadFile::new("README", vec![]).extension(), "README");
        assert_eq!(UploadFile::new("trailing.", vec![]).extension(), "");
    }

    #[test]
    fn test_completion_request_omits_unset_sampling() {
        let req = CompletionRequest {
            model: "m".to_string(),
            prompt: "p".to_string(),
            max_tokens: 10,
            temperature: None,
            top_p: None,
            stop: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, serde_json::json!({"model": "m", "prompt": "p", "max_tokens": 10}));
    }

    #[test]
    fn test_usage_consistency() {
        let ok = Usage {
            prompt_tokens: 3,
            completion_tokens: 4,
            total_tokens: 7,
        };
        let bad = Usage {
            total_tokens: 8,
            ..ok
        };
        assert!(ok.is_consistent());
        assert!(!bad.is_consistent());
    }
}
