//! Built-in fixtures served when no backend is contacted.

use chrono::{DateTime, Utc};

use crate::models::{Document, DocumentStatus, QAResponse, SourceChunk, UploadFile};

pub const MOCK_DOCUMENT_TITLE: &str = "Sample Research Paper.txt";

pub const MOCK_CONTEXT: &str = "Artificial intelligence has become a cornerstone of modern software development, enabling applications to process and understand data in ways that were previously impossible. Machine learning algorithms require careful consideration of data structures and computational complexity to ensure optimal performance.

The document discusses various AI applications including natural language processing, computer vision, and predictive analytics. It emphasizes the importance of proper data preprocessing and model validation techniques.";

const MOCK_ANSWER: &str = "Based on the document content, the main topic discusses artificial intelligence and machine learning applications in modern software development. The document emphasizes the importance of understanding data structures and algorithms when implementing AI solutions.";

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn mock_document(
    id: &str,
    title: &str,
    size: u64,
    pages: u32,
    status: DocumentStatus,
    created_at: &str,
    updated_at: &str,
) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        file_type: "txt".to_string(),
        size,
        pages,
        status,
        created_at: ts(created_at),
        updated_at: ts(updated_at),
    }
}

pub fn mock_documents() -> Vec<Document> {
    vec![
        mock_document(
            "1",
            MOCK_DOCUMENT_TITLE,
            15420,
            8,
            DocumentStatus::Ready,
            "2024-01-15T10:30:00Z",
            "2024-01-15T10:35:00Z",
        ),
        mock_document(
            "2",
            "Project Documentation.txt",
            8932,
            5,
            DocumentStatus::Processing,
            "2024-01-14T14:20:00Z",
            "2024-01-14T14:25:00Z",
        ),
        mock_document(
            "3",
            "Meeting Notes.txt",
            3456,
            2,
            DocumentStatus::Ready,
            "2024-01-13T09:15:00Z",
            "2024-01-13T09:18:00Z",
        ),
    ]
}

pub fn mock_qa_response() -> QAResponse {
    QAResponse {
        answer: MOCK_ANSWER.to_string(),
        sources: vec![
            SourceChunk {
                chunk_index: 0,
                content: "Artificial intelligence has become a cornerstone of modern software development, enabling applications to process and understand data in ways that were previously impossible..."
                    .to_string(),
                page_number: 1,
            },
            SourceChunk {
                chunk_index: 2,
                content: "Machine learning algorithms require careful consideration of data structures and computational complexity to ensure optimal performance..."
                    .to_string(),
                page_number: 3,
            },
        ],
        document_title: MOCK_DOCUMENT_TITLE.to_string(),
        ai_response: None,
        processing_time: None,
    }
}

/// Short citations attached to model-generated mock answers
pub fn mock_ai_sources() -> Vec<SourceChunk> {
    vec![
        SourceChunk {
            chunk_index: 0,
            content: "Artificial intelligence has become a cornerstone of modern software development..."
                .to_string(),
            page_number: 1,
        },
        SourceChunk {
            chunk_index: 2,
            content: "Machine learning algorithms require careful consideration of data structures..."
                .to_string(),
            page_number: 3,
        },
    ]
}

/// Document the backend would hand back right after an upload
pub fn synthesize_uploaded(file: &UploadFile, title: &str) -> Document {
    let now = Utc::now();
    let file_type = match file.extension() {
        "" => "txt",
        ext => ext,
    };
    Document {
        id: now.timestamp_millis().to_string(),
        title: title.to_string(),
        file_type: file_type.to_string(),
        size: file.size(),
        pages: 1,
        status: DocumentStatus::Processing,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_documents_fixture() {
        let docs = mock_documents();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(docs[1].status, DocumentStatus::Processing);
        assert_eq!(docs[0].created_at.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_synthesize_uploaded() {
        let file = UploadFile::new("notes.final.txt", b"hello".to_vec());
        let doc = synthesize_uploaded(&file, "My notes");
        assert_eq!(doc.title, "My notes");
        assert_eq!(doc.file_type, "txt");
        assert_eq!(doc.size, 5);
        assert_eq!(doc.pages, 1);
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert!(doc.id.parse::<i64>().is_ok());
    }

    #[test]
    fn test_synthesize_uploaded_file_type_fallbacks() {
        let dotless = synthesize_uploaded(&UploadFile::new("README", vec![]), "r");
        assert_eq!(dotless.file_type, "README");
        let trailing = synthesize_uploaded(&UploadFile::new("draft.", vec![]), "d");
        assert_eq!(trailing.file_type, "txt");
    }
}
