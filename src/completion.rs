use std::sync::Arc;

use crate::error::{ANSWER_FAILED_MESSAGE, DocQaError, Result, SUMMARY_FAILED_MESSAGE};
use crate::models::{AIResponse, CompletionRequest, CompletionResponse};
use crate::transport::CompletionTransport;

pub const ANSWER_FALLBACK: &str = "I couldn't generate an answer for this question.";
pub const SUMMARY_FALLBACK: &str = "I couldn't generate a summary for this document.";
pub const CONNECTION_PROBE: &str = "Test connection. Respond with 'OK'.";
pub const SUMMARY_CONTENT_LIMIT: usize = 3000;
const ANSWER_STOP_SEQUENCES: [&str; 3] = ["Human:", "Assistant:", "\n\n---"];

/// Entry of the model picker shown in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const AVAILABLE_MODELS: [ModelOption; 5] = [
    ModelOption {
        id: "meta-llama/Llama-2-70b-chat-hf",
        name: "Llama 2 70B Chat",
        description: "Best for conversations",
    },
    ModelOption {
        id: "meta-llama/Llama-2-13b-chat-hf",
        name: "Llama 2 13B Chat",
        description: "Faster, good quality",
    },
    ModelOption {
        id: "meta-llama/Llama-2-7b-chat-hf",
        name: "Llama 2 7B Chat",
        description: "Fastest, basic quality",
    },
    ModelOption {
        id: "mistralai/Mixtral-8x7B-Instruct-v0.1",
        name: "Mixtral 8x7B",
        description: "High performance",
    },
    ModelOption {
        id: "NousResearch/Nous-Hermes-2-Mixtral-8x7B-DPO",
        name: "Nous Hermes 2",
        description: "Fine-tuned",
    },
];

pub fn describe_model(id: &str) -> &'static str {
    AVAILABLE_MODELS
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.description)
        .unwrap_or("Custom model")
}

/// Prompt-templating wrapper around a hosted completion endpoint
pub struct CompletionClient {
    tx: Arc<dyn CompletionTransport>,
    model: String,
}

impl CompletionClient {
    pub fn new(tx: Arc<dyn CompletionTransport>, model: String) -> Self {
        Self { tx, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        document_title: &str,
    ) -> Result<AIResponse> {
        tracing::info!("Generating answer with {} for: {}", self.model, document_title);

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: build_answer_prompt(question, context, document_title),
            max_tokens: 500,
            temperature: Some(0.7),
            top_p: Some(0.9),
            stop: Some(ANSWER_STOP_SEQUENCES.iter().map(|s| s.to_string()).collect()),
        };

        let response = self.tx.complete(&request).await.map_err(|e| {
            tracing::error!("Completion API error while answering: {}", e);
            DocQaError::Completion(ANSWER_FAILED_MESSAGE.to_string())
        })?;

        Ok(self.normalize(response, ANSWER_FALLBACK))
    }

    pub async fn generate_summary(
        &self,
        content: &str,
        document_title: &str,
    ) -> Result<AIResponse> {
        tracing::info!("Generating summary with {} for: {}", self.model, document_title);

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: build_summary_prompt(content, document_title),
            max_tokens: 300,
            temperature: Some(0.5),
            top_p: Some(0.9),
            stop: None,
        };

        let response = self.tx.complete(&request).await.map_err(|e| {
            tracing::error!("Completion API error while summarizing: {}", e);
            DocQaError::Completion(SUMMARY_FAILED_MESSAGE.to_string())
        })?;

        Ok(self.normalize(response, SUMMARY_FALLBACK))
    }

    /// Never errors; any failure reads as "not connected".
    pub async fn test_connection(&self) -> bool {
        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: CONNECTION_PROBE.to_string(),
            max_tokens: 10,
            temperature: None,
            top_p: None,
            stop: None,
        };

        match self.tx.complete(&request).await {
            Ok(response) => response.first_text().is_some_and(|t| t.contains("OK")),
            Err(e) => {
                tracing::warn!("Completion connection test failed: {}", e);
                false
            }
        }
    }

    fn normalize(&self, response: CompletionResponse, fallback: &str) -> AIResponse {
        let answer = response
            .first_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback)
            .to_string();

        // Passed through as reported.
        if let Some(usage) = response.usage.filter(|u| !u.is_consistent()) {
            tracing::warn!(
                prompt = usage.prompt_tokens,
                completion = usage.completion_tokens,
                total = usage.total_tokens,
                "Completion usage totals do not add up"
            );
        }

        AIResponse {
            answer,
            model: self.model.clone(),
            usage: response.usage,
        }
    }
}

pub fn build_answer_prompt(question: &str, context: &str, document_title: &str) -> String {
    format!(
        "# Document Q&A Assistant

You are an AI assistant that answers questions based on document content. Use only the provided context to answer questions accurately and concisely.

Document: {document_title}

Context:
{context}

Question: {question}

Instructions:
- Answer based only on the provided context
- If the context doesn't contain enough information, say so
- Be concise but thorough
- Cite specific parts of the context when relevant
- If you cannot answer based on the context, explain what information would be needed

Answer:"
    )
}

pub fn build_summary_prompt(content: &str, document_title: &str) -> String {
    let excerpt = truncate_chars(content, SUMMARY_CONTENT_LIMIT);
    format!(
        "# Document Summary Task

Document Title: {document_title}

Content:
{excerpt}...

Please provide a concise summary of this document in 2-3 paragraphs, highlighting the main topics and key points.

Summary:"
    )
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
