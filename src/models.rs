//! Wire and domain types exchanged with the answering service.
//!
//! These types are both the JSON shapes on the wire and the values the
//! controller holds, so a successful response is parsed straight into a
//! [`QueryResult`] without an intermediate DTO.

use serde::{Deserialize, Serialize};

/// Number of passages requested per query.
pub const TOP_K: u32 = 5;

/// Body of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: u32,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: TOP_K,
        }
    }
}

/// One retrieved passage offered as evidence for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub document_name: String,
    /// Identifier of the passage within its document.
    pub chunk_id: String,
    #[serde(default)]
    pub text_content: String,
    /// File-format label such as `"pdf"` or `"csv"`.
    #[serde(default)]
    pub document_type: String,
    /// Present only for page-paginated documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl Source {
    /// Display label: the document name, plus `(page N)` when known.
    pub fn label(&self) -> String {
        match self.page_number {
            Some(page) => format!("{} (page {})", self.document_name, page),
            None => self.document_name.clone(),
        }
    }
}

/// A generated answer together with its relevance-ranked sources.
///
/// `sources` keeps the order the service returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
