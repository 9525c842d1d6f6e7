//! The flat key scheme shared by every cache consumer.

use super::fingerprint::{normalize_question, query_fingerprint};
use crate::storage::types::use_case::UseCase;

pub fn ingestion_state(document_id: &str) -> String {
    format!("ingest:{document_id}")
}

pub fn content_dedup(use_case: UseCase, content_fingerprint: &str) -> String {
    format!("pdf:hash:{use_case}:{content_fingerprint}")
}

/// `model_tag` pins entries to the embedding model that produced them.
pub fn embedding(use_case: UseCase, model_tag: &str, chunk_fingerprint: &str) -> String {
    format!("{use_case}:embed:{model_tag}:{chunk_fingerprint}")
}

pub fn retrieval(use_case: UseCase, document_id: &str, question: &str) -> String {
    format!(
        "{use_case}:retrieval:{document_id}:{}",
        normalize_question(question)
    )
}

pub fn answer(document_id: &str, question: &str) -> String {
    format!("query:{document_id}:{}", query_fingerprint(question))
}

pub fn document(document_id: &str) -> String {
    format!("doc:{document_id}")
}

/// Vector index partition for one document under one use-case.
pub fn vector_namespace(use_case: UseCase, document_id: &str) -> String {
    format!("{use_case}:{document_id}")
}
