use common::{cache::retrieval::RetrievedChunk, storage::types::use_case::UseCase};

pub const STUDY_FALLBACK: &str = "The document does not contain this information.";

pub static STUDY_SYSTEM_PROMPT: &str = r#"You are a study assistant that answers questions about one uploaded document.

Rules:
1. Use only facts stated explicitly in the document context you are given.
2. Never draw on outside knowledge, general background or your own assumptions.
3. If the context does not fully answer the question, reply exactly:
   "The document does not contain this information."
4. Never give partial answers or guesses.
5. Cite page numbers from the context when they are available.

Answer directly and concisely. Quote or closely paraphrase the context."#;

pub static INVOICE_SYSTEM_PROMPT: &str = r#"You extract fields from one uploaded invoice.

Rules:
1. Report only fields and values that appear literally in the document context.
2. Never infer, calculate or estimate a value, and never assume default terms.
3. For every requested field:
   - if present, give the exact value as written in the document
   - if absent, write "Not found"
4. Do not rely on knowledge of typical invoice layouts.

Format each line as "Field: Value" or "Field: Not found". Keep numbers and
text exactly as written and include the page reference when available."#;

pub fn system_prompt(use_case: UseCase) -> &'static str {
    match use_case {
        UseCase::Study => STUDY_SYSTEM_PROMPT,
        UseCase::Invoice => INVOICE_SYSTEM_PROMPT,
    }
}

/// Renders retrieved chunks as `[Page n] text` blocks separated by blank lines.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[Page {}] {}", chunk.page, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn create_user_message(context: &str, question: &str) -> String {
    format!(
        r"Document context:
==================
{context}
==================

Question:
{question}"
    )
}
