pub mod chunking;
pub mod pdf_ingestion;
