use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{debug, info};

use common::{
    error::AppError,
    storage::{store::StorageManager, types::chunk::PageText},
};

/// Turns a document source into its pages of text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// `source` is either an `http(s)` URL or an object storage location.
    async fn load(&self, source: &str) -> Result<Vec<PageText>, AppError>;
}

/// Loads PDFs from object storage or over HTTP and extracts the text layer per page.
pub struct PdfLoader {
    storage: StorageManager,
    http: reqwest::Client,
}

impl PdfLoader {
    pub fn new(storage: StorageManager, fetch_timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self { storage, http })
    }

    async fn fetch_remote(&self, url: &str) -> Result<Bytes, AppError> {
        let retry_strategy = ExponentialBackoff::from_millis(100).map(jitter).take(2);

        let response = RetryIf::spawn(
            retry_strategy,
            || async { self.http.get(url).send().await?.error_for_status() },
            |err: &reqwest::Error| err.is_connect(),
        )
        .await
        .map_err(|err| AppError::Extraction(format!("failed to fetch {url}: {err}")))?;

        response
            .bytes()
            .await
            .map_err(|err| AppError::Extraction(format!("failed to read body of {url}: {err}")))
    }

    async fn read_source(&self, source: &str) -> Result<Bytes, AppError> {
        if is_remote(source) {
            self.fetch_remote(source).await
        } else {
            self.storage
                .get(source)
                .await
                .map_err(|err| AppError::Extraction(format!("failed to read {source}: {err}")))
        }
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, source: &str) -> Result<Vec<PageText>, AppError> {
        let pdf_bytes = self.read_source(source).await?;
        debug!(source, bytes = pdf_bytes.len(), "Loaded PDF bytes");

        let pages = extract_pages(pdf_bytes).await?;
        let total_chars: usize = pages.iter().map(|p| p.text.chars().count()).sum();
        info!(
            source,
            pages = pages.len(),
            total_chars,
            "Extracted text from PDF"
        );
        Ok(pages)
    }
}

fn is_remote(source: &str) -> bool {
    url::Url::parse(source)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Runs `pdf-extract` off the async executor and numbers pages from 1.
pub async fn extract_pages(pdf_bytes: Bytes) -> Result<Vec<PageText>, AppError> {
    let raw_pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&pdf_bytes)
    })
    .await
    .map_err(|err| AppError::Extraction(format!("PDF extraction task failed: {err}")))?
    .map_err(|err| AppError::Extraction(format!("Failed to extract text from PDF: {err}")))?;

    Ok(number_pages(raw_pages))
}

fn number_pages(raw_pages: Vec<String>) -> Vec<PageText> {
    (1_u32..)
        .zip(raw_pages)
        .map(|(page, text)| PageText {
            page,
            text: text.trim().to_string(),
        })
        .collect()
}
