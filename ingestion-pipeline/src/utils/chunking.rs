use common::{
    error::AppError,
    storage::types::{
        chunk::{Chunk, PageText},
        use_case::UseCase,
    },
};
use text_splitter::{ChunkConfig, TextSplitter};

/// Lines containing one of these close the current invoice section.
const INVOICE_KEYWORDS: [&str; 8] = [
    "invoice", "bill to", "vendor", "total", "tax", "gst", "amount", "payment",
];

/// Splits pages into chunks with the strategy of `use_case`, keeping page attribution.
pub fn chunk_pages(
    use_case: UseCase,
    pages: &[PageText],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, AppError> {
    match use_case {
        UseCase::Study => split_by_characters(pages, chunk_size, chunk_overlap),
        UseCase::Invoice => Ok(split_invoice_sections(pages)),
    }
}

fn split_by_characters(
    pages: &[PageText],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, AppError> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| AppError::Validation(format!("invalid chunking config: {e}")))?;
    let splitter = TextSplitter::new(config);

    Ok(pages
        .iter()
        .flat_map(|page| {
            splitter
                .chunks(&page.text)
                .map(|text| Chunk::new(text, page.page))
                .collect::<Vec<_>>()
        })
        .collect())
}

fn split_invoice_sections(pages: &[PageText]) -> Vec<Chunk> {
    let mut sections = Vec::new();

    for page in pages {
        let mut buffer = String::new();
        for line in page.text.lines() {
            buffer.push_str(line);
            buffer.push(' ');

            let lowered = line.to_lowercase();
            if INVOICE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                push_section(&mut sections, &buffer, page.page);
                buffer.clear();
            }
        }
        push_section(&mut sections, &buffer, page.page);
    }

    sections
}

fn push_section(sections: &mut Vec<Chunk>, buffer: &str, page: u32) {
    let text = buffer.trim();
    if !text.is_empty() {
        sections.push(Chunk::new(text, page));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, text: &str) -> PageText {
        PageText {
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn invoice_sections_close_on_keywords() {
        let pages = vec![page(
            1,
            "ACME Corp\nInvoice #42\nShip to: Dock 4\nBill To: Jane\nWidget x2\nTotal: 20 EUR\nThanks",
        )];

        let chunks = chunk_pages(UseCase::Invoice, &pages, 1000, 200).expect("chunks");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "ACME Corp Invoice #42",
                "Ship to: Dock 4 Bill To: Jane",
                "Widget x2 Total: 20 EUR",
                "Thanks",
            ]
        );
        assert!(chunks.iter().all(|c| c.page == 1));
    }

    #[test]
    fn invoice_sections_do_not_span_pages() {
        let pages = vec![page(1, "Header line"), page(2, "Amount due: 5")];
        let chunks = chunk_pages(UseCase::Invoice, &pages, 1000, 200).expect("chunks");
        assert_eq!(
            chunks,
            vec![Chunk::new("Header line", 1), Chunk::new("Amount due: 5", 2)]
        );
    }

    #[test]
    fn study_chunks_respect_size_and_keep_page() {
        let long_text = "Cells divide by mitosis. ".repeat(120);
        let pages = vec![page(1, "Short intro."), page(2, &long_text)];

        let chunks = chunk_pages(UseCase::Study, &pages, 1000, 200).expect("chunks");
        assert_eq!(chunks.first(), Some(&Chunk::new("Short intro.", 1)));
        assert!(chunks.len() > 3);
        assert!(chunks.iter().skip(1).all(|c| c.page == 2));
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 1000));
    }

    #[test]
    fn empty_pages_produce_no_chunks() {
        let pages = vec![page(1, ""), page(2, "   ")];
        assert!(chunk_pages(UseCase::Study, &pages, 1000, 200)
            .expect("chunks")
            .is_empty());
        assert!(chunk_pages(UseCase::Invoice, &pages, 1000, 200)
            .expect("chunks")
            .is_empty());
    }

    #[test]
    fn overlap_larger_than_size_is_rejected() {
        let pages = vec![page(1, "text")];
        assert!(matches!(
            chunk_pages(UseCase::Study, &pages, 100, 200),
            Err(AppError::Validation(_))
        ));
    }
}
