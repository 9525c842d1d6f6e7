use crate::stored_object;

stored_object!(IndexedChunk, "indexed_chunk", {
    /// Vector index partition, `{use_case}:{document_id}`
    namespace: String,
    document_id: String,
    text: String,
    page: u32,
    /// Location of the file the chunk was extracted from
    source: String,
    embedding: Vec<f32>
});

impl IndexedChunk {
    pub fn new(
        id: String,
        namespace: String,
        document_id: String,
        text: String,
        page: u32,
        source: String,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            created_at: now,
            updated_at: now,
            namespace,
            document_id,
            text,
            page,
            source,
            embedding,
        }
    }
}
