use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    #[default]
    FastEmbed,
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub http_port: u16,
    #[serde(default)]
    pub cache_backend: CacheBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default)]
    pub flush_cache_on_startup: bool,
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_ingest_max_body_bytes")]
    pub ingest_max_body_bytes: usize,
    #[serde(default = "default_ingestion_workers")]
    pub ingestion_workers: usize,
    #[serde(default = "default_ingestion_queue_capacity")]
    pub ingestion_queue_capacity: usize,
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    #[serde(default = "default_answer_ttl_secs")]
    pub answer_ttl_secs: u64,
    #[serde(default = "default_retrieval_ttl_secs")]
    pub retrieval_ttl_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Comma separated list of origins allowed by the CORS layer.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_dimensions() -> u32 {
    384
}

fn default_ingest_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_ingestion_workers() -> usize {
    2
}

fn default_ingestion_queue_capacity() -> usize {
    64
}

fn default_dedup_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_answer_ttl_secs() -> u64 {
    60 * 60
}

fn default_retrieval_ttl_secs() -> u64 {
    15 * 60
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

fn default_retrieval_top_k() -> usize {
    5
}

fn default_chunk_size() -> usize {
    1_000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_cors_allowed_origins() -> String {
    "http://localhost:5173,http://127.0.0.1:5173".to_string()
}

impl AppConfig {
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8000,
            cache_backend: CacheBackend::default(),
            redis_url: default_redis_url(),
            flush_cache_on_startup: false,
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            generation_model: default_generation_model(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: None,
            embedding_dimensions: default_embedding_dimensions(),
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "docqa".to_string(),
            surrealdb_database: "docqa".to_string(),
            data_dir: default_data_dir(),
            storage: default_storage_kind(),
            ingest_max_body_bytes: default_ingest_max_body_bytes(),
            ingestion_workers: default_ingestion_workers(),
            ingestion_queue_capacity: default_ingestion_queue_capacity(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            answer_ttl_secs: default_answer_ttl_secs(),
            retrieval_ttl_secs: default_retrieval_ttl_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            retrieval_top_k: default_retrieval_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            cors_allowed_origins: default_cors_allowed_origins(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
