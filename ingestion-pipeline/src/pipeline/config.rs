use common::utils::config::AppConfig;

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: IngestionTuning {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
            },
        }
    }
}
