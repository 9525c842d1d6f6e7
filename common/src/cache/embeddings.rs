use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    error::AppError, storage::types::use_case::UseCase, utils::embedding::Embedder,
};

use super::{
    fingerprint::chunk_fingerprint,
    keys,
    store::{get_json, set_json, CacheStore},
};

/// Memoizes embedding vectors per normalized chunk text.
///
/// Entries never expire; the model tag in the key isolates vectors produced by
/// different embedding models.
#[derive(Clone)]
pub struct EmbeddingCache {
    store: Arc<dyn CacheStore>,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn get_embedding(
        &self,
        use_case: UseCase,
        model_tag: &str,
        fingerprint: &str,
    ) -> Option<Vec<f32>> {
        let key = keys::embedding(use_case, model_tag, fingerprint);
        match get_json(self.store.as_ref(), &key).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(%use_case, error = %err, "Embedding cache read failed; treating as miss");
                None
            }
        }
    }

    pub async fn put_embedding(
        &self,
        use_case: UseCase,
        model_tag: &str,
        fingerprint: &str,
        vector: &[f32],
    ) {
        let key = keys::embedding(use_case, model_tag, fingerprint);
        if let Err(err) = set_json(self.store.as_ref(), &key, &vector, None).await {
            warn!(%use_case, error = %err, "Embedding cache write failed");
        }
    }

    /// Returns one vector per input text, computing only the uncached ones.
    ///
    /// Cached vectors are read in a single batch. Texts that share a
    /// fingerprint are sent to the embedder once.
    pub async fn resolve(
        &self,
        use_case: UseCase,
        texts: &[String],
        embedder: &dyn Embedder,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model_tag = embedder.model_tag();
        let fingerprints: Vec<String> = texts.iter().map(|t| chunk_fingerprint(t)).collect();
        let cached = match fingerprints.as_slice() {
            [fingerprint] => vec![self.get_embedding(use_case, &model_tag, fingerprint).await],
            _ => self.get_many_embeddings(use_case, &model_tag, &fingerprints).await,
        };

        let mut resolved: HashMap<&str, Vec<f32>> = fingerprints
            .iter()
            .zip(cached)
            .filter_map(|(fingerprint, vector)| Some((fingerprint.as_str(), vector?)))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending: Vec<(&str, &String)> = Vec::new();
        for (fingerprint, text) in fingerprints.iter().zip(texts) {
            let fingerprint = fingerprint.as_str();
            if !resolved.contains_key(fingerprint) && seen.insert(fingerprint) {
                pending.push((fingerprint, text));
            }
        }

        debug!(
            %use_case,
            total = texts.len(),
            hits = texts.len().saturating_sub(pending.len()),
            computed = pending.len(),
            "Resolved embedding cache"
        );

        if !pending.is_empty() {
            let inputs: Vec<String> = pending.iter().map(|(_, text)| (*text).clone()).collect();
            let vectors = embedder.embed_batch(inputs).await?;
            if vectors.len() != pending.len() {
                return Err(AppError::Upstream(format!(
                    "embedder returned {} vectors for {} inputs",
                    vectors.len(),
                    pending.len()
                )));
            }

            for (&(fingerprint, _), vector) in pending.iter().zip(vectors) {
                self.put_embedding(use_case, &model_tag, fingerprint, &vector)
                    .await;
                resolved.insert(fingerprint, vector);
            }
        }

        fingerprints
            .iter()
            .map(|fp| {
                resolved.get(fp.as_str()).cloned().ok_or_else(|| {
                    AppError::InternalError(format!("embedding for chunk {fp} was not resolved"))
                })
            })
            .collect()
    }

    /// Reads cached vectors for `fingerprints` in one store round trip.
    async fn get_many_embeddings(
        &self,
        use_case: UseCase,
        model_tag: &str,
        fingerprints: &[String],
    ) -> Vec<Option<Vec<f32>>> {
        let cache_keys: Vec<String> = fingerprints
            .iter()
            .map(|fp| keys::embedding(use_case, model_tag, fp))
            .collect();

        let raw_values = match self.store.get_many(&cache_keys).await {
            Ok(values) => values,
            Err(err) => {
                warn!(%use_case, error = %err, "Embedding cache batch read failed; computing all");
                return vec![None; cache_keys.len()];
            }
        };

        raw_values
            .into_iter()
            .map(|raw| {
                serde_json::from_str::<Vec<f32>>(&raw?)
                    .inspect_err(|err| warn!(error = %err, "Discarding undecodable cached embedding"))
                    .ok()
            })
            .collect()
    }
}
