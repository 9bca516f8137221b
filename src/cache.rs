//! Memoized pipeline runs keyed by input content and full configuration.
use log::debug;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{self, PipelineOutput};
use crate::types::RawTable;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content: String,
    pub config: String,
}

fn sha256_of<T: Serialize>(value: &T) -> Result<String, PipelineError> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl CacheKey {
    /// Every config field takes part in the key, so any changed threshold
    /// or floor misses.
    pub fn new(table: &RawTable, config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            content: sha256_of(table)?,
            config: sha256_of(config)?,
        })
    }
}

#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: HashMap<CacheKey, Arc<PipelineOutput>>,
    hits: usize,
    misses: usize,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_run(
        &mut self,
        table: &RawTable,
        config: &PipelineConfig,
    ) -> Result<Arc<PipelineOutput>, PipelineError> {
        let key = CacheKey::new(table, config)?;
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            debug!("Pipeline cache hit ({}..)", &key.content[..12]);
            return Ok(Arc::clone(hit));
        }
        self.misses += 1;
        let output = Arc::new(pipeline::run(table, config)?);
        self.entries.insert(key, Arc::clone(&output));
        Ok(output)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
