//! Content-keyed memo of derived datasets.
//!
//! Repeated runs over the same bytes, column mapping and timezone reuse the
//! earlier derivation instead of re-parsing. Entries are never evicted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dwell_core::error::Result;
use dwell_core::models::ColumnMapping;
use sha2::{Digest, Sha256};

use crate::data_manager::Dataset;
use crate::source::RawSource;

// ── SourceKey ─────────────────────────────────────────────────────────────────

/// SHA-256 over everything that influences a derivation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey([u8; 32]);

impl SourceKey {
    pub fn compute(source: &RawSource, mapping: &ColumnMapping, timezone: &str) -> Self {
        let mut hasher = Sha256::new();
        // Length prefixes keep adjacent fields from running together.
        for field in [
            mapping.started.as_bytes(),
            mapping.ended.as_bytes(),
            mapping.site_name.as_bytes(),
            timezone.as_bytes(),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        for part in &source.parts {
            let tag: u8 = match part.format {
                None => 0,
                Some(dwell_data::reader::TableFormat::Json) => 1,
                Some(dwell_data::reader::TableFormat::JsonLines) => 2,
                Some(dwell_data::reader::TableFormat::Csv) => 3,
                Some(dwell_data::reader::TableFormat::Xlsx) => 4,
            };
            hasher.update([tag]);
            hasher.update((part.bytes.len() as u64).to_le_bytes());
            hasher.update(&part.bytes);
        }
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for SourceKey {
    /// Short form for log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

// ── DerivationCache ───────────────────────────────────────────────────────────

/// Unbounded insert-if-absent map from [`SourceKey`] to a derived dataset.
#[derive(Debug, Default)]
pub struct DerivationCache {
    entries: HashMap<SourceKey, Arc<Dataset>>,
    hits: u64,
    misses: u64,
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `key`, or compute and store it.
    ///
    /// A failing `compute` leaves the cache untouched.
    pub fn get_or_try_insert_with<F>(&mut self, key: SourceKey, compute: F) -> Result<Arc<Dataset>>
    where
        F: FnOnce() -> Result<Dataset>,
    {
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            tracing::debug!(%key, "derivation cache hit");
            return Ok(Arc::clone(hit));
        }

        self.misses += 1;
        tracing::debug!(%key, "derivation cache miss");
        let dataset = Arc::new(compute()?);
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn contains(&self, key: &SourceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every entry; counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        tracing::debug!("derivation cache cleared");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
