//! Cached data manager for the report runtime.
//!
//! Wraps source acquisition, decoding and event derivation behind a
//! content-keyed cache. Callers use [`DataManager::load`] to obtain a
//! fresh-or-cached [`Dataset`] for a source.

use std::sync::Arc;

use dwell_core::error::Result;
use dwell_core::models::{ColumnMapping, DateRange, Event};
use dwell_core::settings::SourceLocation;
use dwell_core::time_utils::TimezoneHandler;
use dwell_data::{Derivation, DerivationStats, EventDeriver, MonthlyAggregator};

use crate::cache::{DerivationCache, SourceKey};
use crate::source::RawSource;

// ── Dataset ───────────────────────────────────────────────────────────────────

/// Derived, read-only view of one source.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub events: Vec<Event>,
    /// Distinct site names across all events, sorted.
    pub sites: Vec<String>,
    /// Earliest and latest end date, `None` when there are no events.
    pub bounds: Option<DateRange>,
    pub stats: DerivationStats,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Derivation> for Dataset {
    fn from(d: Derivation) -> Self {
        Self {
            sites: MonthlyAggregator::available_sites(&d.events),
            bounds: MonthlyAggregator::date_bounds(&d.events),
            events: d.events,
            stats: d.stats,
        }
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// Cached wrapper around acquisition and derivation.
///
/// # Example
/// ```no_run
/// use dwell_core::models::ColumnMapping;
/// use dwell_core::settings::SourceLocation;
/// use dwell_core::time_utils::TimezoneHandler;
/// use dwell_runtime::data_manager::DataManager;
///
/// # async fn run() -> dwell_core::error::Result<()> {
/// let mut mgr = DataManager::new(ColumnMapping::default(), TimezoneHandler::default());
/// let dataset = mgr.load(&SourceLocation::Path("export.jsonl".into())).await?;
/// println!("{} events across {} sites", dataset.events.len(), dataset.sites.len());
/// # Ok(())
/// # }
/// ```
pub struct DataManager {
    deriver: EventDeriver,
    timezone: TimezoneHandler,
    cache: DerivationCache,
}

impl DataManager {
    pub fn new(mapping: ColumnMapping, timezone: TimezoneHandler) -> Self {
        Self {
            deriver: EventDeriver::new(mapping).with_timezone(timezone),
            timezone,
            cache: DerivationCache::new(),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Acquire `location` and return its dataset, reusing a cached
    /// derivation when the bytes are unchanged.
    pub async fn load(&mut self, location: &SourceLocation) -> Result<Arc<Dataset>> {
        let source = RawSource::acquire(location).await?;
        self.load_source(&source)
    }

    /// Derive (or fetch from cache) the dataset for already-acquired bytes.
    ///
    /// Fails with a schema error when a mapped column is absent; no partial
    /// dataset is cached in that case.
    pub fn load_source(&mut self, source: &RawSource) -> Result<Arc<Dataset>> {
        let key = SourceKey::compute(source, self.deriver.mapping(), self.timezone.name());
        let deriver = &self.deriver;

        let dataset = self.cache.get_or_try_insert_with(key, || {
            let table = source.decode()?;
            let derivation = deriver.derive(&table)?;
            Ok(Dataset::from(derivation))
        })?;

        tracing::debug!(
            %key,
            bytes = source.byte_len(),
            events = dataset.events.len(),
            sites = dataset.sites.len(),
            "dataset ready"
        );
        Ok(dataset)
    }

    pub fn cache(&self) -> &DerivationCache {
        &self.cache
    }

    /// Discard all cached derivations.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
