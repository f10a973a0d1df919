use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::Result;

use super::loader;
use super::model::Table;
use crate::config::LoadConfig;

/// Tables kept before the least recently used one is dropped.
pub const DEFAULT_CAPACITY: usize = 4;

/// Loaded tables keyed by their load parameters.  A hit never touches the
/// file; failed loads are not remembered.  At most `capacity` tables are
/// held, evicting the least recently used.
#[derive(Debug)]
pub struct TableCache {
    entries: HashMap<LoadConfig, Arc<Table>>,
    /// Keys from least to most recently used.
    order: VecDeque<LoadConfig>,
    capacity: usize,
}

impl Default for TableCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Return the cached table for `config`, loading it from disk on a miss.
    pub fn get_or_load(&mut self, config: &LoadConfig) -> Result<Arc<Table>> {
        self.get_or_load_with(config, loader::load)
    }

    /// Like [`get_or_load`](Self::get_or_load) with a custom loader.
    pub fn get_or_load_with<F>(&mut self, config: &LoadConfig, load: F) -> Result<Arc<Table>>
    where
        F: FnOnce(&LoadConfig) -> Result<Table>,
    {
        if let Some(table) = self.entries.get(config).cloned() {
            log::debug!("cache hit for {}", config.path.display());
            self.forget_order(config);
            self.order.push_back(config.clone());
            return Ok(table);
        }
        let table = Arc::new(load(config)?);
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            log::debug!("evicting {} from cache", oldest.path.display());
            self.entries.remove(&oldest);
        }
        self.entries.insert(config.clone(), Arc::clone(&table));
        self.order.push_back(config.clone());
        Ok(table)
    }

    /// Forget one entry so the next request re-reads the file.
    pub fn invalidate(&mut self, config: &LoadConfig) -> bool {
        self.forget_order(config);
        self.entries.remove(config).is_some()
    }

    pub fn contains(&self, config: &LoadConfig) -> bool {
        self.entries.contains_key(config)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn forget_order(&mut self, config: &LoadConfig) {
        self.order.retain(|k| k != config);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use super::*;

    fn cfg(path: &str, header_row: usize) -> LoadConfig {
        LoadConfig {
            path: PathBuf::from(path),
            header_row,
            sheet: None,
        }
    }

    #[test]
    fn loads_once_per_key() {
        let calls = Cell::new(0);
        let counting = |_: &LoadConfig| {
            calls.set(calls.get() + 1);
            Ok(Table::default())
        };

        let mut cache = TableCache::new();
        let a = cache.get_or_load_with(&cfg("pnl.xlsx", 0), counting).unwrap();
        let b = cache.get_or_load_with(&cfg("pnl.xlsx", 0), counting).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&a, &b));

        // A different header row is a different key.
        cache.get_or_load_with(&cfg("pnl.xlsx", 1), counting).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_forces_reload() {
        let calls = Cell::new(0);
        let counting = |_: &LoadConfig| {
            calls.set(calls.get() + 1);
            Ok(Table::default())
        };

        let mut cache = TableCache::new();
        let key = cfg("pnl.xlsx", 0);
        cache.get_or_load_with(&key, counting).unwrap();
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        cache.get_or_load_with(&key, counting).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = TableCache::new();
        let key = cfg("missing.xlsx", 0);
        let err = cache.get_or_load_with(&key, |_| anyhow::bail!("boom"));
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok = cache.get_or_load_with(&key, |_| Ok(Table::default()));
        assert!(ok.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = TableCache::with_capacity(2);
        let load = |_: &LoadConfig| Ok(Table::default());
        cache.get_or_load_with(&cfg("pnl.xlsx", 0), load).unwrap();
        cache.get_or_load_with(&cfg("pnl.xlsx", 1), load).unwrap();
        // Touch row 0 so row 1 becomes the oldest.
        cache.get_or_load_with(&cfg("pnl.xlsx", 0), load).unwrap();
        cache.get_or_load_with(&cfg("pnl.xlsx", 2), load).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&cfg("pnl.xlsx", 0)));
        assert!(!cache.contains(&cfg("pnl.xlsx", 1)));
        assert!(cache.contains(&cfg("pnl.xlsx", 2)));
    }

    #[test]
    fn scrubbing_header_rows_stays_bounded() {
        let mut cache = TableCache::new();
        for row in 0..=100 {
            cache
                .get_or_load_with(&cfg("pnl.xlsx", row), |_| Ok(Table::default()))
                .unwrap();
        }
        assert_eq!(cache.len(), DEFAULT_CAPACITY);
        assert!(cache.contains(&cfg("pnl.xlsx", 100)));
        assert!(!cache.contains(&cfg("pnl.xlsx", 0)));
    }
}
