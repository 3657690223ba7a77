use prometheus::{IntCounterVec, Opts, Registry};

use crate::cache::Lookup;
use crate::error::Result;

#[derive(Clone)]
pub struct CacheMetrics {
    pub lookups: IntCounterVec,
}

impl CacheMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let ret = Self {
            lookups: IntCounterVec::new(
                Opts::new(
                    "record_cache_lookups_total",
                    "Record cache lookups by outcome",
                ),
                &["result"],
            )?,
        };

        registry.register(Box::new(ret.lookups.clone()))?;

        Ok(ret)
    }

    pub fn record_lookup(&self, lookup: Lookup) {
        self.lookups.with_label_values(&[lookup.as_label()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_are_counted_per_outcome() {
        let registry = Registry::new();
        let metrics = CacheMetrics::new(&registry).unwrap();
        metrics.record_lookup(Lookup::Hit);
        metrics.record_lookup(Lookup::Hit);
        metrics.record_lookup(Lookup::Stale);

        assert_eq!(metrics.lookups.with_label_values(&["hit"]).get(), 2);
        assert_eq!(metrics.lookups.with_label_values(&["stale"]).get(), 1);
        assert_eq!(metrics.lookups.with_label_values(&["miss"]).get(), 0);
    }
}
