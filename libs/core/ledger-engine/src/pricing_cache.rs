// [libs/core/ledger-engine/src/pricing_cache.rs]
//! In-memory `(model, provider) -> ModelPricing` cache. Single-writer,
//! lock-free reads: `dashmap` gives us sharded, uncontended reads without
//! a `RwLock` guarding the whole table.

use dashmap::DashMap;
use grainledger_models::ModelPricing;

#[derive(Default)]
pub struct PricingCache {
    entries: DashMap<String, ModelPricing>,
}

impl PricingCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, model: &str, provider: &str) -> Option<ModelPricing> {
        self.entries.get(&ModelPricing::cache_key(model, provider)).map(|entry| entry.clone())
    }

    pub fn insert(&self, pricing: ModelPricing) {
        let key = ModelPricing::cache_key(&pricing.model, &pricing.provider);
        self.entries.insert(key, pricing);
    }

    pub fn bulk_load(&self, rows: Vec<ModelPricing>) {
        for row in rows {
            self.insert(row);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(model: &str, provider: &str) -> ModelPricing {
        ModelPricing {
            model: model.to_string(),
            provider: provider.to_string(),
            input_per_million_grains: 500_000,
            output_per_million_grains: 1_500_000,
            effective_from: Utc::now(),
            effective_until: None,
        }
    }

    #[test]
    fn miss_then_hit_after_insert() {
        let cache = PricingCache::new();
        assert!(cache.get("gpt-5", "openai").is_none());
        cache.insert(sample("gpt-5", "openai"));
        assert!(cache.get("gpt-5", "openai").is_some());
    }

    #[test]
    fn distinct_providers_do_not_collide() {
        let cache = PricingCache::new();
        cache.insert(sample("claude", "anthropic"));
        cache.insert(sample("claude", "bedrock"));
        assert_eq!(cache.len(), 2);
    }
}
