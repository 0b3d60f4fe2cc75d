//! Weighted instruction selection
//!
//! The pool gives each template an integer count of
//! `floor(base × category multiplier × extension multiplier × 10)` and draws
//! templates with probability proportional to that count. The draw is a
//! cumulative-weight binary search over the templates rather than a list of
//! repeated keys, so memory is O(templates) and draws are O(log templates).
//! Templates whose count is 0 are excluded for the run.

use crate::config::Distribution;
use crate::isa::{Catalog, CatalogEntry, Category, InstructionTemplate};
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;
use thiserror::Error;

/// Resolution of the weight quantization (counts per unit of weight)
pub const WEIGHT_SCALE: f64 = 10.0;

/// Pool construction errors.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Every template's effective weight rounds to zero; nothing to draw from")]
    Empty,

    #[error("Total pool weight overflows")]
    Overflow,
}

/// Quantized count of one template for a distribution.
pub fn effective_count(
    template: &InstructionTemplate,
    distribution: &Distribution,
    extension_weight: f64,
) -> u64 {
    let mut type_weight = distribution.multiplier(template.category);
    if template.category.is_extension() {
        type_weight *= extension_weight;
    }
    let weight = template.weight * type_weight;
    // float → int casts saturate, and weights are validated non-negative
    (weight * WEIGHT_SCALE).floor() as u64
}

/// A template that made it into the pool
#[derive(Debug, Clone, Copy)]
pub struct PoolSlot {
    pub entry: CatalogEntry,
    pub count: u64,
}

/// Weighted sampler over catalog templates, built once per run
#[derive(Debug, Clone)]
pub struct WeightedPool {
    slots: Vec<PoolSlot>,
    sampler: WeightedIndex<u64>,
    total: u64,
}

impl WeightedPool {
    /// Build the pool. Fails when every count rounds to zero.
    pub fn build(
        catalog: &Catalog,
        distribution: &Distribution,
        extension_weight: f64,
    ) -> Result<Self, PoolError> {
        let slots: Vec<PoolSlot> = catalog
            .entries()
            .iter()
            .map(|entry| PoolSlot {
                entry: *entry,
                count: effective_count(&entry.template, distribution, extension_weight),
            })
            .filter(|slot| slot.count > 0)
            .collect();

        if slots.is_empty() {
            return Err(PoolError::Empty);
        }

        let total = slots
            .iter()
            .try_fold(0u64, |acc, slot| acc.checked_add(slot.count))
            .ok_or(PoolError::Overflow)?;
        // every count is positive, so the sampler only fails on an empty pool
        let sampler = WeightedIndex::new(slots.iter().map(|slot| slot.count))
            .map_err(|_| PoolError::Empty)?;

        tracing::debug!(
            templates = slots.len(),
            excluded = catalog.len() - slots.len(),
            total,
            "built weighted pool"
        );

        Ok(Self {
            slots,
            sampler,
            total,
        })
    }

    /// Draw one template.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &CatalogEntry {
        &self.slots[self.sampler.sample(rng)].entry
    }

    pub fn slots(&self) -> &[PoolSlot] {
        &self.slots
    }

    /// Count of a template, 0 when excluded
    pub fn count(&self, key: &str) -> u64 {
        self.slots
            .iter()
            .find(|slot| slot.entry.template.key == key)
            .map_or(0, |slot| slot.count)
    }

    /// Sum of all counts (the length of the equivalent repeated-key list)
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Expected fraction of draws that land in `category`
    pub fn share(&self, category: Category) -> f64 {
        let in_category: u64 = self
            .slots
            .iter()
            .filter(|slot| slot.entry.template.category == category)
            .map(|slot| slot.count)
            .sum();
        in_category as f64 / self.total as f64
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
