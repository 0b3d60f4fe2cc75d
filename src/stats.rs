//! Instruction statistics
//!
//! Text-based tally over generated assembly: every line that is not blank,
//! a comment, a directive or a bare label counts as an instruction; lines
//! whose leading mnemonic is a catalog key also count toward their category
//! and mnemonic. Padding and setup mnemonics outside the catalog (`nop`,
//! `j`, `lui`, `li`) only show up in the total. This is an approximation,
//! not a disassembler.

use crate::isa::{Catalog, Category};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Counts derived from an assembly text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// All instruction lines
    pub total_instructions: usize,
    /// Per-category counts of catalog-recognized lines (every category
    /// present, zero or not)
    pub instruction_types: BTreeMap<String, usize>,
    /// Per-mnemonic counts of catalog-recognized lines
    pub instruction_breakdown: BTreeMap<String, usize>,
}

impl Statistics {
    /// Tally `text` against `catalog`.
    pub fn from_text(text: &str, catalog: &Catalog) -> Self {
        let mut stats = Statistics {
            instruction_types: Category::ALL
                .iter()
                .map(|c| (c.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        };

        for line in text.lines().filter_map(instruction_line) {
            stats.total_instructions += 1;

            let Some(mnemonic) = line.split_whitespace().next() else {
                continue;
            };
            if let Some(entry) = catalog.get(mnemonic) {
                *stats
                    .instruction_types
                    .entry(entry.template.category.as_str().to_string())
                    .or_insert(0) += 1;
                *stats
                    .instruction_breakdown
                    .entry(mnemonic.to_string())
                    .or_insert(0) += 1;
            }
        }

        stats
    }

    /// Lines that contributed to a category
    pub fn recognized(&self) -> usize {
        self.instruction_types.values().sum()
    }

    pub fn category_count(&self, category: Category) -> usize {
        self.instruction_types
            .get(category.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Percentage of all instruction lines in `category`
    pub fn percentage(&self, category: Category) -> f64 {
        if self.total_instructions == 0 {
            return 0.0;
        }
        self.category_count(category) as f64 / self.total_instructions as f64 * 100.0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instruction Type Distribution:")?;
        for category in Category::ALL {
            writeln!(
                f,
                "  {:15}: {:4} ({:5.1}%)",
                category.as_str(),
                self.category_count(category),
                self.percentage(category)
            )?;
        }
        write!(f, "  {:15}: {:4}", "total", self.total_instructions)
    }
}

/// Trimmed line if it is an instruction line
fn instruction_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('.') || line.ends_with(':') {
        None
    } else {
        Some(line)
    }
}
