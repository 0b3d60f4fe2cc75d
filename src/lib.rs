//! cvgen - Pseudo-random CV32E40P assembly stimulus generator
//!
//! Produces RISC-V assembly programs for the CV32E40P core with a tunable
//! mix of instruction categories, forced branch outcomes and deliberately
//! misaligned memory accesses. Output is plain assembler text meant to be
//! fed to a simulator or verification environment.
//!
//! # Example
//!
//! ```rust
//! use cvgen::{Category, Distribution, GeneratorConfig};
//!
//! let config = GeneratorConfig::new(50)
//!     .with_seed(42)
//!     .with_distribution(Distribution::new().with(Category::Branch, 4.0))
//!     .with_branch_taken_rate(1.0);
//!
//! let text = cvgen::generate(config).unwrap();
//! assert!(text.starts_with("# CV32E40P Assembly Test Program"));
//! assert!(text.ends_with('\n'));
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌────────────────┐
//! │   Catalog     │──▶│  WeightedPool  │  counts = floor(w × mult × 10)
//! └───────────────┘   └───────┬────────┘
//!                             │ draw
//!                             ▼
//! ┌───────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ Synthesizers  │──▶│   Generator    │◀──│ LabelManager │
//! └───────────────┘   └───────┬────────┘   └──────────────┘
//!                             │
//!                             ▼
//!                     ┌────────────────┐   ┌──────────────┐
//!                     │    Program     │──▶│  Statistics  │
//!                     └────────────────┘   └──────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod isa;
pub mod label;
pub mod select;
pub mod stats;
pub mod stream;
pub mod synth;

// Re-export commonly used types
pub use config::{ConfigError, CvgenConfig, Distribution, GeneratorConfig, Preset};
pub use isa::{BranchKind, Catalog, CatalogError, Category, InstructionTemplate, Register};
pub use label::LabelManager;
pub use select::{PoolError, WeightedPool};
pub use stats::Statistics;
pub use stream::{GenError, Generator, HazardPadding, PaddingKind, Program};
pub use synth::MemoryWindow;

/// Generate one program over the built-in catalog and return its text.
pub fn generate(config: GeneratorConfig) -> Result<String, GenError> {
    Ok(Generator::new(config)?.generate().into_text())
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_reproducible() {
        let config = GeneratorConfig::new(200).with_seed(11);
        let first = generate(config.clone()).unwrap();
        let second = generate(config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_reports_config_errors() {
        let config = GeneratorConfig::new(10).with_extension_weight(f64::INFINITY);
        assert!(matches!(generate(config), Err(GenError::Config(_))));
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
