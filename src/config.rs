//! Generator Configuration
//!
//! Run parameters, category distributions and presets, and parsing of
//! `cvgen.toml` run profiles and JSON distribution files.

use crate::isa::Category;
use crate::stream::PaddingKind;
use crate::synth::MemoryWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Name of the run profile searched for by [`CvgenConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "cvgen.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write profile: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to parse distribution: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Instruction count must be positive")]
    InvalidCount,

    #[error("Category {category} has invalid multiplier {weight}")]
    InvalidMultiplier { category: String, weight: f64 },

    #[error("Extension weight must be a non-negative number, got {0}")]
    InvalidExtensionWeight(f64),

    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("Invalid memory window (base {base:#x}, size {size:#x}): {reason}")]
    InvalidMemoryWindow {
        base: u32,
        size: u32,
        reason: &'static str,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Per-category weight multipliers. Categories absent from the map weigh
/// 1.0; names that are not categories are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution {
    weights: BTreeMap<String, f64>,
}

impl Distribution {
    /// Empty distribution: every category weighs 1.0
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, category: Category, weight: f64) -> Self {
        self.set(category.as_str(), weight);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, weight: f64) {
        self.weights.insert(name.into(), weight);
    }

    /// Multiplier for a category (1.0 when absent)
    pub fn multiplier(&self, category: Category) -> f64 {
        self.weights.get(category.as_str()).copied().unwrap_or(1.0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Reject negative or non-finite multipliers. Unknown names are logged
    /// and ignored.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, &weight) in &self.weights {
            if Category::from_name(name).is_none() {
                tracing::warn!(category = %name, "ignoring unknown category in distribution");
                continue;
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidMultiplier {
                    category: name.clone(),
                    weight,
                });
            }
        }
        Ok(())
    }

    /// Parse a JSON object of `category: multiplier` pairs.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let distribution: Distribution = serde_json::from_str(content)?;
        distribution.validate()?;
        Ok(distribution)
    }

    /// Load a JSON distribution file.
    pub fn load_json(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Distribution of a named preset.
    pub fn preset(preset: Preset) -> Self {
        use Category::*;
        let weights: [f64; 11] = match preset {
            //                      arith logic shift cmp  branch ld/st jump  c.alu c.bit mul  misal
            Preset::Embedded => [2.0, 1.5, 1.0, 1.2, 1.8, 2.5, 0.5, 0.8, 0.3, 0.8, 0.2],
            Preset::Dsp => [3.0, 1.0, 2.0, 1.0, 1.0, 2.0, 0.3, 2.0, 1.5, 2.5, 0.5],
            Preset::Control => [1.5, 2.0, 0.8, 2.5, 3.0, 1.5, 1.0, 0.5, 0.8, 0.3, 0.1],
            Preset::Mixed => [1.0; 11],
            Preset::MultiplyHeavy => [1.0, 0.5, 0.5, 0.8, 0.8, 1.5, 0.3, 0.5, 0.3, 4.0, 0.3],
            Preset::BranchHeavy => [1.0, 0.8, 0.5, 1.5, 4.0, 1.0, 1.5, 0.3, 0.2, 0.5, 0.2],
            Preset::MisalignedHeavy => [1.0, 0.8, 0.5, 0.8, 1.0, 2.0, 0.3, 0.5, 0.3, 0.8, 3.0],
        };
        let categories = [
            Arithmetic,
            Logical,
            Shift,
            Comparison,
            Branch,
            LoadStore,
            Jump,
            CustomAlu,
            CustomBit,
            Multiply,
            MisalignedMem,
        ];
        categories
            .into_iter()
            .zip(weights)
            .fold(Self::new(), |d, (category, weight)| d.with(category, weight))
    }
}

/// Named workload distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Preset {
    Embedded,
    Dsp,
    Control,
    Mixed,
    MultiplyHeavy,
    BranchHeavy,
    MisalignedHeavy,
}

impl Preset {
    pub const ALL: [Preset; 7] = [
        Preset::Embedded,
        Preset::Dsp,
        Preset::Control,
        Preset::Mixed,
        Preset::MultiplyHeavy,
        Preset::BranchHeavy,
        Preset::MisalignedHeavy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Embedded => "embedded",
            Preset::Dsp => "dsp",
            Preset::Control => "control",
            Preset::Mixed => "mixed",
            Preset::MultiplyHeavy => "multiply_heavy",
            Preset::BranchHeavy => "branch_heavy",
            Preset::MisalignedHeavy => "misaligned_heavy",
        }
    }
}

/// Parameters of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of loop iterations (drawn instructions)
    pub instructions: usize,

    /// Seed for reproducible output; drawn from the OS when absent
    pub seed: Option<u64>,

    /// Multiplier for the custom ALU and bit-manipulation categories
    pub extension_weight: f64,

    /// Probability that a generated branch is forced taken
    pub branch_taken_rate: f64,

    /// Probability used when promoting aligned accesses to misaligned ones
    pub misaligned_rate: f64,

    /// Route aligned lw/lh/sw/sh draws through the misaligned path with
    /// `misaligned_rate`
    pub promote_misaligned: bool,

    /// Filler emitted after taken branches and misaligned accesses
    pub padding: PaddingKind,

    #[serde(skip)]
    pub memory: MemoryWindow,

    #[serde(skip)]
    pub distribution: Distribution,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            instructions: 1000,
            seed: None,
            extension_weight: 1.0,
            branch_taken_rate: 0.5,
            misaligned_rate: 0.3,
            promote_misaligned: false,
            padding: PaddingKind::default(),
            memory: MemoryWindow::default(),
            distribution: Distribution::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(instructions: usize) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_extension_weight(mut self, weight: f64) -> Self {
        self.extension_weight = weight;
        self
    }

    pub fn with_branch_taken_rate(mut self, rate: f64) -> Self {
        self.branch_taken_rate = rate;
        self
    }

    pub fn with_misaligned_rate(mut self, rate: f64) -> Self {
        self.misaligned_rate = rate;
        self
    }

    pub fn with_padding(mut self, padding: PaddingKind) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_memory(mut self, memory: MemoryWindow) -> Self {
        self.memory = memory;
        self
    }

    /// Check every parameter before any pool is built.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.instructions == 0 {
            return Err(ConfigError::InvalidCount);
        }
        if !self.extension_weight.is_finite() || self.extension_weight < 0.0 {
            return Err(ConfigError::InvalidExtensionWeight(self.extension_weight));
        }
        check_rate("branch_taken_rate", self.branch_taken_rate)?;
        check_rate("misaligned_rate", self.misaligned_rate)?;
        validate_memory(&self.memory)?;
        self.distribution.validate()
    }
}

fn check_rate(name: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

fn validate_memory(window: &MemoryWindow) -> ConfigResult<()> {
    let fail = |reason| ConfigError::InvalidMemoryWindow {
        base: window.base,
        size: window.size,
        reason,
    };
    if window.base % 4 != 0 {
        return Err(fail("base must be word-aligned"));
    }
    if window.size % 4 != 0 {
        return Err(fail("size must be a multiple of 4"));
    }
    if !(MemoryWindow::MIN_SIZE..=MemoryWindow::MAX_SIZE).contains(&window.size) {
        return Err(fail("size must be within 16..=0x800 bytes"));
    }
    if window.base.checked_add(window.size).is_none() {
        return Err(fail("window wraps past the end of the address space"));
    }
    Ok(())
}

/// Root structure of a `cvgen.toml` run profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvgenConfig {
    /// Run parameters
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Data memory window
    #[serde(default)]
    pub memory: MemoryWindow,

    /// Named distribution, used when no explicit distribution is given
    #[serde(default)]
    pub preset: Option<Preset>,

    /// Explicit category multipliers
    #[serde(default)]
    pub distribution: Option<Distribution>,
}

impl CvgenConfig {
    /// Load a profile from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: CvgenConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Find and load a profile by searching up from the given directory.
    /// Returns the defaults when none is found.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Profile that reproduces `config` exactly: run parameters, memory
    /// window and the resolved distribution (never a preset name).
    pub fn from_generator_config(config: &GeneratorConfig) -> Self {
        Self {
            generator: config.clone(),
            memory: config.memory,
            preset: None,
            distribution: Some(config.distribution.clone()),
        }
    }

    /// Write the profile as TOML. Seeds must fit a TOML integer (`i64`).
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let body = toml::to_string_pretty(self)?;
        std::fs::write(path, format!("# {} run profile\n\n{}", CONFIG_FILE_NAME, body))?;
        Ok(())
    }

    /// The distribution this profile selects: explicit multipliers, then
    /// the preset, then uniform.
    pub fn resolved_distribution(&self) -> Distribution {
        match (&self.distribution, self.preset) {
            (Some(distribution), _) => distribution.clone(),
            (None, Some(preset)) => Distribution::preset(preset),
            (None, None) => Distribution::new(),
        }
    }

    /// Flatten the profile into run parameters.
    pub fn to_generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            memory: self.memory,
            distribution: self.resolved_distribution(),
            ..self.generator.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.instructions, 1000);
        assert_eq!(config.extension_weight, 1.0);
        assert_eq!(config.branch_taken_rate, 0.5);
        assert_eq!(config.misaligned_rate, 0.3);
        assert!(!config.promote_misaligned);
        assert_eq!(config.padding, PaddingKind::Annotated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_categories_default_to_one() {
        let distribution = Distribution::new().with(Category::Branch, 4.0);
        assert_eq!(distribution.multiplier(Category::Branch), 4.0);
        assert_eq!(distribution.multiplier(Category::Shift), 1.0);
    }

    #[test]
    fn test_json_distribution() {
        let distribution =
            Distribution::from_json_str(r#"{"branch": 4.0, "multiply": 0, "bogus": 2.5}"#)
                .unwrap();
        assert_eq!(distribution.multiplier(Category::Branch), 4.0);
        assert_eq!(distribution.multiplier(Category::Multiply), 0.0);
        assert_eq!(distribution.multiplier(Category::Jump), 1.0);
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let err = Distribution::from_json_str(r#"{"shift": -1.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMultiplier { .. }));

        let config = GeneratorConfig::new(10)
            .with_distribution(Distribution::new().with(Category::Logical, f64::NAN));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMultiplier { .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Distribution::from_json_str(r#"{"branch": "lots"}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            Distribution::from_json_str("[1, 2]"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_parameter_validation() {
        assert!(matches!(
            GeneratorConfig::new(0).validate(),
            Err(ConfigError::InvalidCount)
        ));
        assert!(matches!(
            GeneratorConfig::new(5).with_branch_taken_rate(1.5).validate(),
            Err(ConfigError::InvalidRate {
                name: "branch_taken_rate",
                ..
            })
        ));
        assert!(matches!(
            GeneratorConfig::new(5).with_misaligned_rate(-0.1).validate(),
            Err(ConfigError::InvalidRate { .. })
        ));
        assert!(matches!(
            GeneratorConfig::new(5).with_extension_weight(-2.0).validate(),
            Err(ConfigError::InvalidExtensionWeight(_))
        ));
    }

    #[test]
    fn test_memory_window_validation() {
        let bad_size = MemoryWindow {
            base: 0x2000_0000,
            size: 0x1000,
        };
        assert!(matches!(
            GeneratorConfig::new(5).with_memory(bad_size).validate(),
            Err(ConfigError::InvalidMemoryWindow { .. })
        ));

        let unaligned = MemoryWindow {
            base: 0x2000_0002,
            size: 0x100,
        };
        assert!(GeneratorConfig::new(5).with_memory(unaligned).validate().is_err());

        let wraps = MemoryWindow {
            base: 0xFFFF_FF00,
            size: 0x800,
        };
        assert!(GeneratorConfig::new(5).with_memory(wraps).validate().is_err());
    }

    #[test]
    fn test_presets_cover_every_populated_category() {
        for preset in Preset::ALL {
            let distribution = Distribution::preset(preset);
            assert!(distribution.validate().is_ok());
            assert_eq!(distribution.entries().count(), 11, "{}", preset.as_str());
        }
        let embedded = Distribution::preset(Preset::Embedded);
        assert_eq!(embedded.multiplier(Category::LoadStore), 2.5);
        assert_eq!(embedded.multiplier(Category::MisalignedMem), 0.2);
        assert_eq!(
            Distribution::preset(Preset::BranchHeavy).multiplier(Category::Branch),
            4.0
        );
    }

    #[test]
    fn test_parse_profile() {
        let toml_str = r#"
preset = "dsp"

[generator]
instructions = 250
seed = 7
branch_taken_rate = 0.9
padding = "none"

[memory]
base = 0x20000000
size = 0x400
"#;
        let profile = CvgenConfig::from_toml_str(toml_str).unwrap();
        let config = profile.to_generator_config();
        assert_eq!(config.instructions, 250);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.branch_taken_rate, 0.9);
        assert_eq!(config.misaligned_rate, 0.3);
        assert_eq!(config.padding, PaddingKind::None);
        assert_eq!(config.memory.base, 0x2000_0000);
        assert_eq!(config.memory.size, 0x400);
        assert_eq!(config.distribution, Distribution::preset(Preset::Dsp));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_distribution_wins_over_preset() {
        let toml_str = r#"
preset = "control"

[distribution]
branch = 0.5
"#;
        let profile = CvgenConfig::from_toml_str(toml_str).unwrap();
        let distribution = profile.resolved_distribution();
        assert_eq!(distribution.multiplier(Category::Branch), 0.5);
        assert_eq!(distribution.multiplier(Category::Comparison), 1.0);
    }

    #[test]
    fn test_saved_profile_reproduces_run() {
        let config = GeneratorConfig::new(321)
            .with_seed(99)
            .with_extension_weight(2.5)
            .with_branch_taken_rate(0.75)
            .with_padding(PaddingKind::None)
            .with_memory(MemoryWindow {
                base: 0x2000_0000,
                size: 0x400,
            })
            .with_distribution(Distribution::preset(Preset::Dsp).with(Category::Jump, 0.0));
        let path =
            std::env::temp_dir().join(format!("cvgen_profile_{}.toml", std::process::id()));

        CvgenConfig::from_generator_config(&config).save(&path).unwrap();
        let loaded = CvgenConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.preset, None);
        assert_eq!(loaded.to_generator_config(), config);
    }

    #[test]
    fn test_save_rejects_seed_beyond_toml_range() {
        let config = GeneratorConfig::new(5).with_seed(u64::MAX);
        let path =
            std::env::temp_dir().join(format!("cvgen_bad_seed_{}.toml", std::process::id()));
        assert!(matches!(
            CvgenConfig::from_generator_config(&config).save(&path),
            Err(ConfigError::Serialize(_))
        ));
    }

    #[test]
    fn test_empty_profile_is_default() {
        let profile = CvgenConfig::from_toml_str("").unwrap();
        assert_eq!(profile.to_generator_config(), GeneratorConfig::default());
    }
}
