//! cvgen - CV32E40P assembly stimulus generator
//!
//! Main CLI entry point for generating test programs, tallying their
//! instruction mix and inspecting the instruction catalog.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cvgen::config::{CvgenConfig, Distribution, Preset};
use cvgen::isa::{Catalog, Category};
use cvgen::select::effective_count;
use cvgen::{Generator, PaddingKind, Statistics};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cvgen")]
#[command(version)]
#[command(about = "Pseudo-random CV32E40P assembly stimulus generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog templates and their pool counts
    Catalog {
        /// Preset used for the effective counts
        #[arg(long, value_enum, default_value = "embedded")]
        preset: Preset,

        /// JSON distribution file (overrides --preset)
        #[arg(short, long)]
        distribution: Option<PathBuf>,

        /// Multiplier for custom ALU/bit-manipulation categories
        #[arg(long, alias = "cv-weight", default_value = "1.0")]
        extension_weight: f64,
    },

    /// Generate an assembly test program
    Generate {
        /// Number of instructions to draw [default: 1000]
        #[arg(short = 'n', long)]
        instructions: Option<usize>,

        /// Output assembly file
        #[arg(short, long, default_value = "test_program.s")]
        output: PathBuf,

        /// JSON distribution file (`{"branch": 4.0, ...}`)
        #[arg(short, long)]
        distribution: Option<PathBuf>,

        /// Named distribution [default: embedded]
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Random seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,

        /// Multiplier for custom ALU/bit-manipulation categories
        #[arg(long, alias = "cv-weight")]
        extension_weight: Option<f64>,

        /// Probability that a branch is forced taken
        #[arg(long)]
        branch_taken_rate: Option<f64>,

        /// Probability of promoting an aligned access (with --promote-misaligned)
        #[arg(long)]
        misaligned_rate: Option<f64>,

        /// Route aligned lw/lh/sw/sh draws through the misaligned path
        #[arg(long)]
        promote_misaligned: bool,

        /// Filler after taken branches and misaligned accesses
        #[arg(long, value_enum)]
        padding: Option<PaddingKind>,

        /// Run profile (searched upward from the current directory if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write `<output>_stats.json` and print the category mix
        #[arg(long)]
        stats: bool,

        /// Write the settings of this run (including the seed) as a profile
        #[arg(long, value_name = "PATH")]
        save_profile: Option<PathBuf>,
    },

    /// Tally the instruction mix of an existing assembly file
    Stats {
        /// Input assembly file
        #[arg(short, long)]
        input: PathBuf,

        /// Write the statistics as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of the table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog {
            preset,
            distribution,
            extension_weight,
        } => cmd_catalog(preset, distribution.as_deref(), extension_weight),
        Commands::Generate {
            instructions,
            output,
            distribution,
            preset,
            seed,
            extension_weight,
            branch_taken_rate,
            misaligned_rate,
            promote_misaligned,
            padding,
            config,
            stats,
            save_profile,
        } => {
            let overrides = GenerateArgs {
                instructions,
                distribution,
                preset,
                seed,
                extension_weight,
                branch_taken_rate,
                misaligned_rate,
                promote_misaligned,
                padding,
            };
            cmd_generate(
                &output,
                config.as_deref(),
                overrides,
                stats,
                save_profile.as_deref(),
            )
        }
        Commands::Stats {
            input,
            output,
            json,
        } => cmd_stats(&input, output.as_deref(), json),
    }
}

/// Flags of `generate` that override the run profile
struct GenerateArgs {
    instructions: Option<usize>,
    distribution: Option<PathBuf>,
    preset: Option<Preset>,
    seed: Option<u64>,
    extension_weight: Option<f64>,
    branch_taken_rate: Option<f64>,
    misaligned_rate: Option<f64>,
    promote_misaligned: bool,
    padding: Option<PaddingKind>,
}

fn cmd_generate(
    output: &Path,
    config_path: Option<&Path>,
    args: GenerateArgs,
    write_stats: bool,
    save_profile: Option<&Path>,
) -> Result<()> {
    let profile = match config_path {
        Some(path) => CvgenConfig::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            CvgenConfig::find_and_load(&cwd).context("Failed to load cvgen.toml")?
        }
    };

    // distribution file > --preset > profile > embedded
    let distribution = match (&args.distribution, args.preset) {
        (Some(path), _) => Distribution::load_json(path)
            .with_context(|| format!("Failed to load distribution {}", path.display()))?,
        (None, Some(preset)) => Distribution::preset(preset),
        (None, None) if profile.distribution.is_some() || profile.preset.is_some() => {
            profile.resolved_distribution()
        }
        (None, None) => Distribution::preset(Preset::Embedded),
    };

    let mut config = profile.to_generator_config().with_distribution(distribution);
    if let Some(n) = args.instructions {
        config.instructions = n;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(weight) = args.extension_weight {
        config.extension_weight = weight;
    }
    if let Some(rate) = args.branch_taken_rate {
        config.branch_taken_rate = rate;
    }
    if let Some(rate) = args.misaligned_rate {
        config.misaligned_rate = rate;
    }
    if args.promote_misaligned {
        config.promote_misaligned = true;
    }
    if let Some(padding) = args.padding {
        config.padding = padding;
    }

    let start = Instant::now();
    let generator = Generator::new(config).context("Invalid generation parameters")?;
    let seed = generator.seed();
    let instructions = generator.config().instructions;
    let catalog = generator.catalog().clone();

    if let Some(path) = save_profile {
        let mut used = generator.config().clone();
        used.seed = Some(seed);
        CvgenConfig::from_generator_config(&used)
            .save(path)
            .with_context(|| format!("Failed to save profile {}", path.display()))?;
        println!("Profile saved to {}", path.display());
    }

    let text = generator.generate().into_text();

    fs::write(output, &text)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Generated {} instructions (seed {}) to {} in {:.2?}",
        instructions,
        seed,
        output.display(),
        start.elapsed()
    );

    if write_stats {
        let stats = Statistics::from_text(&text, &catalog);
        let stats_path = stats_path_for(output);
        fs::write(&stats_path, stats.to_json()?)
            .with_context(|| format!("Failed to write {}", stats_path.display()))?;
        println!("Statistics saved to {}", stats_path.display());
        println!();
        println!("{}", stats);
    }

    Ok(())
}

/// `dir/name.s` → `dir/name_stats.json`
fn stats_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "test_program".to_string());
    output.with_file_name(format!("{}_stats.json", stem))
}

fn cmd_stats(input: &Path, output: Option<&Path>, json: bool) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let catalog = Catalog::cv32e40p().context("Built-in catalog is invalid")?;
    let stats = Statistics::from_text(&text, &catalog);

    if let Some(path) = output {
        fs::write(path, stats.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Statistics saved to {}", path.display());
    }

    if json {
        println!("{}", stats.to_json()?);
    } else {
        println!("{}", stats);
    }
    Ok(())
}

fn cmd_catalog(preset: Preset, distribution: Option<&Path>, extension_weight: f64) -> Result<()> {
    let distribution = match distribution {
        Some(path) => Distribution::load_json(path)
            .with_context(|| format!("Failed to load distribution {}", path.display()))?,
        None => Distribution::preset(preset),
    };
    distribution.validate()?;
    let catalog = Catalog::cv32e40p().context("Built-in catalog is invalid")?;

    println!(
        "{:<16} {:<15} {:<6} {:>6} {:>6}",
        "KEY", "CATEGORY", "FORMAT", "WEIGHT", "COUNT"
    );
    println!("{}", "-".repeat(53));

    let mut total = 0u64;
    for category in Category::ALL {
        for entry in catalog
            .entries()
            .iter()
            .filter(|e| e.template.category == category)
        {
            let template = &entry.template;
            let count = effective_count(template, &distribution, extension_weight);
            total += count;
            println!(
                "{:<16} {:<15} {:<6} {:>6.1} {:>6}",
                template.key,
                category.as_str(),
                template.format.as_str(),
                template.weight,
                count
            );
        }
    }

    println!("{}", "-".repeat(53));
    println!("{} templates, pool total {}", catalog.len(), total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_path() {
        assert_eq!(
            stats_path_for(Path::new("out/prog.s")),
            PathBuf::from("out/prog_stats.json")
        );
        assert_eq!(
            stats_path_for(Path::new("test_program.s")),
            PathBuf::from("test_program_stats.json")
        );
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
