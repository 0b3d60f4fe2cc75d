//! Stream assembler
//!
//! A [`Generator`] is one generation session. It owns the run's random
//! source, label state and weighted pool, so independent sessions never
//! share mutable state. A run writes:
//!
//! 1. header comments, `.text` prologue (stack pointer and memory base)
//! 2. the instruction loop, one drawn template per iteration
//! 3. definitions for every referenced-but-undefined label
//! 4. a terminating self-jump and the `.data` block
//!
//! Branches get operand setup that forces the drawn outcome; misaligned
//! accesses get base/data register setup. Both are followed by filler from
//! the configured [`HazardPadding`] strategy.

pub mod padding;
pub mod program;

pub use padding::{AnnotatedPadding, HazardPadding, NoPadding, PaddingKind};
pub use program::{Program, INDENT};

use crate::config::{ConfigError, GeneratorConfig};
use crate::isa::{
    BranchKind, Catalog, CatalogEntry, CatalogError, Category, Dispatch, InstructionTemplate,
    MemAccess, OperandSlot, Register,
};
use crate::label::LabelManager;
use crate::select::{PoolError, WeightedPool};
use crate::synth::{self, MemoryWindow};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Chance of a fresh label definition before each drawn instruction
pub const LABEL_DENSITY: f64 = 0.1;

/// Label of the generated loop body
pub const LOOP_LABEL: &str = "main_loop";
/// Label of the terminating self-jump
pub const END_LABEL: &str = "program_end";

/// Literal words of the `.data` block
pub const TEST_DATA: [u32; 4] = [0x1234_5678, 0xdead_beef, 0xcafe_babe, 0x0f0f_0f0f];

/// Generation errors.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Cannot build instruction pool: {0}")]
    Pool(#[from] PoolError),
}

/// Operands fixed by setup code instead of drawn at random
#[derive(Debug, Default)]
struct Overrides {
    rs1: Option<Register>,
    rs2: Option<Register>,
    offset: Option<u32>,
}

/// One generation session
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    catalog: Catalog,
    pool: WeightedPool,
    labels: LabelManager,
    padding: Box<dyn HazardPadding>,
    rng: ChaCha8Rng,
    seed: u64,
}

impl Generator {
    /// Session over the built-in CV32E40P catalog.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenError> {
        Self::with_catalog(config, Catalog::cv32e40p()?)
    }

    /// Session over a caller-supplied catalog. The configuration is
    /// validated and the pool built before anything is drawn.
    pub fn with_catalog(config: GeneratorConfig, catalog: Catalog) -> Result<Self, GenError> {
        config.validate()?;
        let pool = WeightedPool::build(&catalog, &config.distribution, config.extension_weight)?;

        let seed = config.seed.unwrap_or_else(|| {
            // drawn seeds fit an i64 so a saved profile can carry them
            let seed = rand::random::<u64>() >> 1;
            tracing::info!(seed, "no seed given, drew one from the OS");
            seed
        });

        Ok(Self {
            padding: config.padding.build(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            labels: LabelManager::new(),
            config,
            catalog,
            pool,
            seed,
        })
    }

    /// Replace the padding strategy.
    pub fn with_padding(mut self, padding: impl HazardPadding + 'static) -> Self {
        self.padding = Box::new(padding);
        self
    }

    /// Seed of this session (drawn when the config had none)
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pool(&self) -> &WeightedPool {
        &self.pool
    }

    /// Run the session and return the program.
    pub fn generate(mut self) -> Program {
        tracing::debug!(
            seed = self.seed,
            instructions = self.config.instructions,
            "generating program"
        );

        let mut program = Program::new();
        self.write_prologue(&mut program);

        for _ in 0..self.config.instructions {
            if self.rng.gen_bool(LABEL_DENSITY) {
                self.labels.define_new(&mut program);
            }

            let entry = *self.pool.draw(&mut self.rng);
            let entry = self.promote(entry);

            match entry.dispatch {
                Dispatch::Branch(kind) => self.emit_branch(&mut program, &entry.template, kind),
                Dispatch::Misaligned(access) => {
                    self.emit_misaligned(&mut program, &entry.template, access)
                }
                Dispatch::Plain => {
                    let line = self.render(&entry.template, &Overrides::default());
                    program.instr(&line);
                }
            }
        }

        self.labels.flush_undefined(&mut program);
        debug_assert_eq!(self.labels.undefined().count(), 0);

        write_epilogue(&mut program);
        tracing::debug!(
            lines = program.len(),
            labels = self.labels.len(),
            "program complete"
        );
        program
    }

    fn write_prologue(&self, program: &mut Program) {
        let config = &self.config;
        let memory = &config.memory;

        program.header("CV32E40P Assembly Test Program");
        program.header("Generated with target instruction distribution");
        program.header(&format!(
            "seed: {}, instructions: {}, extension weight: {}, branch taken rate: {}, misaligned rate: {}",
            self.seed,
            config.instructions,
            config.extension_weight,
            config.branch_taken_rate,
            config.misaligned_rate
        ));
        program.blank();
        program.directive(".section .text");
        program.directive(".global _start");
        program.blank();
        program.label("_start");
        program.comment("Initialize stack pointer");
        for line in synth::load_address(Register::SP, memory.end()) {
            program.instr(&line);
        }
        program.blank();
        program.comment("Load the data window base into t0");
        for line in synth::load_address(Register::T0, memory.base) {
            program.instr(&line);
        }
        program.blank();
        program.label(LOOP_LABEL);
    }

    /// Aligned load/store → misaligned counterpart, when enabled.
    fn promote(&mut self, entry: CatalogEntry) -> CatalogEntry {
        if !self.config.promote_misaligned || entry.template.category != Category::LoadStore {
            return entry;
        }
        match self.catalog.misaligned_counterpart(entry.template.key) {
            Some(counterpart) if self.rng.gen_bool(self.config.misaligned_rate) => *counterpart,
            _ => entry,
        }
    }

    fn emit_branch(
        &mut self,
        program: &mut Program,
        template: &InstructionTemplate,
        kind: BranchKind,
    ) {
        let taken = self.rng.gen_bool(self.config.branch_taken_rate);
        let setup = synth::branch_condition(&mut self.rng, kind, taken);
        for line in setup.instructions() {
            program.instr(&line);
        }

        let overrides = Overrides {
            rs1: Some(setup.rs1),
            rs2: Some(setup.rs2),
            offset: None,
        };
        let line = self.render(template, &overrides);
        program.instr(&line);

        if taken {
            self.padding.after_taken_branch(program);
        }
    }

    fn emit_misaligned(
        &mut self,
        program: &mut Program,
        template: &InstructionTemplate,
        access: MemAccess,
    ) {
        let setup = synth::misaligned_setup(&mut self.rng, &self.config.memory, access);
        for line in &setup.instructions {
            program.instr(line);
        }

        let delta = synth::misaligned_delta(&mut self.rng);
        let overrides = Overrides {
            rs1: Some(setup.base),
            rs2: setup.data,
            offset: Some(delta),
        };
        let line = self.render(template, &overrides);
        program.instr(&line);
        program.comment(&format!(
            "Above instruction uses misaligned offset {} - will cause structural hazard",
            delta
        ));

        self.padding.after_misaligned_access(program);
    }

    fn render(&mut self, template: &InstructionTemplate, overrides: &Overrides) -> String {
        render_instruction(
            template,
            overrides,
            &mut self.rng,
            &mut self.labels,
            &self.config.memory,
        )
    }
}

/// Format one instruction, drawing every operand that is not overridden.
/// An offset slot followed by a source register renders as `offset(reg)`.
fn render_instruction<R: Rng + ?Sized>(
    template: &InstructionTemplate,
    overrides: &Overrides,
    rng: &mut R,
    labels: &mut LabelManager,
    memory: &MemoryWindow,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(template.operands.len());
    let mut pending_offset: Option<String> = None;

    for slot in template.operands {
        let text = match slot {
            OperandSlot::Rd => synth::random_register(rng, false).to_string(),
            OperandSlot::Rs1 => register_operand(overrides.rs1, rng),
            OperandSlot::Rs2 => register_operand(overrides.rs2, rng),
            OperandSlot::Imm12 => synth::random_immediate(rng, 12, true).to_string(),
            OperandSlot::Shamt => synth::shift_amount(rng).to_string(),
            OperandSlot::MemOffset => overrides
                .offset
                .unwrap_or_else(|| synth::aligned_offset(rng, memory))
                .to_string(),
            OperandSlot::MisalignedOffset => overrides
                .offset
                .unwrap_or_else(|| synth::misaligned_offset(rng, memory))
                .to_string(),
            OperandSlot::Label => labels.resolve_reference(rng),
        };

        if slot.is_offset() {
            pending_offset = Some(text);
            continue;
        }
        match pending_offset.take() {
            Some(offset) if *slot == OperandSlot::Rs1 => {
                parts.push(format!("{}({})", offset, text))
            }
            Some(offset) => {
                parts.push(offset);
                parts.push(text);
            }
            None => parts.push(text),
        }
    }
    parts.extend(pending_offset);

    format!("{} {}", template.mnemonic, parts.join(", "))
}

/// Setup registers render by ABI name, drawn ones by number.
fn register_operand<R: Rng + ?Sized>(fixed: Option<Register>, rng: &mut R) -> String {
    match fixed {
        Some(reg) => reg.abi_name().to_string(),
        None => synth::random_register(rng, false).to_string(),
    }
}

fn write_epilogue(program: &mut Program) {
    program.blank();
    program.label(END_LABEL);
    program.comment("Infinite loop to end program");
    program.instr(&format!("j {}", END_LABEL));
    program.blank();
    program.directive(".section .data");
    program.label("test_data");
    let words: Vec<String> = TEST_DATA.iter().map(|w| format!("{:#010x}", w)).collect();
    program.instr(&format!(".word {}", words.join(", ")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{Format, CV32E40P_TEMPLATES};

    fn render_once(key: &str, overrides: &Overrides, seed: u64) -> String {
        let catalog = Catalog::cv32e40p().unwrap();
        let template = catalog.get(key).unwrap().template;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut labels = LabelManager::new();
        render_instruction(
            &template,
            overrides,
            &mut rng,
            &mut labels,
            &MemoryWindow::default(),
        )
    }

    #[test]
    fn test_render_memory_operand() {
        let line = render_once("lw", &Overrides::default(), 1);
        let (mnemonic, rest) = line.split_once(' ').unwrap();
        assert_eq!(mnemonic, "lw");
        let operands: Vec<&str> = rest.split(", ").collect();
        assert_eq!(operands.len(), 2);
        let (offset, base) = operands[1].split_once('(').unwrap();
        assert_eq!(offset.parse::<u32>().unwrap() % 4, 0);
        assert!(base.ends_with(')'));
    }

    #[test]
    fn test_render_store_overrides() {
        let overrides = Overrides {
            rs1: Some(Register::T4),
            rs2: Some(Register::T6),
            offset: Some(5),
        };
        assert_eq!(render_once("sw_misaligned", &overrides, 3), "sw t6, 5(t4)");
    }

    #[test]
    fn test_render_branch_uses_label() {
        let overrides = Overrides {
            rs1: Some(Register::T3),
            rs2: Some(Register::T5),
            offset: None,
        };
        assert_eq!(render_once("bge", &overrides, 3), "bge t3, t5, label_0");
    }

    #[test]
    fn test_render_offset_without_base() {
        static ODD: [OperandSlot; 2] = [OperandSlot::Rd, OperandSlot::MisalignedOffset];
        let template = InstructionTemplate::new(
            "odd",
            "odd",
            Format::I,
            Category::LoadStore,
            1.0,
            &ODD,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut labels = LabelManager::new();
        let line = render_instruction(
            &template,
            &Overrides::default(),
            &mut rng,
            &mut labels,
            &MemoryWindow::default(),
        );
        let offset: u32 = line.rsplit(", ").next().unwrap().parse().unwrap();
        assert_ne!(offset % 4, 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = GeneratorConfig::new(0);
        assert!(matches!(Generator::new(config), Err(GenError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_pool() {
        let catalog = Catalog::new(CV32E40P_TEMPLATES.iter().copied()).unwrap();
        let distribution = Category::ALL.into_iter().fold(
            crate::config::Distribution::new(),
            |d, c| d.with(c, 0.0),
        );
        let config = GeneratorConfig::new(10).with_distribution(distribution);
        assert!(matches!(
            Generator::with_catalog(config, catalog),
            Err(GenError::Pool(PoolError::Empty))
        ));
    }

    #[test]
    fn test_drawn_seed_is_reported() {
        let generator = Generator::new(GeneratorConfig::new(5)).unwrap();
        let seed = generator.seed();
        let text = generator.generate().into_text();
        assert!(text.contains(&format!("seed: {},", seed)));
    }

    #[test]
    fn test_drawn_seed_fits_profile() {
        for _ in 0..32 {
            let generator = Generator::new(GeneratorConfig::new(1)).unwrap();
            assert!(generator.seed() <= i64::MAX as u64);
        }
    }

    #[test]
    fn test_prologue_and_epilogue() {
        let config = GeneratorConfig::new(3).with_seed(1);
        let text = Generator::new(config).unwrap().generate().into_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# CV32E40P Assembly Test Program");
        assert!(lines.contains(&"_start:"));
        assert!(lines.contains(&"    lui sp, 65537"));
        assert!(lines.contains(&"    addi sp, sp, -2048"));
        assert!(lines.contains(&"    # Load the data window base into t0"));
        assert!(!text.contains("base register for memory operations"));
        assert!(lines.contains(&"    lui t0, 65536"));
        assert!(lines.contains(&"    addi t0, t0, 0"));
        assert!(lines.contains(&"main_loop:"));
        assert_eq!(
            &lines[lines.len() - 7..],
            [
                "program_end:",
                "    # Infinite loop to end program",
                "    j program_end",
                "",
                ".section .data",
                "test_data:",
                "    .word 0x12345678, 0xdeadbeef, 0xcafebabe, 0x0f0f0f0f",
            ]
        );
    }
}
