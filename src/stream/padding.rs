//! Hazard padding
//!
//! Filler written after a taken branch (instructions the pipeline would
//! flush) and after a misaligned access (instructions that may stall behind
//! it). This is stimulus annotation only; the generator does not model the
//! pipeline, so strategies are freely swappable.

use super::program::Program;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy for filler lines around hazard-inducing instructions
pub trait HazardPadding: fmt::Debug + Send + Sync {
    /// Called right after a branch that was forced taken
    fn after_taken_branch(&self, program: &mut Program);

    /// Called right after a misaligned access and its comment
    fn after_misaligned_access(&self, program: &mut Program);
}

/// Two annotated no-ops after taken branches; a no-op and a dependent ALU
/// op after misaligned accesses
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotatedPadding;

impl HazardPadding for AnnotatedPadding {
    fn after_taken_branch(&self, program: &mut Program) {
        for _ in 0..2 {
            program.instr_with_note("nop", "This will be flushed if branch taken");
        }
    }

    fn after_misaligned_access(&self, program: &mut Program) {
        program.instr_with_note("nop", "May be stalled due to misaligned access");
        program.instr_with_note("add t1, t1, t2", "May be stalled due to misaligned access");
    }
}

/// No filler at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPadding;

impl HazardPadding for NoPadding {
    fn after_taken_branch(&self, _program: &mut Program) {}

    fn after_misaligned_access(&self, _program: &mut Program) {}
}

/// Built-in padding strategies, selectable from a profile or the CLI
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PaddingKind {
    #[default]
    Annotated,
    None,
}

impl PaddingKind {
    pub fn build(&self) -> Box<dyn HazardPadding> {
        match self {
            PaddingKind::Annotated => Box::new(AnnotatedPadding),
            PaddingKind::None => Box::new(NoPadding),
        }
    }
}
