//! Branch-condition synthesis
//!
//! Loads two registers with constants drawn from disjoint ranges so that a
//! branch comparison resolves to a requested outcome by construction. All
//! values are small positives, so signed and unsigned comparisons agree.

use crate::isa::{BranchKind, Register};
use rand::Rng;
use std::ops::RangeInclusive;

/// Scratch registers reserved for condition and address setup
pub const CONDITION_REGISTERS: [Register; 4] =
    [Register::T3, Register::T4, Register::T5, Register::T6];

const EQUAL_RANGE: RangeInclusive<i32> = 1..=100;
const DISTINCT_RANGE: RangeInclusive<i32> = 101..=200;
const LOW_RANGE: RangeInclusive<i32> = 1..=50;
const HIGH_RANGE: RangeInclusive<i32> = 51..=100;

/// Operand registers and the values loaded into them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchSetup {
    pub kind: BranchKind,
    pub taken: bool,
    pub rs1: Register,
    pub rs2: Register,
    pub value1: i32,
    pub value2: i32,
}

impl BranchSetup {
    /// The two `addi reg, zero, value` lines that load the operands.
    pub fn instructions(&self) -> [String; 2] {
        [
            format!("addi {}, zero, {}", self.rs1.abi_name(), self.value1),
            format!("addi {}, zero, {}", self.rs2.abi_name(), self.value2),
        ]
    }

    /// Whether the branch resolves the way it was requested to.
    pub fn holds(&self) -> bool {
        self.kind.is_taken(self.value1, self.value2) == self.taken
    }
}

/// Synthesize operands that force `kind` to resolve as `taken`.
pub fn branch_condition<R: Rng + ?Sized>(
    rng: &mut R,
    kind: BranchKind,
    taken: bool,
) -> BranchSetup {
    let (rs1, rs2) = distinct_pair(rng, &CONDITION_REGISTERS);

    let (value1, value2) = match (kind, taken) {
        (BranchKind::Eq, true) | (BranchKind::Ne, false) => {
            let v = rng.gen_range(EQUAL_RANGE);
            (v, v)
        }
        (BranchKind::Eq, false) | (BranchKind::Ne, true) => {
            (rng.gen_range(EQUAL_RANGE), rng.gen_range(DISTINCT_RANGE))
        }
        (BranchKind::Lt | BranchKind::Ltu, true) | (BranchKind::Ge | BranchKind::Geu, false) => {
            (rng.gen_range(LOW_RANGE), rng.gen_range(HIGH_RANGE))
        }
        (BranchKind::Lt | BranchKind::Ltu, false) | (BranchKind::Ge | BranchKind::Geu, true) => {
            (rng.gen_range(HIGH_RANGE), rng.gen_range(LOW_RANGE))
        }
    };

    BranchSetup {
        kind,
        taken,
        rs1,
        rs2,
        value1,
        value2,
    }
}

/// Two different registers from `pool` (which must hold at least two).
pub(crate) fn distinct_pair<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[Register],
) -> (Register, Register) {
    assert!(pool.len() >= 2, "need at least two registers to pick a pair");
    let first = rng.gen_range(0..pool.len());
    let mut second = rng.gen_range(0..pool.len() - 1);
    if second >= first {
        second += 1;
    }
    (pool[first], pool[second])
}
