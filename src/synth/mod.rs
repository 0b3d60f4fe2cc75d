//! Value synthesizers
//!
//! Pure functions over a caller-owned random source: registers, immediates,
//! memory offsets, forced branch conditions and misaligned-access setup.
//! Nothing here holds state between calls, so the same RNG state always
//! yields the same values.

pub mod branch;
pub mod memory;

pub use branch::{branch_condition, BranchSetup, CONDITION_REGISTERS};
pub use memory::{
    load_address, misaligned_setup, split_address, MemoryWindow, MisalignedSetup,
    MISALIGNED_DATA_RANGE,
};

use crate::isa::Register;
use rand::Rng;

/// Byte deltas that are never a multiple of 4
pub const MISALIGNED_DELTAS: [u32; 6] = [1, 2, 3, 5, 6, 7];

/// Uniform register draw; `x0` is excluded unless `allow_zero`.
pub fn random_register<R: Rng + ?Sized>(rng: &mut R, allow_zero: bool) -> Register {
    let low = if allow_zero { 0 } else { 1 };
    Register::new(rng.gen_range(low..Register::COUNT))
}

/// Uniform immediate over the representable range of a `bits`-wide field.
///
/// # Panics
///
/// Panics if `bits` is not in `1..=32`.
pub fn random_immediate<R: Rng + ?Sized>(rng: &mut R, bits: u32, signed: bool) -> i64 {
    assert!(
        (1..=32).contains(&bits),
        "immediate width must be 1..=32 bits, got {}",
        bits
    );
    if signed {
        let half = 1i64 << (bits - 1);
        rng.gen_range(-half..half)
    } else {
        rng.gen_range(0..(1i64 << bits))
    }
}

/// Shift amount for RV32 (0..=31)
pub fn shift_amount<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(0..32)
}

/// Word-aligned offset inside the memory window.
///
/// # Panics
///
/// Panics if the window is smaller than 8 bytes.
pub fn aligned_offset<R: Rng + ?Sized>(rng: &mut R, window: &MemoryWindow) -> u32 {
    assert!(window.size >= 8, "memory window too small: {}", window.size);
    rng.gen_range(0..=window.size - 4) & !3
}

/// One of [`MISALIGNED_DELTAS`]
pub fn misaligned_delta<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    MISALIGNED_DELTAS[rng.gen_range(0..MISALIGNED_DELTAS.len())]
}

/// Offset that is never a multiple of 4: a word-aligned base in a slightly
/// smaller window plus a misaligned delta. The result stays below the
/// window size.
///
/// # Panics
///
/// Panics if the window is smaller than 8 bytes.
pub fn misaligned_offset<R: Rng + ?Sized>(rng: &mut R, window: &MemoryWindow) -> u32 {
    assert!(window.size >= 8, "memory window too small: {}", window.size);
    let base = rng.gen_range(0..=window.size - 8) & !3;
    base + misaligned_delta(rng)
}
