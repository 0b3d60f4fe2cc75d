//! RV32 integer register file
//!
//! 32 registers addressed as `x0`..`x31`. `x0` is hard-wired to zero and is
//! never handed out as a destination or as a value-bearing source.

use std::fmt;

/// ABI names indexed by register number
const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Numeric names indexed by register number
const NUMERIC_NAMES: [&str; 32] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14",
    "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27",
    "x28", "x29", "x30", "x31",
];

/// Register identifier (5 bits → 32 registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(u8);

impl Register {
    /// Hard-wired zero
    pub const ZERO: Register = Register(0);
    /// Stack pointer
    pub const SP: Register = Register(2);
    /// Memory window base, set up by the prologue
    pub const T0: Register = Register(5);
    pub const T1: Register = Register(6);
    pub const T2: Register = Register(7);
    pub const T3: Register = Register(28);
    pub const T4: Register = Register(29);
    pub const T5: Register = Register(30);
    pub const T6: Register = Register(31);

    /// Number of integer registers
    pub const COUNT: u8 = 32;

    /// Register from a number, masked to 5 bits.
    pub(crate) const fn new(val: u8) -> Self {
        Register(val & 0x1f)
    }

    /// Numeric name, e.g. `x7`
    pub fn name(&self) -> &'static str {
        NUMERIC_NAMES[self.0 as usize]
    }

    /// ABI name, e.g. `t2`
    pub fn abi_name(&self) -> &'static str {
        ABI_NAMES[self.0 as usize]
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Register::ZERO.abi_name(), "zero");
        assert_eq!(Register::T3.abi_name(), "t3");
        assert_eq!(Register::T6.name(), "x31");
        assert_eq!(Register::SP.to_string(), "x2");
    }

    #[test]
    fn test_new_masks_to_five_bits() {
        assert_eq!(Register::new(28), Register::T3);
        assert_eq!(Register::new(32), Register::ZERO);
        assert!(Register::new(0).is_zero());
    }
}
