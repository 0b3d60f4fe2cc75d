//! Memory window and misaligned-access setup

use super::branch::{distinct_pair, CONDITION_REGISTERS};
use crate::isa::{MemAccess, Register};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Values stored by misaligned stores
pub const MISALIGNED_DATA_RANGE: RangeInclusive<u32> = 0x1000..=0xFFFF;

/// Data memory addressed by generated loads and stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWindow {
    /// Absolute base address
    #[serde(default = "default_base")]
    pub base: u32,

    /// Window size in bytes
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_base() -> u32 {
    0x1000_0000
}

/// Largest window whose offsets all fit a signed 12-bit immediate
fn default_size() -> u32 {
    0x800
}

impl Default for MemoryWindow {
    fn default() -> Self {
        Self {
            base: default_base(),
            size: default_size(),
        }
    }
}

impl MemoryWindow {
    /// Largest size accepted by configuration
    pub const MAX_SIZE: u32 = 0x800;
    /// Smallest size accepted by configuration
    pub const MIN_SIZE: u32 = 16;

    /// One past the last byte (initial stack pointer)
    pub fn end(&self) -> u32 {
        self.base.wrapping_add(self.size)
    }
}

/// Split an address into a `lui` upper field and a signed `addi` low field
/// such that `(hi << 12) + lo == addr`.
pub fn split_address(addr: u32) -> (u32, i32) {
    let hi = addr.wrapping_add(0x800) >> 12;
    let lo = addr.wrapping_sub(hi << 12) as i32;
    (hi, lo)
}

/// `lui`/`addi` pair that materializes `addr` in `reg`.
pub fn load_address(reg: Register, addr: u32) -> [String; 2] {
    let (hi, lo) = split_address(addr);
    let name = reg.abi_name();
    [
        format!("lui {}, {}", name, hi),
        format!("addi {}, {}, {}", name, name, lo),
    ]
}

/// Registers and setup code for one misaligned access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisalignedSetup {
    /// Register holding the word-aligned base address
    pub base: Register,
    pub address: u32,
    /// Register holding the value to store (stores only)
    pub data: Option<Register>,
    pub data_value: Option<u32>,
    pub instructions: Vec<String>,
}

/// Build the base-address (and, for stores, data) setup for a misaligned
/// access. The base address is word-aligned and lies in the lower half of
/// the window, low enough that any misaligned delta keeps the access inside
/// it.
pub fn misaligned_setup<R: Rng + ?Sized>(
    rng: &mut R,
    window: &MemoryWindow,
    access: MemAccess,
) -> MisalignedSetup {
    let (base, data) = match access {
        MemAccess::Load => {
            let base = CONDITION_REGISTERS[rng.gen_range(0..CONDITION_REGISTERS.len())];
            (base, None)
        }
        MemAccess::Store => {
            let (base, data) = distinct_pair(rng, &CONDITION_REGISTERS);
            (base, Some(data))
        }
    };

    // room for the largest delta plus a full word
    let span = (window.size / 2).min(window.size.saturating_sub(12));
    let address = window.base + (rng.gen_range(0..=span) & !3);
    let mut instructions = load_address(base, address).to_vec();

    let data_value = data.map(|reg| {
        let value = rng.gen_range(MISALIGNED_DATA_RANGE);
        instructions.push(format!("li {}, {}", reg.abi_name(), value));
        value
    });

    MisalignedSetup {
        base,
        address,
        data,
        data_value,
        instructions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn join(hi: u32, lo: i32) -> u32 {
        (hi << 12).wrapping_add(lo as u32)
    }

    #[test]
    fn test_split_address_roundtrip() {
        for addr in [0x1000_0000, 0x1000_0800, 0x1000_07FF, 0x1000_0FFC, 0xFFFF_F800, 0] {
            let (hi, lo) = split_address(addr);
            assert!((-2048..=2047).contains(&lo), "lo out of range for {:#x}", addr);
            assert_eq!(join(hi, lo), addr, "{:#x}", addr);
        }
    }

    #[test]
    fn test_load_address_lines() {
        let lines = load_address(Register::SP, 0x1000_0800);
        assert_eq!(lines[0], "lui sp, 65537");
        assert_eq!(lines[1], "addi sp, sp, -2048");
    }

    #[test]
    fn test_load_setup() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let window = MemoryWindow::default();
        for _ in 0..500 {
            let setup = misaligned_setup(&mut rng, &window, MemAccess::Load);
            assert_eq!(setup.instructions.len(), 2);
            assert!(setup.data.is_none());
            assert_eq!(setup.address % 4, 0);
            assert!(setup.address >= window.base);
            assert!(setup.address + 7 < window.end());
            assert!(CONDITION_REGISTERS.contains(&setup.base));
        }
    }

    #[test]
    fn test_store_setup() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let window = MemoryWindow::default();
        for _ in 0..500 {
            let setup = misaligned_setup(&mut rng, &window, MemAccess::Store);
            assert_eq!(setup.instructions.len(), 3);
            let data = setup.data.unwrap();
            assert_ne!(data, setup.base);
            assert!(MISALIGNED_DATA_RANGE.contains(&setup.data_value.unwrap()));
            assert!(setup.instructions[2].starts_with(&format!("li {}, ", data.abi_name())));
        }
    }
}
