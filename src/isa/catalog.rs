//! Instruction catalog for the CV32E40P core
//!
//! A fixed table of instruction templates: mnemonic, encoding format,
//! category, base weight and operand shape. The base weights approximate
//! instruction frequencies of a typical embedded workload. The catalog is
//! validated once at construction; every template is resolved into a
//! [`Dispatch`] so the stream assembler never has to re-check it.

use super::branch::BranchKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Catalog construction errors.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("Duplicate template key: {0}")]
    DuplicateKey(String),

    #[error("Template {key} has invalid base weight {weight}")]
    InvalidWeight { key: String, weight: f64 },

    #[error("Branch template {key} has no branch-condition rule for mnemonic {mnemonic}")]
    UnsupportedBranch { key: String, mnemonic: String },

    #[error("Misaligned template {key} is malformed: {reason}")]
    MalformedMisaligned { key: String, reason: &'static str },
}

/// Semantic grouping of templates, the unit of weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Arithmetic,
    Logical,
    Shift,
    Comparison,
    Branch,
    LoadStore,
    Jump,
    CustomAlu,
    CustomBit,
    Immediate,
    Multiply,
    MisalignedMem,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Arithmetic,
        Category::Logical,
        Category::Shift,
        Category::Comparison,
        Category::Branch,
        Category::LoadStore,
        Category::Jump,
        Category::CustomAlu,
        Category::CustomBit,
        Category::Immediate,
        Category::Multiply,
        Category::MisalignedMem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Arithmetic => "arithmetic",
            Category::Logical => "logical",
            Category::Shift => "shift",
            Category::Comparison => "comparison",
            Category::Branch => "branch",
            Category::LoadStore => "load_store",
            Category::Jump => "jump",
            Category::CustomAlu => "custom_alu",
            Category::CustomBit => "custom_bit",
            Category::Immediate => "immediate",
            Category::Multiply => "multiply",
            Category::MisalignedMem => "misaligned_mem",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    /// CV32E40P custom extension categories, scaled by the extension weight
    pub fn is_extension(&self) -> bool {
        matches!(self, Category::CustomAlu | Category::CustomBit)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RISC-V encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R,
    I,
    S,
    B,
    J,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::R => "R",
            Format::I => "I",
            Format::S => "S",
            Format::B => "B",
            Format::J => "J",
        }
    }
}

/// Operand role tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandSlot {
    /// Destination register
    Rd,
    /// Source register 1 (base register when it follows an offset)
    Rs1,
    /// Source register 2 (data register for stores)
    Rs2,
    /// Signed 12-bit immediate
    Imm12,
    /// 5-bit shift amount
    Shamt,
    /// Word-aligned memory offset
    MemOffset,
    /// Memory offset that is never a multiple of 4
    MisalignedOffset,
    /// Branch or jump target
    Label,
}

impl OperandSlot {
    pub fn is_offset(&self) -> bool {
        matches!(self, OperandSlot::MemOffset | OperandSlot::MisalignedOffset)
    }
}

/// Static descriptor of one instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstructionTemplate {
    /// Catalog key (the mnemonic, except for misaligned variants)
    pub key: &'static str,
    pub mnemonic: &'static str,
    pub format: Format,
    pub category: Category,
    /// Base weight (> 0)
    pub weight: f64,
    pub operands: &'static [OperandSlot],
}

impl InstructionTemplate {
    pub const fn new(
        key: &'static str,
        mnemonic: &'static str,
        format: Format,
        category: Category,
        weight: f64,
        operands: &'static [OperandSlot],
    ) -> Self {
        Self {
            key,
            mnemonic,
            format,
            category,
            weight,
            operands,
        }
    }
}

/// Direction of a memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    Load,
    Store,
}

/// How the stream assembler handles a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// One instruction line, operands synthesized per slot
    Plain,
    /// Condition setup, branch, and taken-path padding
    Branch(BranchKind),
    /// Address setup, misaligned access, and stall padding
    Misaligned(MemAccess),
}

/// A validated template with its resolved dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub template: InstructionTemplate,
    pub dispatch: Dispatch,
}

/// Read-only template table
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Validate and index a template table. Table order is preserved and
    /// drives pool construction order.
    pub fn new(
        templates: impl IntoIterator<Item = InstructionTemplate>,
    ) -> Result<Self, CatalogError> {
        let mut entries = Vec::new();
        let mut index = HashMap::new();

        for template in templates {
            if index.contains_key(template.key) {
                return Err(CatalogError::DuplicateKey(template.key.to_string()));
            }
            if !template.weight.is_finite() || template.weight <= 0.0 {
                return Err(CatalogError::InvalidWeight {
                    key: template.key.to_string(),
                    weight: template.weight,
                });
            }
            let dispatch = resolve_dispatch(&template)?;
            index.insert(template.key, entries.len());
            entries.push(CatalogEntry { template, dispatch });
        }

        Ok(Self { entries, index })
    }

    /// The built-in CV32E40P table.
    pub fn cv32e40p() -> Result<Self, CatalogError> {
        Self::new(CV32E40P_TEMPLATES.iter().copied())
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.index.get(key).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Misaligned variant of an aligned load/store, if the table has one.
    pub fn misaligned_counterpart(&self, key: &str) -> Option<&CatalogEntry> {
        self.get(&format!("{}_misaligned", key))
            .filter(|entry| matches!(entry.dispatch, Dispatch::Misaligned(_)))
    }
}

fn resolve_dispatch(template: &InstructionTemplate) -> Result<Dispatch, CatalogError> {
    match template.category {
        Category::Branch => BranchKind::from_mnemonic(template.mnemonic)
            .map(Dispatch::Branch)
            .ok_or_else(|| CatalogError::UnsupportedBranch {
                key: template.key.to_string(),
                mnemonic: template.mnemonic.to_string(),
            }),
        Category::MisalignedMem => {
            if !template.operands.contains(&OperandSlot::MisalignedOffset) {
                return Err(CatalogError::MalformedMisaligned {
                    key: template.key.to_string(),
                    reason: "no misaligned-offset slot",
                });
            }
            match template.format {
                Format::I => Ok(Dispatch::Misaligned(MemAccess::Load)),
                Format::S => Ok(Dispatch::Misaligned(MemAccess::Store)),
                _ => Err(CatalogError::MalformedMisaligned {
                    key: template.key.to_string(),
                    reason: "format must be I (load) or S (store)",
                }),
            }
        }
        _ => Ok(Dispatch::Plain),
    }
}

use Category::*;
use OperandSlot::*;

const RRR: &[OperandSlot] = &[Rd, Rs1, Rs2];
const RR: &[OperandSlot] = &[Rd, Rs1];
const RRI: &[OperandSlot] = &[Rd, Rs1, Imm12];
const RRS: &[OperandSlot] = &[Rd, Rs1, Shamt];
const LOAD: &[OperandSlot] = &[Rd, MemOffset, Rs1];
const STORE: &[OperandSlot] = &[Rs2, MemOffset, Rs1];
const BRANCH: &[OperandSlot] = &[Rs1, Rs2, Label];
const JAL: &[OperandSlot] = &[Rd, Label];
const MIS_LOAD: &[OperandSlot] = &[Rd, MisalignedOffset, Rs1];
const MIS_STORE: &[OperandSlot] = &[Rs2, MisalignedOffset, Rs1];

const fn t(
    mnemonic: &'static str,
    format: Format,
    category: Category,
    weight: f64,
    operands: &'static [OperandSlot],
) -> InstructionTemplate {
    InstructionTemplate::new(mnemonic, mnemonic, format, category, weight, operands)
}

/// CV32E40P template table: RV32IM plus the PULP ALU and bit-manipulation
/// extensions.
pub const CV32E40P_TEMPLATES: &[InstructionTemplate] = &[
    // Arithmetic
    t("add", Format::R, Arithmetic, 8.0, RRR),
    t("sub", Format::R, Arithmetic, 6.0, RRR),
    t("addi", Format::I, Arithmetic, 12.0, RRI),
    // Logical
    t("and", Format::R, Logical, 3.0, RRR),
    t("or", Format::R, Logical, 3.0, RRR),
    t("xor", Format::R, Logical, 2.0, RRR),
    t("andi", Format::I, Logical, 4.0, RRI),
    t("ori", Format::I, Logical, 2.0, RRI),
    t("xori", Format::I, Logical, 1.0, RRI),
    // Shift
    t("sll", Format::R, Shift, 2.0, RRR),
    t("srl", Format::R, Shift, 2.0, RRR),
    t("sra", Format::R, Shift, 1.5, RRR),
    t("slli", Format::I, Shift, 1.5, RRS),
    t("srli", Format::I, Shift, 1.0, RRS),
    // Comparison
    t("slt", Format::R, Comparison, 2.0, RRR),
    t("sltu", Format::R, Comparison, 2.0, RRR),
    t("slti", Format::I, Comparison, 3.0, RRI),
    t("sltiu", Format::I, Comparison, 3.0, RRI),
    // Branch
    t("beq", Format::B, Branch, 3.0, BRANCH),
    t("bne", Format::B, Branch, 3.0, BRANCH),
    t("blt", Format::B, Branch, 2.0, BRANCH),
    t("bge", Format::B, Branch, 2.0, BRANCH),
    t("bltu", Format::B, Branch, 1.0, BRANCH),
    t("bgeu", Format::B, Branch, 1.0, BRANCH),
    // Load/store
    t("lw", Format::I, LoadStore, 6.0, LOAD),
    t("lh", Format::I, LoadStore, 2.0, LOAD),
    t("lb", Format::I, LoadStore, 1.0, LOAD),
    t("sw", Format::S, LoadStore, 4.0, STORE),
    t("sh", Format::S, LoadStore, 1.5, STORE),
    t("sb", Format::S, LoadStore, 0.5, STORE),
    // Jump
    t("jal", Format::J, Jump, 1.5, JAL),
    t("jalr", Format::I, Jump, 1.5, RRI),
    // Custom ALU
    t("cv.abs", Format::R, CustomAlu, 0.5, RR),
    t("cv.sle", Format::R, CustomAlu, 0.5, RRR),
    t("cv.sleu", Format::R, CustomAlu, 0.5, RRR),
    t("cv.min", Format::R, CustomAlu, 1.0, RRR),
    t("cv.max", Format::R, CustomAlu, 1.0, RRR),
    t("cv.minu", Format::R, CustomAlu, 0.5, RRR),
    t("cv.maxu", Format::R, CustomAlu, 0.5, RRR),
    t("cv.clip", Format::I, CustomAlu, 0.5, RRS),
    // Custom bit manipulation
    t("cv.extractr", Format::R, CustomBit, 0.3, RRR),
    t("cv.extractur", Format::R, CustomBit, 0.3, RRR),
    t("cv.insertr", Format::R, CustomBit, 0.3, RRR),
    t("cv.bclrr", Format::R, CustomBit, 0.2, RRR),
    t("cv.bsetr", Format::R, CustomBit, 0.2, RRR),
    t("cv.ror", Format::R, CustomBit, 0.2, RRR),
    t("cv.ff1", Format::R, CustomBit, 0.2, RR),
    t("cv.cnt", Format::R, CustomBit, 0.3, RR),
    // Multiply/divide (multi-cycle)
    t("mul", Format::R, Multiply, 2.5, RRR),
    t("mulh", Format::R, Multiply, 1.0, RRR),
    t("mulhsu", Format::R, Multiply, 0.8, RRR),
    t("mulhu", Format::R, Multiply, 0.8, RRR),
    t("div", Format::R, Multiply, 0.9, RRR),
    t("divu", Format::R, Multiply, 0.7, RRR),
    t("rem", Format::R, Multiply, 0.2, RRR),
    t("remu", Format::R, Multiply, 0.1, RRR),
    // Misaligned memory access (structural hazards)
    InstructionTemplate::new("lw_misaligned", "lw", Format::I, MisalignedMem, 1.0, MIS_LOAD),
    InstructionTemplate::new("lh_misaligned", "lh", Format::I, MisalignedMem, 0.8, MIS_LOAD),
    InstructionTemplate::new("sw_misaligned", "sw", Format::S, MisalignedMem, 0.8, MIS_STORE),
    InstructionTemplate::new("sh_misaligned", "sh", Format::S, MisalignedMem, 0.4, MIS_STORE),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::cv32e40p().unwrap();
        assert_eq!(catalog.len(), CV32E40P_TEMPLATES.len());
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_dispatch_resolution() {
        let catalog = Catalog::cv32e40p().unwrap();
        assert_eq!(
            catalog.get("bltu").unwrap().dispatch,
            Dispatch::Branch(BranchKind::Ltu)
        );
        assert_eq!(
            catalog.get("sh_misaligned").unwrap().dispatch,
            Dispatch::Misaligned(MemAccess::Store)
        );
        assert_eq!(
            catalog.get("lw_misaligned").unwrap().dispatch,
            Dispatch::Misaligned(MemAccess::Load)
        );
        assert_eq!(catalog.get("add").unwrap().dispatch, Dispatch::Plain);
    }

    #[test]
    fn test_every_category_but_immediate_is_populated() {
        let catalog = Catalog::cv32e40p().unwrap();
        for category in Category::ALL {
            let count = catalog
                .entries()
                .iter()
                .filter(|e| e.template.category == category)
                .count();
            if category == Category::Immediate {
                assert_eq!(count, 0);
            } else {
                assert!(count > 0, "{} has no templates", category);
            }
        }
    }

    #[test]
    fn test_misaligned_counterpart() {
        let catalog = Catalog::cv32e40p().unwrap();
        assert_eq!(
            catalog.misaligned_counterpart("lw").unwrap().template.key,
            "lw_misaligned"
        );
        assert!(catalog.misaligned_counterpart("lb").is_none());
        assert!(catalog.misaligned_counterpart("sb").is_none());
    }

    #[test]
    fn test_unknown_branch_rejected() {
        let bad = t("bgt", Format::B, Branch, 1.0, BRANCH);
        let err = Catalog::new([bad]).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedBranch { .. }));
    }

    #[test]
    fn test_duplicate_and_weight_rejected() {
        let add = t("add", Format::R, Arithmetic, 1.0, RRR);
        assert_eq!(
            Catalog::new([add, add]).unwrap_err(),
            CatalogError::DuplicateKey("add".to_string())
        );

        let zero = t("sub", Format::R, Arithmetic, 0.0, RRR);
        assert!(matches!(
            Catalog::new([zero]).unwrap_err(),
            CatalogError::InvalidWeight { .. }
        ));
    }

    #[test]
    fn test_malformed_misaligned_rejected() {
        let no_slot = InstructionTemplate::new("lw_m", "lw", Format::I, MisalignedMem, 1.0, LOAD);
        assert!(matches!(
            Catalog::new([no_slot]).unwrap_err(),
            CatalogError::MalformedMisaligned { .. }
        ));

        let bad_format =
            InstructionTemplate::new("lw_m", "lw", Format::R, MisalignedMem, 1.0, MIS_LOAD);
        assert!(matches!(
            Catalog::new([bad_format]).unwrap_err(),
            CatalogError::MalformedMisaligned { .. }
        ));
    }

    #[test]
    fn test_category_names() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_name("vector"), None);
        assert!(Category::CustomBit.is_extension());
        assert!(!Category::Multiply.is_extension());
    }
}
