//! Target instruction set description
//!
//! Registers, branch semantics, and the instruction template catalog for the
//! CV32E40P core (RV32IM plus the PULP custom ALU and bit-manipulation
//! extensions).

pub mod branch;
pub mod catalog;
pub mod register;

pub use branch::BranchKind;
pub use catalog::{
    Catalog, CatalogEntry, CatalogError, Category, Dispatch, Format, InstructionTemplate,
    MemAccess, OperandSlot, CV32E40P_TEMPLATES,
};
pub use register::Register;
