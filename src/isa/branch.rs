//! Conditional branch kinds and their comparison semantics

use std::fmt;

/// RV32I conditional branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Eq,
    Ne,
    /// Signed less than
    Lt,
    /// Signed greater or equal
    Ge,
    /// Unsigned less than
    Ltu,
    /// Unsigned greater or equal
    Geu,
}

impl BranchKind {
    pub const ALL: [BranchKind; 6] = [
        BranchKind::Eq,
        BranchKind::Ne,
        BranchKind::Lt,
        BranchKind::Ge,
        BranchKind::Ltu,
        BranchKind::Geu,
    ];

    /// Resolve the branch rule for a mnemonic, `None` if there is no rule.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        match mnemonic {
            "beq" => Some(BranchKind::Eq),
            "bne" => Some(BranchKind::Ne),
            "blt" => Some(BranchKind::Lt),
            "bge" => Some(BranchKind::Ge),
            "bltu" => Some(BranchKind::Ltu),
            "bgeu" => Some(BranchKind::Geu),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            BranchKind::Eq => "beq",
            BranchKind::Ne => "bne",
            BranchKind::Lt => "blt",
            BranchKind::Ge => "bge",
            BranchKind::Ltu => "bltu",
            BranchKind::Geu => "bgeu",
        }
    }

    /// Evaluate the branch condition on two register values.
    pub fn is_taken(&self, rs1: i32, rs2: i32) -> bool {
        match self {
            BranchKind::Eq => rs1 == rs2,
            BranchKind::Ne => rs1 != rs2,
            BranchKind::Lt => rs1 < rs2,
            BranchKind::Ge => rs1 >= rs2,
            BranchKind::Ltu => (rs1 as u32) < (rs2 as u32),
            BranchKind::Geu => (rs1 as u32) >= (rs2 as u32),
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
