//! Label manager
//!
//! Issues run-unique labels (`label_0`, `label_1`, ...), hands out branch
//! and jump targets that are either reused (backward or repeated references)
//! or fresh (forward references), and back-fills every label that was
//! referenced but never written into the stream.

use crate::stream::Program;
use rand::Rng;

/// Chance that a reference reuses an existing label
pub const REUSE_PROBABILITY: f64 = 0.3;

/// A remembered label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// Whether a definition has been written into the stream
    pub defined: bool,
}

/// Per-session label state. Names come from a monotonic counter and are
/// never reused.
#[derive(Debug, Clone)]
pub struct LabelManager {
    labels: Vec<Label>,
    reuse_probability: f64,
}

impl Default for LabelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelManager {
    pub fn new() -> Self {
        Self::with_reuse_probability(REUSE_PROBABILITY)
    }

    /// # Panics
    ///
    /// Panics if `probability` is outside `[0, 1]`.
    pub fn with_reuse_probability(probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "reuse probability must be in [0, 1], got {}",
            probability
        );
        Self {
            labels: Vec::new(),
            reuse_probability: probability,
        }
    }

    /// Create and remember a new, not yet defined label.
    pub fn new_label(&mut self) -> String {
        let name = format!("label_{}", self.labels.len());
        self.labels.push(Label {
            name: name.clone(),
            defined: false,
        });
        name
    }

    /// Create a new label and write its definition at the current position.
    pub fn define_new(&mut self, program: &mut Program) -> String {
        let name = self.new_label();
        program.label(&name);
        if let Some(label) = self.labels.last_mut() {
            label.defined = true;
        }
        name
    }

    /// Pick a branch/jump target: an existing label with the reuse
    /// probability, otherwise a fresh forward reference.
    pub fn resolve_reference<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        let reuse = rng.gen_bool(self.reuse_probability);
        if reuse && !self.labels.is_empty() {
            let idx = rng.gen_range(0..self.labels.len());
            self.labels[idx].name.clone()
        } else {
            self.new_label()
        }
    }

    /// Write a definition followed by a `nop` for every label that has not
    /// been defined yet, in creation order. Returns how many were written.
    pub fn flush_undefined(&mut self, program: &mut Program) -> usize {
        let mut flushed = 0;
        for label in self.labels.iter_mut().filter(|l| !l.defined) {
            program.label(&label.name);
            program.instr("nop");
            label.defined = true;
            flushed += 1;
        }
        tracing::debug!(flushed, total = self.labels.len(), "back-filled undefined labels");
        flushed
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn undefined(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter().filter(|l| !l.defined)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
