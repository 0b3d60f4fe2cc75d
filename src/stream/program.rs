//! Line buffer for a generated assembly program

use std::fmt;

/// Indentation for instruction and comment lines
pub const INDENT: &str = "    ";

/// Ordered assembly lines: comments, directives, labels, instructions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level `# text` comment
    pub fn header(&mut self, text: &str) {
        self.lines.push(format!("# {}", text));
    }

    /// Indented `# text` comment
    pub fn comment(&mut self, text: &str) {
        self.lines.push(format!("{}# {}", INDENT, text));
    }

    pub fn directive(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    pub fn label(&mut self, name: &str) {
        self.lines.push(format!("{}:", name));
    }

    pub fn instr(&mut self, text: &str) {
        self.lines.push(format!("{}{}", INDENT, text));
    }

    /// Instruction with a trailing comment
    pub fn instr_with_note(&mut self, text: &str, note: &str) {
        self.lines.push(format!("{}{}  # {}", INDENT, text, note));
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Final text, newline-terminated
    pub fn into_text(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_shapes() {
        let mut program = Program::new();
        program.header("title");
        program.directive(".section .text");
        program.label("_start");
        program.instr("nop");
        program.instr_with_note("nop", "padding");
        program.comment("note");
        program.blank();

        assert_eq!(
            program.lines(),
            [
                "# title",
                ".section .text",
                "_start:",
                "    nop",
                "    nop  # padding",
                "    # note",
                "",
            ]
        );
    }

    #[test]
    fn test_text_matches_display() {
        let mut program = Program::new();
        program.label("a");
        program.instr("nop");
        let shown = program.to_string();
        assert_eq!(program.into_text(), shown);
        assert_eq!(shown, "a:\n    nop\n");
    }
}
