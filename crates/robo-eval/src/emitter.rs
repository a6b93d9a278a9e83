//! Instruction log and the text helpers used to reconstruct source forms.

/// What an evaluation pass does with the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Execute without emitting anything but call markers.
    Silent,
    /// Execute and emit.
    Live,
    /// Emit only. Nothing executed here survives the walk.
    Dry,
}

impl Phase {
    pub fn emits(self) -> bool {
        matches!(self, Phase::Live | Phase::Dry)
    }

    pub fn executes(self) -> bool {
        matches!(self, Phase::Live | Phase::Silent)
    }
}

/// Nesting depth and phase of the statement being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub depth: usize,
    pub phase: Phase,
}

impl Cursor {
    /// Cursor for the top of a function body; its statements sit one level in.
    pub fn body(phase: Phase) -> Self {
        Self { depth: 0, phase }
    }

    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    pub fn with_phase(self, phase: Phase) -> Self {
        Self { phase, ..self }
    }

    /// Cursor for a callee run from a call site at `self`. Its top-level
    /// statements line up with the call and execute Silent.
    pub fn callee(self) -> Self {
        Self {
            depth: self.depth.saturating_sub(1),
            phase: Phase::Silent,
        }
    }
}

/// Append-only log of emitted instructions.
#[derive(Debug, Clone)]
pub struct Emitter {
    lines: Vec<String>,
    indent_width: usize,
}

impl Emitter {
    pub fn new(indent_width: usize) -> Self {
        Self {
            lines: Vec::new(),
            indent_width,
        }
    }

    /// Append an unindented line regardless of phase (block labels and markers).
    pub fn label(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    /// Append `text` at the cursor's depth if its phase emits.
    pub fn emit(&mut self, at: Cursor, text: impl AsRef<str>) {
        if at.phase.emits() {
            self.push(at.depth, text.as_ref());
        }
    }

    /// Append a call marker at the cursor's depth. Markers are written in
    /// every phase, so each executed call leaves one.
    pub fn mark(&mut self, at: Cursor, text: impl AsRef<str>) {
        self.push(at.depth, text.as_ref());
    }

    fn push(&mut self, depth: usize, text: &str) {
        let indent = " ".repeat(depth * self.indent_width);
        self.lines.push(format!("{indent}{text}"));
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
}

/// `left op right`
pub fn infix(left: &str, op: &str, right: &str) -> String {
    format!("{left} {op} {right}")
}

/// Comma-joined argument list.
pub fn joined<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Negation of an expression text, parenthesized unless it is atomic.
pub fn negated(text: &str) -> String {
    let atomic = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if atomic {
        format!("-{text}")
    } else {
        format!("-({text})")
    }
}
