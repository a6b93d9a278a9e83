//! AST node types for the RoboBASIC teaching language.
//!
//! Every node carries a [`Span`] for error reporting. Literal payloads are
//! already resolved by the front end (integers parsed, strings unescaped).
//! The tree derives serde so a front end can hand it over as JSON.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program: an ordered list of function declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
    pub span: Span,
}

impl Program {
    pub fn new(functions: Vec<Function>) -> Self {
        let span = functions
            .iter()
            .map(|f| f.span)
            .reduce(Span::merge)
            .unwrap_or_default();
        Self { functions, span }
    }
}

/// `func name(params) body endfunc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Ident,
    pub params: Vec<Param>,
    /// Declared result kind. Only used to synthesize placeholder results
    /// when a call is serialized without being executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeKind>,
    pub body: Block,
    pub span: Span,
}

/// A formal parameter: `x` (by value) or `&x` (by reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub mode: PassMode,
    /// Declared kind, used for placeholder bindings while serializing.
    #[serde(default)]
    pub kind: TypeKind,
    pub span: Span,
}

impl Param {
    pub fn by_value(name: Ident) -> Self {
        let span = name.span;
        Self {
            name,
            mode: PassMode::Value,
            kind: TypeKind::Integer,
            span,
        }
    }

    pub fn by_reference(name: Ident) -> Self {
        Self {
            mode: PassMode::Reference,
            ..Self::by_value(name)
        }
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_reference(&self) -> bool {
        self.mode == PassMode::Reference
    }
}

/// How an argument is handed to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassMode {
    /// The callee receives an independent copy.
    Value,
    /// The callee shares storage with the caller's variable.
    Reference,
}

/// Runtime kinds a value can take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Void,
    #[default]
    Integer,
    Boolean,
    String,
    ArrayInt,
    ArrayBool,
    Color,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Integer => "integer",
            TypeKind::Boolean => "boolean",
            TypeKind::String => "string",
            TypeKind::ArrayInt => "array of integer",
            TypeKind::ArrayBool => "array of boolean",
            TypeKind::Color => "color",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// An ordered statement sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        let span = stmts
            .iter()
            .map(Stmt::span)
            .reduce(Span::merge)
            .unwrap_or_default();
        Self { stmts, span }
    }
}

/// A statement in a code block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `x = expr` or `a[i] = expr`
    Assign(AssignStmt),
    /// `if cond then ... [else ...] endif`
    If(IfStmt),
    /// `while cond do ... endwhile`
    While(WhileStmt),
    /// `return [expr]`
    Return(ReturnStmt),
    /// `read x`
    Read(ReadStmt),
    /// `write expr`
    Write(WriteStmt),
    /// `inirobot`, `avanca`, `gira`, `obstacle`, ... with numeric arguments
    Actuate(ActuateStmt),
    /// `pinta color`
    Paint(PaintStmt),
    /// `estadopintar up|down`
    Pen(PenStmt),
    /// A sensor used for its instruction only.
    Sense(SenseStmt),
    /// `f(args)` in statement position.
    Call(Call),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Read(s) => s.span,
            Stmt::Write(s) => s.span,
            Stmt::Actuate(s) => s.span,
            Stmt::Paint(s) => s.span,
            Stmt::Pen(s) => s.span,
            Stmt::Sense(s) => s.span,
            Stmt::Call(s) => s.span,
        }
    }

    pub fn line(&self) -> u32 {
        self.span().start_line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: AssignTarget,
    pub value: Expr,
    pub span: Span,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Variable(Ident),
    Element { array: Ident, index: Expr },
}

impl AssignTarget {
    /// The variable the assignment binds or mutates.
    pub fn name(&self) -> &Ident {
        match self {
            AssignTarget::Variable(id) => id,
            AssignTarget::Element { array, .. } => array,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadStmt {
    pub target: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuateStmt {
    pub actuator: Actuator,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintStmt {
    pub color: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenStmt {
    pub down: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseStmt {
    pub sensor: Sensor,
    pub span: Span,
}

/// `name(args...)`, in statement or expression position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Robot primitives
// ══════════════════════════════════════════════════════════════════════════════

/// Actuator primitives taking numeric arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    /// `inirobot x, y, heading`
    Locate,
    /// `avanca n`
    Forward,
    /// `retrocedeix n`
    Backward,
    /// `gira n`
    Turn,
    /// `obstacle x, y, w, h`
    Obstacle,
    /// `noobstacle x, y, w, h`
    Invisible,
}

impl Actuator {
    /// The instruction name in the translated program.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Actuator::Locate => "rLocate",
            Actuator::Forward | Actuator::Backward => "rForward",
            Actuator::Turn => "rTurn",
            Actuator::Obstacle => "CircleWH",
            Actuator::Invisible => "rInvisible",
        }
    }
}

/// Sensor primitives. None of them reads a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    /// `sentir`
    Feel,
    /// `infrared`
    Infrared,
    /// bumper contact
    Bumper,
    /// heading
    Compass,
    /// distance to a colored beacon
    Beacon(Color),
    /// color seen in a direction
    Look(Box<Expr>),
}

/// Color symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Black,
    White,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Black => "black",
            Color::White => "white",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let span = operand.span;
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// The variable name if this is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // ── Literals ──
    IntLit(i64),
    BoolLit(bool),
    StringLit(String),
    ColorLit(Color),

    // ── Variables & Calls ──
    /// `x`
    Identifier(String),
    /// `a[i]`
    Index { array: Ident, index: Box<Expr> },
    /// `f(args...)` must yield a non-void value
    Call(Call),
    /// A sensor reading.
    Sense(Sensor),

    // ── Operators ──
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    // ── Grouping ──
    /// `(expr)`
    Paren(Box<Expr>),
}

// ── Binary Operators ──────────────────────────────────────────────────────────

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Logical
    Or,
    And,
    // Bitwise
    BitOr,
    BitAnd,
    // Comparison
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// The operator as it is written in the translated program.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::BitOr => "|",
            BinOp::BitAnd => "&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::NotEq
                | BinOp::Less
                | BinOp::Greater
                | BinOp::LessEq
                | BinOp::GreaterEq
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Neg,
    /// `not x`
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64, line: u32) -> Expr {
        Expr::new(ExprKind::IntLit(v), Span::line(line))
    }

    #[test]
    fn binary_span_covers_both_operands() {
        let e = Expr::binary(int(1, 2), BinOp::Add, int(2, 4));
        assert_eq!(e.span.start_line, 2);
        assert_eq!(e.span.end_line, 4);
    }

    #[test]
    fn block_span_from_statements() {
        let stmts = vec![
            Stmt::Write(WriteStmt {
                value: int(1, 3),
                span: Span::line(3),
            }),
            Stmt::Write(WriteStmt {
                value: int(2, 5),
                span: Span::line(5),
            }),
        ];
        let block = Block::new(stmts);
        assert_eq!(block.span.start_line, 3);
        assert_eq!(block.span.end_line, 5);
        assert_eq!(Block::new(vec![]).span, Span::default());
    }

    #[test]
    fn param_constructors() {
        let p = Param::by_reference(Ident::new("x", Span::line(1)));
        assert!(p.is_reference());
        assert_eq!(p.kind, TypeKind::Integer);
        let q = Param::by_value(Ident::new("b", Span::line(1))).with_kind(TypeKind::Boolean);
        assert!(!q.is_reference());
        assert_eq!(q.kind, TypeKind::Boolean);
    }

    #[test]
    fn operator_texts() {
        assert_eq!(BinOp::Eq.as_str(), "==");
        assert_eq!(BinOp::And.as_str(), "&&");
        assert_eq!(UnaryOp::Not.as_str(), "!");
        assert!(BinOp::LessEq.is_relational());
        assert!(BinOp::Mod.is_arithmetic());
        assert!(!BinOp::BitOr.is_relational());
    }

    #[test]
    fn actuator_mnemonics() {
        assert_eq!(Actuator::Locate.mnemonic(), "rLocate");
        assert_eq!(Actuator::Backward.mnemonic(), "rForward");
        assert_eq!(Actuator::Obstacle.mnemonic(), "CircleWH");
    }

    #[test]
    fn program_json_round_trip() {
        let main = Function {
            name: Ident::new("main", Span::line(1)),
            params: vec![],
            returns: None,
            body: Block::new(vec![Stmt::Paint(PaintStmt {
                color: Expr::new(ExprKind::ColorLit(Color::Blue), Span::line(2)),
                span: Span::line(2),
            })]),
            span: Span::new(1, 1, 3, 8),
        };
        let program = Program::new(vec![main]);
        let json = serde_json::to_string(&program).unwrap();
        assert!(json.contains("\"blue\""));
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn param_kind_defaults_when_absent() {
        let json = r#"{"name":{"name":"n","span":{"start_line":1,"start_col":1,"end_line":1,"end_col":1}},
            "mode":"reference",
            "span":{"start_line":1,"start_col":1,"end_line":1,"end_col":1}}"#;
        let p: Param = serde_json::from_str(json).unwrap();
        assert!(p.is_reference());
        assert_eq!(p.kind, TypeKind::Integer);
    }
}
