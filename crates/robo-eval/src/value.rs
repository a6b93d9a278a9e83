//! Runtime values.
//!
//! A [`Value`] is a payload plus the source-text form it was computed
//! from. The text is what lands in the instruction log, so every operator
//! rebuilds it from its operands' texts.

use crate::emitter::infix;
use crate::error::{EvalError, EvalResult};
use robo_types::ast::{BinOp, Color, TypeKind, UnaryOp};
use std::cmp::Ordering;
use std::fmt;

/// Tagged payload of a runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Void,
    Integer(i64),
    Boolean(bool),
    String(String),
    ArrayInt(Vec<i64>),
    ArrayBool(Vec<bool>),
    Color(Color),
}

/// A runtime value together with its reconstructed source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    payload: Payload,
    text: String,
}

impl Value {
    fn from_payload(payload: Payload) -> Self {
        let text = match &payload {
            Payload::Void => String::new(),
            Payload::String(s) => format!("{s:?}"),
            other => display_payload(other),
        };
        Self { payload, text }
    }

    pub fn void() -> Self {
        Self::from_payload(Payload::Void)
    }

    pub fn integer(n: i64) -> Self {
        Self::from_payload(Payload::Integer(n))
    }

    pub fn boolean(b: bool) -> Self {
        Self::from_payload(Payload::Boolean(b))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::from_payload(Payload::String(s.into()))
    }

    pub fn color(c: Color) -> Self {
        Self::from_payload(Payload::Color(c))
    }

    pub fn int_array(items: Vec<i64>) -> Self {
        Self::from_payload(Payload::ArrayInt(items))
    }

    pub fn bool_array(items: Vec<bool>) -> Self {
        Self::from_payload(Payload::ArrayBool(items))
    }

    /// Stand-in value of `kind` for code that is serialized but not executed.
    pub fn placeholder(kind: TypeKind, text: impl Into<String>) -> Self {
        let payload = match kind {
            TypeKind::Void => Payload::Void,
            TypeKind::Integer => Payload::Integer(0),
            TypeKind::Boolean => Payload::Boolean(false),
            TypeKind::String => Payload::String(String::new()),
            TypeKind::ArrayInt => Payload::ArrayInt(Vec::new()),
            TypeKind::ArrayBool => Payload::ArrayBool(Vec::new()),
            TypeKind::Color => Payload::Color(Color::Green),
        };
        Self {
            payload,
            text: text.into(),
        }
    }

    /// Replace the source text, keeping the payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> TypeKind {
        match self.payload {
            Payload::Void => TypeKind::Void,
            Payload::Integer(_) => TypeKind::Integer,
            Payload::Boolean(_) => TypeKind::Boolean,
            Payload::String(_) => TypeKind::String,
            Payload::ArrayInt(_) => TypeKind::ArrayInt,
            Payload::ArrayBool(_) => TypeKind::ArrayBool,
            Payload::Color(_) => TypeKind::Color,
        }
    }

    pub fn is_void(&self) -> bool {
        self.payload == Payload::Void
    }

    // ── Type checks ──────────────────────────────────────────────────────

    pub fn as_int(&self) -> EvalResult<i64> {
        match self.payload {
            Payload::Integer(n) => Ok(n),
            _ => Err(EvalError::type_mismatch("numerical", self.kind())),
        }
    }

    pub fn as_bool(&self) -> EvalResult<bool> {
        match self.payload {
            Payload::Boolean(b) => Ok(b),
            _ => Err(EvalError::type_mismatch("boolean", self.kind())),
        }
    }

    pub fn as_color(&self) -> EvalResult<Color> {
        match self.payload {
            Payload::Color(c) => Ok(c),
            _ => Err(EvalError::type_mismatch("color", self.kind())),
        }
    }

    // ── Operators ────────────────────────────────────────────────────────

    /// `+ - * / %` on two integers. Division and modulo by zero fail.
    pub(crate) fn arithmetic(mut self, op: BinOp, rhs: &Value) -> EvalResult<Value> {
        let a = self.as_int()?;
        let b = rhs.as_int()?;
        let n = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div | BinOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
            BinOp::Div => a.wrapping_div(b),
            BinOp::Mod => a.wrapping_rem(b),
            _ => unreachable!("{} is not arithmetic", op.as_str()),
        };
        self.payload = Payload::Integer(n);
        self.text = infix(&self.text, op.as_str(), &rhs.text);
        Ok(self)
    }

    /// `== != < <= > >=`. Both operands must share a kind; ordering is
    /// defined on integers, booleans and strings.
    pub(crate) fn compare(mut self, op: BinOp, rhs: &Value) -> EvalResult<Value> {
        if self.kind() != rhs.kind() {
            return Err(EvalError::type_mismatch(self.kind().as_str(), rhs.kind()));
        }
        let ordering = match (&self.payload, &rhs.payload) {
            (Payload::Integer(a), Payload::Integer(b)) => Some(a.cmp(b)),
            (Payload::Boolean(a), Payload::Boolean(b)) => Some(a.cmp(b)),
            (Payload::String(a), Payload::String(b)) => Some(a.cmp(b)),
            _ => None,
        };
        let ordered = |test: fn(Ordering) -> bool| {
            ordering
                .map(test)
                .ok_or_else(|| EvalError::type_mismatch("integer, boolean or string", rhs.kind()))
        };
        let result = match op {
            BinOp::Eq => self.payload == rhs.payload,
            BinOp::NotEq => self.payload != rhs.payload,
            BinOp::Less => ordered(Ordering::is_lt)?,
            BinOp::LessEq => ordered(Ordering::is_le)?,
            BinOp::Greater => ordered(Ordering::is_gt)?,
            BinOp::GreaterEq => ordered(Ordering::is_ge)?,
            _ => unreachable!("{} is not relational", op.as_str()),
        };
        self.payload = Payload::Boolean(result);
        self.text = infix(&self.text, op.as_str(), &rhs.text);
        Ok(self)
    }

    /// `| &` bit for bit on integers, without short-circuit on booleans.
    pub(crate) fn bitwise(mut self, op: BinOp, rhs: &Value) -> EvalResult<Value> {
        self.payload = match (&self.payload, &rhs.payload, op) {
            (Payload::Integer(a), Payload::Integer(b), BinOp::BitOr) => Payload::Integer(a | b),
            (Payload::Integer(a), Payload::Integer(b), BinOp::BitAnd) => Payload::Integer(a & b),
            (Payload::Boolean(a), Payload::Boolean(b), BinOp::BitOr) => Payload::Boolean(a | b),
            (Payload::Boolean(a), Payload::Boolean(b), BinOp::BitAnd) => Payload::Boolean(a & b),
            (Payload::Integer(_) | Payload::Boolean(_), _, _) => {
                return Err(EvalError::type_mismatch(self.kind().as_str(), rhs.kind()))
            }
            _ => return Err(EvalError::type_mismatch("integer or boolean", self.kind())),
        };
        self.text = infix(&self.text, op.as_str(), &rhs.text);
        Ok(self)
    }

    pub(crate) fn unary(mut self, op: UnaryOp) -> EvalResult<Value> {
        self.payload = match op {
            UnaryOp::Plus => Payload::Integer(self.as_int()?),
            UnaryOp::Neg => Payload::Integer(self.as_int()?.wrapping_neg()),
            UnaryOp::Not => Payload::Boolean(!self.as_bool()?),
        };
        self.text = format!("{}{}", op.as_str(), self.text);
        Ok(self)
    }

    // ── Arrays ───────────────────────────────────────────────────────────

    /// An empty array able to hold `element`.
    pub fn array_for(element: &Value) -> EvalResult<Value> {
        match element.payload {
            Payload::Integer(_) => Ok(Value::int_array(Vec::new())),
            Payload::Boolean(_) => Ok(Value::bool_array(Vec::new())),
            _ => Err(EvalError::type_mismatch("integer or boolean", element.kind())),
        }
    }

    /// Read element `index`, typed by the array's element kind.
    pub fn element(&self, index: i64) -> EvalResult<Value> {
        let out_of_bounds = |len| EvalError::IndexOutOfBounds { index, len };
        match &self.payload {
            Payload::ArrayInt(items) => usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .map(|n| Value::integer(*n))
                .ok_or_else(|| out_of_bounds(items.len())),
            Payload::ArrayBool(items) => usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .map(|b| Value::boolean(*b))
                .ok_or_else(|| out_of_bounds(items.len())),
            _ => Err(EvalError::type_mismatch("array", self.kind())),
        }
    }

    /// Store `element` at `index`, growing the array with defaults as needed.
    pub fn set_element(&mut self, index: i64, element: &Value) -> EvalResult<()> {
        let len = self.len();
        let kind = self.kind();
        let i = usize::try_from(index).map_err(|_| EvalError::IndexOutOfBounds { index, len })?;
        match (&mut self.payload, &element.payload) {
            (Payload::ArrayInt(items), Payload::Integer(n)) => store(items, i, *n),
            (Payload::ArrayBool(items), Payload::Boolean(b)) => store(items, i, *b),
            (Payload::ArrayInt(_), _) => {
                return Err(EvalError::type_mismatch("numerical", element.kind()))
            }
            (Payload::ArrayBool(_), _) => {
                return Err(EvalError::type_mismatch("boolean", element.kind()))
            }
            _ => return Err(EvalError::type_mismatch("array", kind)),
        }
        self.text = display_payload(&self.payload);
        Ok(())
    }

    /// Element count for arrays, zero otherwise.
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::ArrayInt(items) => items.len(),
            Payload::ArrayBool(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn store<T: Copy + Default>(items: &mut Vec<T>, index: usize, item: T) {
    if index >= items.len() {
        items.resize(index + 1, T::default());
    }
    items[index] = item;
}

fn display_payload(payload: &Payload) -> String {
    fn list<T: fmt::Display>(items: &[T]) -> String {
        let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
        format!("[{}]", parts.join(", "))
    }
    match payload {
        Payload::Void => "void".to_string(),
        Payload::Integer(n) => n.to_string(),
        Payload::Boolean(b) => b.to_string(),
        Payload::String(s) => format!("{s:?}"),
        Payload::ArrayInt(items) => list(items),
        Payload::ArrayBool(items) => list(items),
        Payload::Color(c) => c.to_string(),
    }
}

impl fmt::Display for Value {
    /// Formats the payload, not the source text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_payload(&self.payload))
    }
}
