//! Runtime error types for the RoboBASIC evaluator.

use robo_types::ast::TypeKind;
use thiserror::Error;

/// Evaluation error. Every kind is fatal: the run stops where it is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Two functions share a name (raised while loading, before execution).
    #[error("multiple definitions of function '{0}'")]
    DuplicateDefinition(String),

    #[error("function '{0}' not declared")]
    UndeclaredFunction(String),

    #[error("incorrect number of parameters calling function '{function}': expected {expected}, found {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    /// A reference parameter was handed something other than a variable.
    #[error("wrong argument for pass by reference to parameter '{param}' of '{function}'")]
    InvalidArgument { function: String, param: String },

    #[error("expecting {expected} expression, found {found}")]
    TypeMismatch { expected: String, found: TypeKind },

    /// `read` got a token that is not an integer.
    #[error("format error when reading a number: '{0}'")]
    FormatError(String),

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// A call in expression position returned void.
    #[error("function '{0}' expected to return a value")]
    VoidResultUsed(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    /// Trace sink or input stream failure.
    #[error("i/o error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EvalError {
    pub(crate) fn type_mismatch(expected: impl Into<String>, found: TypeKind) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found,
        }
    }
}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// An [`EvalError`] paired with the line that was executing when it was raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct RuntimeError {
    pub kind: EvalError,
    pub line: u32,
}

impl RuntimeError {
    pub fn new(kind: EvalError, line: u32) -> Self {
        Self { kind, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = EvalError::ArityMismatch {
            function: "f".into(),
            expected: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "incorrect number of parameters calling function 'f': expected 2, found 1"
        );
        let err = EvalError::type_mismatch("boolean", TypeKind::Integer);
        assert_eq!(err.to_string(), "expecting boolean expression, found integer");
    }

    #[test]
    fn runtime_error_carries_line() {
        let err = RuntimeError::new(EvalError::UndefinedVariable("x".into()), 12);
        assert_eq!(err.to_string(), "line 12: undefined variable 'x'");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(EvalError::from(io), EvalError::Io("gone".into()));
    }
}
