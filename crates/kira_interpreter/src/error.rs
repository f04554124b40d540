use std::fmt::Display;

use kira_parser::position::Position;

/// What went wrong, grouped by the error-kind tag reported to the user.
#[derive(Debug, PartialEq, Clone)]
pub enum ErrorKind {
    /// Unbound identifier or duplicate definition in the same scope
    Name(String),
    /// Assignment to a `const` binding
    Const(String),
    /// Operator, index or builtin applied to the wrong kind of value
    Type(String),
    /// Array or string index out of range, `pop` on an empty array
    Index(String),
    /// Dict lookup miss
    Key(String),
    /// Wrong number of arguments to a function or builtin
    Arity(String),
    /// Conversion failure or invalid argument value
    Value(String),
    /// `/` or `%` with a zero divisor
    ZeroDivision(String),
    /// The call-depth guard tripped
    Recursion(String),
}

/// A runtime error, carrying the position of the expression that raised it
/// once the evaluator has stamped one on (builtins raise unpositioned errors).
#[derive(Debug, PartialEq, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub position: Option<Position>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> RuntimeError {
        RuntimeError {
            kind,
            position: None,
        }
    }

    pub fn name_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Name(message.into()))
    }

    pub fn const_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Const(message.into()))
    }

    pub fn type_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Type(message.into()))
    }

    pub fn index_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Index(message.into()))
    }

    pub fn key_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Key(message.into()))
    }

    pub fn arity_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Arity(message.into()))
    }

    pub fn value_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Value(message.into()))
    }

    pub fn zero_division(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::ZeroDivision(message.into()))
    }

    pub fn recursion_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(ErrorKind::Recursion(message.into()))
    }

    /// Attach a position unless the error already carries one; the innermost
    /// position wins so re-stamping at outer nodes is harmless.
    pub fn at(mut self, position: Position) -> RuntimeError {
        if self.position.is_none() {
            self.position = Some(position);
        }
        self
    }

    /// The error-kind tag used in diagnostics (`TypeError`, `NameError`, ...).
    pub fn name(&self) -> &'static str {
        match self.kind {
            ErrorKind::Name(_) => "NameError",
            ErrorKind::Const(_) => "ConstError",
            ErrorKind::Type(_) => "TypeError",
            ErrorKind::Index(_) => "IndexError",
            ErrorKind::Key(_) => "KeyError",
            ErrorKind::Arity(_) => "ArityError",
            ErrorKind::Value(_) => "ValueError",
            ErrorKind::ZeroDivision(_) => "ZeroDivisionError",
            ErrorKind::Recursion(_) => "RecursionError",
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::Name(message)
            | ErrorKind::Const(message)
            | ErrorKind::Type(message)
            | ErrorKind::Index(message)
            | ErrorKind::Key(message)
            | ErrorKind::Arity(message)
            | ErrorKind::Value(message)
            | ErrorKind::ZeroDivision(message)
            | ErrorKind::Recursion(message) => write!(f, "{}", message),
        }
    }
}
