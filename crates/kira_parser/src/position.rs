use std::fmt::Display;

/// A 1-based line/column location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A value paired with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct WithPos<T> {
    pub value: T,
    pub pos: Position,
}

impl<T> WithPos<T> {
    pub const fn new(value: T, pos: Position) -> Self {
        WithPos { value, pos }
    }
}
