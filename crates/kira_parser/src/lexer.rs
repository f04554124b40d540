use std::fmt::Display;
use std::num::{ParseFloatError, ParseIntError};

use crate::position::{Position, WithPos};
use crate::token::Token;

#[derive(Debug, PartialEq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    UnterminatedString,
    InvalidInt(ParseIntError),
    InvalidFloat(ParseFloatError),
}

#[derive(Debug, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: Position,
}

impl LexError {
    fn new(kind: LexErrorKind, pos: Position) -> LexError {
        LexError { kind, pos }
    }

    /// The error-kind tag used in diagnostics.
    pub fn name(&self) -> &'static str {
        "LexError"
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            LexErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected character '{}'", c),
            LexErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            LexErrorKind::InvalidInt(err) => write!(f, "invalid integer literal: {}", err),
            LexErrorKind::InvalidFloat(err) => write!(f, "invalid float literal: {}", err),
        }
    }
}

type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    source: &'a str,
    /// Byte offset of the next unread character.
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Get the next character without consuming it.
    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    /// Get the character after the next one without consuming anything.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Consume the next character and keep the line/column counters current.
    fn read_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Consume the next character if it matches `expected`.
    fn consume(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.read_char();
            true
        } else {
            false
        }
    }

    /// Consume whitespace (newlines included; statements are not
    /// line-delimited) and `#` comments until something meaningful is found.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.read_char();
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.read_char();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read the next characters as a string, handling escape sequences.
    /// The closing quote must match the opening one.
    fn read_string(&mut self, opening: char, start: Position) -> LexResult<Token> {
        let mut value = String::new();

        loop {
            match self.read_char() {
                Some(c) if c == opening => break,
                Some('\\') => match self.read_char() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some('\'') => value.push('\''),
                    // Unknown escapes are kept as written
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                },
                // Strings do not span lines
                Some('\n') | None => {
                    return Err(LexError::new(LexErrorKind::UnterminatedString, start))
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::String(value))
    }

    /// Read the current and following characters as a number token.
    fn read_number(&mut self, first: char, start: Position) -> LexResult<Token> {
        let mut literal = String::new();
        literal.push(first);

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                literal.push(c);
                self.read_char();
            } else {
                break;
            }
        }

        // A dot belongs to the number only when a digit follows it
        let is_float =
            self.peek_char() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit());
        if is_float {
            literal.push('.');
            self.read_char();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    literal.push(c);
                    self.read_char();
                } else {
                    break;
                }
            }
        }

        if is_float {
            match literal.parse() {
                Ok(value) => Ok(Token::Float(value)),
                Err(err) => Err(LexError::new(LexErrorKind::InvalidFloat(err), start)),
            }
        } else {
            match literal.parse() {
                Ok(value) => Ok(Token::Integer(value)),
                Err(err) => Err(LexError::new(LexErrorKind::InvalidInt(err), start)),
            }
        }
    }

    /// Read the current and following characters as an identifier or a keyword.
    fn read_identifier_or_keyword(&mut self, first: char) -> Token {
        let mut identifier = String::new();
        identifier.push(first);

        while let Some(c) = self.peek_char() {
            if is_identifier_char(c) {
                identifier.push(c);
                self.read_char();
            } else {
                break;
            }
        }

        match Token::lookup_keyword(&identifier) {
            Some(keyword_token) => keyword_token,
            None => Token::Identifier(identifier),
        }
    }

    /// Read a new token from the source. Once the end of input is reached,
    /// every further call keeps returning `Eof`.
    pub fn next_token(&mut self) -> LexResult<WithPos<Token>> {
        self.skip_whitespace_and_comments();

        let pos = self.position();

        let c = match self.read_char() {
            Some(c) => c,
            None => return Ok(WithPos::new(Token::Eof, pos)),
        };

        let token = match c {
            '+' => {
                if self.consume('=') {
                    Token::PlusEqual
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if self.consume('=') {
                    Token::MinusEqual
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if self.consume('*') {
                    Token::StarStar
                } else {
                    Token::Star
                }
            }
            '/' => Token::Slash,
            '%' => Token::Percent,

            '=' => {
                if self.consume('=') {
                    Token::EqualEqual
                } else {
                    Token::Equal
                }
            }
            '!' => {
                if self.consume('=') {
                    Token::BangEqual
                } else {
                    // Logical negation is the `not` keyword; a bare `!` is not a token
                    return Err(LexError::new(LexErrorKind::UnexpectedCharacter(c), pos));
                }
            }
            '<' => {
                if self.consume('=') {
                    Token::LessEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if self.consume('=') {
                    Token::GreaterEqual
                } else {
                    Token::GreaterThan
                }
            }

            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,

            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,

            '"' | '\'' => self.read_string(c, pos)?,

            c if c.is_ascii_digit() => self.read_number(c, pos)?,
            c if is_identifier_start(c) => self.read_identifier_or_keyword(c),

            _ => return Err(LexError::new(LexErrorKind::UnexpectedCharacter(c), pos)),
        };

        Ok(WithPos::new(token, pos))
    }
}

/// Whether or not the given character may start an identifier.
/// Identifiers are ASCII-only; string literals may carry arbitrary UTF-8.
fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Whether or not the given character may continue an identifier.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use crate::lexer::{LexError, LexErrorKind, Lexer};
    use crate::position::Position;
    use crate::token::Token;

    fn lex_all(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.value == Token::Eof {
                break;
            }
            tokens.push(tok.value);
        }
        tokens
    }

    #[test]
    fn test_operators() {
        let input = "+ - * / % ** = += -= == != < > <= >=";
        assert_eq!(
            lex_all(input),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::StarStar,
                Token::Equal,
                Token::PlusEqual,
                Token::MinusEqual,
                Token::EqualEqual,
                Token::BangEqual,
                Token::LessThan,
                Token::GreaterThan,
                Token::LessEqual,
                Token::GreaterEqual,
            ]
        );
    }

    #[test]
    fn test_greedy_longest_match() {
        // `**` before `*`, `<=` before `<`, even with no spacing
        assert_eq!(
            lex_all("***<=<"),
            vec![
                Token::StarStar,
                Token::Star,
                Token::LessEqual,
                Token::LessThan,
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        let input = ",:;(){}[]";
        assert_eq!(
            lex_all(input),
            vec![
                Token::Comma,
                Token::Colon,
                Token::Semicolon,
                Token::LeftParen,
                Token::RightParen,
                Token::LeftBrace,
                Token::RightBrace,
                Token::LeftBracket,
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_identifiers_and_keywords() {
        let input = "let x = while_ furry for in";
        assert_eq!(
            lex_all(input),
            vec![
                Token::Let,
                Token::Identifier("x".to_owned()),
                Token::Equal,
                Token::Identifier("while_".to_owned()),
                Token::Identifier("furry".to_owned()),
                Token::For,
                Token::In,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex_all("0 42 3.14 10.0"),
            vec![
                Token::Integer(0),
                Token::Integer(42),
                Token::Float(3.14),
                Token::Float(10.0),
            ]
        );
    }

    #[test]
    fn test_dot_without_digits_is_not_part_of_number() {
        let mut lexer = Lexer::new("1.");
        assert_eq!(lexer.next_token().unwrap().value, Token::Integer(1));
        match lexer.next_token() {
            Err(LexError {
                kind: LexErrorKind::UnexpectedCharacter('.'),
                ..
            }) => {}
            result => panic!("expected unexpected-character error but got {:?}", result),
        }
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex_all("\"foo bar\" 'single' \"a\\tb\\n\" \"say \\\"hi\\\"\""),
            vec![
                Token::String("foo bar".to_owned()),
                Token::String("single".to_owned()),
                Token::String("a\tb\n".to_owned()),
                Token::String("say \"hi\"".to_owned()),
            ]
        );
    }

    #[test]
    fn test_unknown_escape_kept_literally() {
        assert_eq!(lex_all("\"a\\qb\""), vec![Token::String("a\\qb".to_owned())]);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"not closed");
        match lexer.next_token() {
            Err(LexError {
                kind: LexErrorKind::UnterminatedString,
                pos,
            }) => assert_eq!(pos, Position::new(1, 1)),
            result => panic!("expected unterminated string error but got {:?}", result),
        }
    }

    #[test]
    fn test_comments_and_newlines_are_skipped() {
        let input = "let x = 1 # trailing comment\n# whole line\nx";
        assert_eq!(
            lex_all(input),
            vec![
                Token::Let,
                Token::Identifier("x".to_owned()),
                Token::Equal,
                Token::Integer(1),
                Token::Identifier("x".to_owned()),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("let x\n  = 5");
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.value, tok.pos), (Token::Let, Position::new(1, 1)));
        let tok = lexer.next_token().unwrap();
        assert_eq!(
            (tok.value, tok.pos),
            (Token::Identifier("x".to_owned()), Position::new(1, 5))
        );
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.value, tok.pos), (Token::Equal, Position::new(2, 3)));
        let tok = lexer.next_token().unwrap();
        assert_eq!((tok.value, tok.pos), (Token::Integer(5), Position::new(2, 5)));
    }

    #[test]
    fn test_bare_bang_is_an_error() {
        let mut lexer = Lexer::new("!x");
        match lexer.next_token() {
            Err(LexError {
                kind: LexErrorKind::UnexpectedCharacter('!'),
                ..
            }) => {}
            result => panic!("expected unexpected-character error but got {:?}", result),
        }
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().unwrap().value, Token::Eof);
        assert_eq!(lexer.next_token().unwrap().value, Token::Eof);
    }
}
