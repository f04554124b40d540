use rustyline::error::ReadlineError;
use rustyline::Editor;

use kira_interpreter::{object::Object, Evaluator};
use kira_parser::{lexer::Lexer, parser::Parser};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() {
    println!("Kira language v{}", VERSION);

    // One evaluator for the whole session, so bindings survive between lines
    // (and survive errors)
    let mut evaluator = Evaluator::new();

    // `()` can be used when no completer is required
    let mut rl = Editor::<()>::new();
    loop {
        let readline = rl.readline("kira> ");
        match readline {
            Ok(line) => {
                if line.trim() == "exit" || line.trim() == "quit" {
                    break;
                }
                // Skip empty lines
                else if line.trim().is_empty() {
                    continue;
                }

                // Keep reading while the input is visibly unfinished
                let mut source = line;
                while is_incomplete(&source) {
                    match rl.readline("...  ") {
                        Ok(next) => {
                            source.push('\n');
                            source.push_str(&next);
                        }
                        Err(_) => break,
                    }
                }

                rl.add_history_entry(source.as_str());

                let lexer = Lexer::new(&source);
                let mut parser = Parser::new(lexer);

                match parser.parse_program() {
                    Ok(program) => match evaluator.eval(&program) {
                        Ok(value) => {
                            if !matches!(*value, Object::Null) {
                                println!("{}", value.to_code_string());
                            }
                        }
                        Err(err) => println!("{}: {}", err.name(), err),
                    },
                    Err(err) => println!("{}: {}", err.name(), err),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
}

/// Whether the source so far is visibly unfinished: unbalanced delimiters or
/// a trailing operator. Delimiters inside strings and comments don't count.
fn is_incomplete(source: &str) -> bool {
    let mut depth: i32 = 0;
    let mut last_meaningful = None;

    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' | '\'' => {
                let quote = c;
                while let Some(c) = chars.next() {
                    if c == '\\' {
                        chars.next();
                    } else if c == quote {
                        break;
                    }
                }
                last_meaningful = Some(quote);
            }
            '(' | '[' | '{' => {
                depth += 1;
                last_meaningful = Some(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                last_meaningful = Some(c);
            }
            c if c.is_whitespace() => {}
            c => last_meaningful = Some(c),
        }
    }

    if depth > 0 {
        return true;
    }

    matches!(
        last_meaningful,
        Some('+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | ',' | ':')
    )
}

#[cfg(test)]
mod tests {
    use crate::repl::is_incomplete;

    #[test]
    fn complete_inputs() {
        for input in [
            "1 + 2",
            "let x = 5",
            "if x { 1 } else { 2 }",
            "[1, 2, 3]",
            "\"a { not a brace\"",
            "x # comment with {",
            "f(1)(2)",
        ] {
            assert!(!is_incomplete(input), "'{}' should be complete", input);
        }
    }

    #[test]
    fn incomplete_inputs() {
        for input in [
            "if x {",
            "let a = [1, 2,",
            "f(1,",
            "1 +",
            "x =",
            "let x = 5 *",
            "{\"a\": ",
        ] {
            assert!(is_incomplete(input), "'{}' should be incomplete", input);
        }
    }

    #[test]
    fn overclosed_input_is_complete() {
        // Too many closers is a parse error, not a continuation
        assert!(!is_incomplete("x)"));
    }
}
