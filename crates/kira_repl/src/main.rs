use std::fs;
use std::process::ExitCode;

use clap::Parser;

use kira_interpreter::object::Object;
use kira_interpreter::Evaluator;
use kira_parser::lexer::Lexer;
use kira_parser::parser;

mod repl;

/// The Kira programming language.
#[derive(Parser, Debug)]
#[command(name = "kira", version, about, long_about = None)]
struct Args {
    /// Script file to run (conventionally .kira); omit for the REPL
    file: Option<String>,

    /// Evaluate the given code string instead of reading a file
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(code) = args.eval {
        run_source(&code, "<eval>", true)
    } else if let Some(path) = args.file {
        match fs::read_to_string(&path) {
            Ok(source) => run_source(&source, &path, false),
            Err(err) => {
                eprintln!("kira: cannot read {}: {}", path, err);
                ExitCode::FAILURE
            }
        }
    } else {
        repl::run();
        ExitCode::SUCCESS
    }
}

/// Run a whole program. In echo mode (`-e`) the final value is printed in
/// code form unless it is null.
fn run_source(source: &str, origin: &str, echo_result: bool) -> ExitCode {
    let lexer = Lexer::new(source);
    let mut parser = parser::Parser::new(lexer);

    let program = match parser.parse_program() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}:{}: {}: {}", origin, err.position(), err.name(), err);
            return ExitCode::from(2);
        }
    };

    let mut evaluator = Evaluator::new();
    match evaluator.eval(&program) {
        Ok(value) => {
            if echo_result && !matches!(*value, Object::Null) {
                println!("{}", value.to_code_string());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.position {
                Some(pos) => eprintln!("{}:{}: {}: {}", origin, pos, err.name(), err),
                None => eprintln!("{}: {}: {}", origin, err.name(), err),
            }
            ExitCode::FAILURE
        }
    }
}
