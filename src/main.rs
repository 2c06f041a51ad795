use std::path::{Path, PathBuf};
use std::process::ExitCode;

use calclang::pretty_print::REPL_SOURCE;
use calclang::{Interpreter, StdinInput, init_tracing};
use clap::Parser;

/// calclang runs a .calc file, or a command given inline, printing the value
/// of every statement.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Code to run instead of a file.
    #[arg(short, long, value_name = "COMMAND", conflicts_with = "file")]
    command: Option<String>,

    /// The .calc file to run.
    #[arg(required_unless_present = "command")]
    file: Option<PathBuf>,
}

impl Args {
    /// The name to report errors against, and the code to run.
    fn load(&self) -> std::io::Result<(String, String)> {
        match (&self.command, &self.file) {
            (Some(command), _) => Ok((REPL_SOURCE.to_string(), command.clone())),
            (None, Some(path)) => {
                let source = std::fs::read_to_string(path)?;
                Ok((path.display().to_string(), source))
            }
            (None, None) => Ok((REPL_SOURCE.to_string(), String::new())),
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let (source_id, source) = match args.load() {
        Ok(loaded) => loaded,
        Err(err) => {
            let path = args.file.as_deref().unwrap_or(Path::new(""));
            eprintln!("calclang: cannot read {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut interpreter = Interpreter::default();
    let mut input = StdinInput;
    let result = interpreter.run(&source, Some(&mut input), &mut |value| {
        println!("{}", value)
    });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            if error.pretty_print(&source_id, &source).is_err() {
                eprintln!("{}", error);
            }
            ExitCode::FAILURE
        }
    }
}
