use std::borrow::Cow;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use calclang::config::{Mode, ReplConfig};
use calclang::pretty_print::REPL_SOURCE;
use calclang::{Interpreter, StdinInput, TokenKind, init_tracing, parse_str, tokenize};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

const MAGIC_COMMANDS: &[&str] = &[
    "%lex", "%tokenize", "%split", "%parse", "%ast", "%eval", "%exec", "%help", "%exit", "%quit",
];

const HELP: &str = "\
Statements:
  expr -> name      assign (use `-> !name` for a constant)
  ? -> name         read a value for name
  { ... }           group statements
  # ...             comment to end of line
Commands:
  %lex, %tokenize, %split   show tokens
  %parse, %ast              show the parsed statements
  %eval, %exec              evaluate (default)
  %help                     show this message
  %exit, %quit, exit, quit  leave (Ctrl-D works too)
Ctrl-S inserts a newline without submitting.";

#[derive(Debug, PartialEq)]
enum Command {
    SetMode(Mode),
    Help,
    Exit,
    Ping,
    Unknown(String),
}

// Lines that drive the REPL itself rather than the language
fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Some(Command::Exit);
    }
    if line.eq_ignore_ascii_case("ping") {
        return Some(Command::Ping);
    }
    let magic = line.strip_prefix('%')?;
    Some(match magic.to_ascii_lowercase().as_str() {
        "help" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => match other.parse::<Mode>() {
            Ok(mode) => Command::SetMode(mode),
            Err(_) => Command::Unknown(line.to_string()),
        },
    })
}

/// An interactive prompt for calclang.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Start in lex mode, showing the tokens of each line.
    #[arg(short, long, conflicts_with = "parse")]
    lex: bool,

    /// Start in parse mode, showing the statements of each line.
    #[arg(short, long)]
    parse: bool,

    /// A .calc file to evaluate before the prompt opens.
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> Option<Mode> {
        if self.lex {
            Some(Mode::Lex)
        } else if self.parse {
            Some(Mode::Parse)
        } else {
            None
        }
    }
}

struct CalcCompleter {
    interpreter: Rc<RefCell<Interpreter>>,
}

impl CalcCompleter {
    fn new(interpreter: Rc<RefCell<Interpreter>>) -> Self {
        CalcCompleter { interpreter }
    }

    fn candidates(&self, prefix: &str) -> Vec<String> {
        let interpreter = self.interpreter.borrow();
        let mut names: Vec<String> = interpreter
            .environment()
            .identifiers()
            .into_iter()
            .chain(interpreter.builtins().names().map(str::to_string))
            .filter(|name| name.starts_with(prefix))
            .collect();
        // Builtins match case insensitively, so offer them for lower-case prefixes too
        if prefix.chars().any(|c| c.is_ascii_lowercase()) {
            let upper = prefix.to_ascii_uppercase();
            names.extend(
                interpreter
                    .builtins()
                    .names()
                    .filter(|name| name.starts_with(&upper))
                    .map(str::to_ascii_lowercase),
            );
        }
        names.sort();
        names.dedup();
        names
    }
}

impl rustyline::completion::Completer for CalcCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let before = &line[..pos];

        if before.starts_with('%') && !before.contains(char::is_whitespace) {
            let commands = MAGIC_COMMANDS
                .iter()
                .filter(|command| command.starts_with(before))
                .map(|command| command.to_string())
                .collect();
            return Ok((0, commands));
        }

        match tokenize(before).last() {
            Some(token) if token.kind == TokenKind::Identifier && token.span.end == pos => {
                Ok((token.span.start, self.candidates(&token.literal)))
            }
            _ => Ok((pos, vec![])),
        }
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: CalcValidator,
    #[rustyline(Highlighter)]
    highlighter: CalcHighlighter,
    #[rustyline(Completer)]
    completer: CalcCompleter,
}

fn closes(opening: char, closing: char) -> bool {
    matches!((opening, closing), ('(', ')') | ('{', '}'))
}

struct CalcValidator;

impl Validator for CalcValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let mut stack = Vec::new();
        let mut in_comment = false;

        for (i, c) in input.char_indices() {
            if in_comment {
                in_comment = c != '\n';
                continue;
            }

            match c {
                '#' => in_comment = true,
                '(' | '{' => stack.push(c),
                ')' | '}' => match stack.pop() {
                    Some(opening) if closes(opening, c) => {}
                    _ => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched '{}' at position {}",
                            c, i
                        ))));
                    }
                },
                _ => {}
            }
        }

        if stack.is_empty() {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

struct CalcHighlighter;

impl Highlighter for CalcHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        // (bracket, index in line, index in highlighted)
        let mut stack: Vec<(char, usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let cursor_after = pos.checked_sub(1);

        for (i, c) in line.char_indices() {
            match c {
                '(' | '{' => {
                    stack.push((c, i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' | '}' => match stack.pop() {
                    Some((opening, line_pos, matching_pos)) if closes(opening, c) => {
                        if cursor_after == Some(line_pos) || cursor_after == Some(i) {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching brackets
                            highlighted.replace_range(
                                matching_pos..=matching_pos,
                                &format!("\x1b[1;34m{}\x1b[0m", opening),
                            );
                        } else {
                            highlighted.push(c);
                        }
                    }
                    Some((opening, _, matching_pos)) => {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for mismatched brackets
                        highlighted.replace_range(
                            matching_pos..=matching_pos,
                            &format!("\x1b[1;31m{}\x1b[0m", opening),
                        );
                    }
                    None => highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)),
                },
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn run_line(interpreter: &RefCell<Interpreter>, mode: Mode, line: &str) {
    match mode {
        Mode::Lex => {
            for token in tokenize(line) {
                println!("{}", token);
            }
        }
        Mode::Parse => match parse_str(line) {
            Ok(section) => {
                for stmt in &section.statements {
                    println!("{}", stmt);
                }
            }
            Err(errors) => {
                for error in errors {
                    if error.pretty_print(REPL_SOURCE, line).is_err() {
                        eprintln!("{}", error);
                    }
                }
            }
        },
        Mode::Eval => {
            let mut input = StdinInput;
            let result = interpreter.borrow_mut().run(line, Some(&mut input), &mut |value| {
                println!("{}", value)
            });
            if let Err(error) = result {
                if error.pretty_print(REPL_SOURCE, line).is_err() {
                    eprintln!("{}", error);
                }
            }
        }
    }
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match ReplConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("calclang: {}", err);
            std::process::exit(2);
        }
    };
    let mut mode = args.mode().unwrap_or(config.mode);

    let interpreter = Rc::new(RefCell::new(Interpreter::default()));

    if let Some(path) = &args.file {
        match std::fs::read_to_string(path) {
            Ok(source) => run_line(&interpreter, Mode::Eval, &source),
            Err(err) => eprintln!("calclang: cannot read {}: {}", path.display(), err),
        }
    }

    println!("calclang REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type %help for commands, 'exit' or Ctrl-D to quit.");

    let h = InputValidator {
        highlighter: CalcHighlighter,
        validator: CalcValidator,
        completer: CalcCompleter::new(interpreter.clone()),
    };
    let mut rl = Editor::with_config(config.editor_config())?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&config.history_file).is_err() {
        println!("No previous history.");
    }

    loop {
        let prompt = match mode {
            Mode::Eval => "calc> ".to_string(),
            other => format!("calc[{}]> ", other),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;

                match parse_command(&line) {
                    Some(Command::Exit) => break,
                    Some(Command::Help) => println!("{}", HELP),
                    Some(Command::Ping) => println!("pong"),
                    Some(Command::SetMode(new_mode)) => {
                        mode = new_mode;
                        println!("Mode set to {}", mode);
                    }
                    Some(Command::Unknown(command)) => {
                        eprintln!("Unknown command {}. Type %help for a list.", command)
                    }
                    None => run_line(&interpreter, mode, &line),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&config.history_file)
}
