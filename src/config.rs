use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_HISTORY_FILE: &str = "calclang_history.txt";

pub const HISTORY_VAR: &str = "CALCLANG_HISTORY";
pub const EDIT_MODE_VAR: &str = "CALCLANG_EDIT_MODE";
pub const MODE_VAR: &str = "CALCLANG_MODE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown mode `{0}` (expected lex, parse or eval)")]
    UnknownMode(String),
    #[error("unknown edit mode `{0}` (expected vi or emacs)")]
    UnknownEditMode(String),
}

/// What the REPL does with each line it reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Print the tokens.
    Lex,
    /// Print the parsed statements.
    Parse,
    #[default]
    Eval,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lex" | "tokenize" | "split" => Ok(Mode::Lex),
            "parse" | "ast" => Ok(Mode::Parse),
            "eval" | "exec" => Ok(Mode::Eval),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Lex => "lex",
            Mode::Parse => "parse",
            Mode::Eval => "eval",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Vi,
    Emacs,
}

impl FromStr for EditMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vi" | "vim" => Ok(EditMode::Vi),
            "emacs" => Ok(EditMode::Emacs),
            _ => Err(ConfigError::UnknownEditMode(s.to_string())),
        }
    }
}

impl From<EditMode> for rustyline::EditMode {
    fn from(mode: EditMode) -> Self {
        match mode {
            EditMode::Vi => rustyline::EditMode::Vi,
            EditMode::Emacs => rustyline::EditMode::Emacs,
        }
    }
}

/// REPL settings, read from `CALCLANG_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    pub history_file: String,
    pub edit_mode: EditMode,
    pub mode: Mode,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            history_file: DEFAULT_HISTORY_FILE.to_string(),
            edit_mode: EditMode::default(),
            mode: Mode::default(),
        }
    }
}

impl ReplConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = ReplConfig::default();

        if let Some(history_file) = get(HISTORY_VAR) {
            config.history_file = history_file;
        }
        if let Some(edit_mode) = get(EDIT_MODE_VAR) {
            config.edit_mode = edit_mode.trim().parse()?;
        }
        if let Some(mode) = get(MODE_VAR) {
            config.mode = mode.trim().parse()?;
        }

        Ok(config)
    }

    pub fn editor_config(&self) -> rustyline::Config {
        rustyline::Config::builder()
            .edit_mode(self.edit_mode.into())
            .auto_add_history(false)
            .build()
    }
}
