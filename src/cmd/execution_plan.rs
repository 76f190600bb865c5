use std::str::FromStr;

use crate::{
    env::Vars,
    expand::expand,
    parse::{parse_line, SyntaxError},
};

/// One stage of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// `argv[0]` is the program name.
    pub argv: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    pub fn is_redirected(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }

    /// Expands every word and redirection target.
    pub fn expand<V: Vars + ?Sized>(&self, vars: &V) -> Self {
        Self {
            argv: self.argv.iter().map(|word| expand(word, vars)).collect(),
            input: self.input.as_deref().map(|path| expand(path, vars)),
            output: self.output.as_deref().map(|path| expand(path, vars)),
        }
    }
}

/// Stages connected stdout-to-stdin, plus the line-level background flag.
///
/// Only the first stage may read from a file and only the last may write to
/// one; [`parse_line`] rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<CommandSpec>,
    pub background: bool,
    /// The command as typed, without the trailing `&`.
    pub text: String,
}

impl Pipeline {
    /// A single stage without redirections, the only shape builtins run in.
    pub fn is_simple(&self) -> bool {
        matches!(self.stages.as_slice(), [only] if !only.is_redirected())
    }

    pub fn expand<V: Vars + ?Sized>(&self, vars: &V) -> Self {
        Self {
            stages: self.stages.iter().map(|stage| stage.expand(vars)).collect(),
            background: self.background,
            text: self.text.clone(),
        }
    }
}

impl FromStr for Pipeline {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s)?.ok_or(SyntaxError::EmptyCommand)
    }
}
