use std::{io, path::PathBuf};

use enum_dispatch::enum_dispatch;
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

use crate::{jobs::JobRegistry, process::ExitStatus};

pub mod cd;
pub mod clear;
pub mod echo;
pub mod exit;
pub mod help;
pub mod jobs;
pub mod pwd;

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("HOME not set")]
    HomeUnset,
    #[error("OLDPWD not set")]
    OldPwdUnset,
    #[error("{}: {source}", .path.display())]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What the loop should do after a builtin ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOutcome {
    Status(ExitStatus),
    /// Leave the shell with this code.
    Exit(i32),
}

impl BuiltinOutcome {
    pub fn success() -> Self {
        Self::Status(ExitStatus::new_success())
    }
}

/// The parts of the shell a builtin may touch.
pub struct BuiltinContext<'a> {
    pub stdout: &'a mut dyn io::Write,
    pub jobs: &'a JobRegistry,
    pub color: bool,
}

#[enum_dispatch(BuiltinCommands)]
pub trait BuiltinCommand {
    fn name(&self) -> &'static str;

    /// One line shown by `help`.
    fn usage(&self) -> &'static str;

    fn execute(
        &self,
        args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError>;
}

#[enum_dispatch]
#[derive(Debug, Clone, Copy, EnumIter)]
pub enum BuiltinCommands {
    Cd(cd::Cd),
    Pwd(pwd::Pwd),
    Echo(echo::Echo),
    Exit(exit::Exit),
    Jobs(jobs::Jobs),
    Clear(clear::Clear),
    Help(help::Help),
}

impl BuiltinCommands {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|cmd| cmd.name() == name)
    }
}
