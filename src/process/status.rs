use std::fmt;

use nix::sys::{signal::Signal, wait::WaitStatus};

/// Status reserved for a stage whose program could not be found or executed.
pub const NOT_FOUND: i32 = 127;

/// How a stage or builtin finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
    /// The program was never started because it could not be resolved.
    NotFound,
    /// The stage was abandoned before exec, e.g. a redirection failed.
    Failed,
}

impl ExitStatus {
    pub fn new_success() -> Self {
        Self::Exited(0)
    }

    pub fn new_failure() -> Self {
        Self::Exited(1)
    }

    /// Maps a reaped wait status. Stop/continue notifications yield `None`.
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Self::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Self::Signaled(signal)),
            _ => None,
        }
    }

    /// Shell-style numeric status: signals map to `128 + signo`.
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled(signal) => 128 + *signal as i32,
            Self::NotFound => NOT_FOUND,
            Self::Failed => 1,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }

    pub fn failure(&self) -> bool {
        !self.success()
    }

    /// The line shown to the user after a stage ends badly, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Exited(0) | Self::NotFound | Self::Failed => None,
            Self::Exited(code) => Some(format!("[Process exited with code {code}]")),
            Self::Signaled(signal) => Some(format!(
                "[Process terminated by signal {}]",
                *signal as i32
            )),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit {code}"),
            Self::Signaled(signal) => write!(f, "killed by {signal}"),
            Self::NotFound => write!(f, "not found"),
            Self::Failed => write!(f, "failed to start"),
        }
    }
}
