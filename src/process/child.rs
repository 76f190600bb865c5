use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitPidFlag, WaitStatus},
    unistd::Pid,
};

use super::status::ExitStatus;

/// A forked stage, identified by pid and the name it was started as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub pid: Pid,
    pub name: String,
}

impl Child {
    pub fn new(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }

    /// Blocks until the child terminates.
    pub fn wait(&self) -> nix::Result<ExitStatus> {
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    if let Some(status) = ExitStatus::from_wait(status) {
                        trace!(pid = %self.pid, %status, "child finished");
                        return Ok(status);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Reaps the child if it has already terminated.
    ///
    /// A child that is no longer ours to wait for (`ECHILD`) counts as gone.
    pub fn try_wait(&self) -> nix::Result<Option<ExitStatus>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(status) => Ok(ExitStatus::from_wait(status)),
            Err(Errno::EINTR) => Ok(None),
            Err(Errno::ECHILD) => {
                debug!(pid = %self.pid, "child already reaped elsewhere");
                Ok(Some(ExitStatus::Failed))
            }
            Err(err) => Err(err),
        }
    }
}
