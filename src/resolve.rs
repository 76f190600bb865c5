use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::env::Vars;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("PATH environment variable not set")]
    PathUnset,
    #[error("command not found: {0}")]
    NotFound(String),
}

/// Finds the executable a command name refers to.
///
/// Names containing `/` are taken as paths and never searched. Otherwise the
/// directories of `PATH` are probed in order and the first regular,
/// owner-executable file wins.
pub fn resolve<V: Vars + ?Sized>(name: &str, vars: &V) -> Result<PathBuf, ResolveError> {
    if name.contains('/') {
        let path = Path::new(name);
        return if is_executable(path) {
            Ok(path.to_path_buf())
        } else {
            Err(ResolveError::NotFound(name.to_owned()))
        };
    }

    let search = vars.var("PATH").ok_or(ResolveError::PathUnset)?;

    let found = search
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| is_executable(candidate));

    trace!(name, ?found, "resolved command");

    found.ok_or_else(|| ResolveError::NotFound(name.to_owned()))
}

pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o100 != 0)
        .unwrap_or(false)
}
