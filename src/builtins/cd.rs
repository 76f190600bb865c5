use std::{env, path::PathBuf};

use super::{BuiltinCommand, BuiltinContext, BuiltinError, BuiltinOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Cd;

impl BuiltinCommand for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn usage(&self) -> &'static str {
        "cd [DIR | -]      change directory (HOME by default, - for the previous one)"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        trace!("executing cd builtin: {args:?}");

        let back = args.first().map(String::as_str) == Some("-");
        let target: PathBuf = match args.first().map(String::as_str) {
            None => env::var_os("HOME").ok_or(BuiltinError::HomeUnset)?.into(),
            Some("-") => env::var_os("OLDPWD")
                .ok_or(BuiltinError::OldPwdUnset)?
                .into(),
            Some(path) => PathBuf::from(path),
        };

        let previous = env::current_dir().ok();

        env::set_current_dir(&target).map_err(|source| BuiltinError::ChangeDir {
            path: target.clone(),
            source,
        })?;

        // OLDPWD only moves once the change succeeded
        if let Some(previous) = previous {
            env::set_var("OLDPWD", previous);
        }

        debug!(target = %target.display(), "changed directory");

        if back {
            writeln!(ctx.stdout, "{}", target.display())?;
        }

        Ok(BuiltinOutcome::success())
    }
}
