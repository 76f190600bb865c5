use std::env;

use super::{BuiltinCommand, BuiltinContext, BuiltinError, BuiltinOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Pwd;

impl BuiltinCommand for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn usage(&self) -> &'static str {
        "pwd               print the working directory"
    }

    fn execute(
        &self,
        _args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        let cwd = env::current_dir()?;
        writeln!(ctx.stdout, "{}", cwd.display())?;

        Ok(BuiltinOutcome::success())
    }
}
