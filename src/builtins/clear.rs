use termion::{clear, cursor::Goto};

use super::{BuiltinCommand, BuiltinContext, BuiltinError, BuiltinOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Clear;

impl BuiltinCommand for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn usage(&self) -> &'static str {
        "clear             clear the terminal"
    }

    fn execute(
        &self,
        _args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        write!(ctx.stdout, "{}{}", clear::All, Goto(1, 1))?;
        ctx.stdout.flush()?;

        Ok(BuiltinOutcome::success())
    }
}
