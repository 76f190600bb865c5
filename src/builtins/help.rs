use strum::IntoEnumIterator;
use termion::style;

use super::{BuiltinCommand, BuiltinCommands, BuiltinContext, BuiltinError, BuiltinOutcome};

const SYNTAX: &str = "\
  cmd ARG...               run a program found on PATH
  cmd1 | cmd2 | ...        connect stdout to stdin
  cmd < FILE               read stdin from FILE (first command only)
  cmd > FILE               write stdout to FILE (last command only)
  cmd &                    run in the background
  $NAME  ~  ~/path         expand a variable or the home directory";

#[derive(Debug, Default, Clone, Copy)]
pub struct Help;

impl BuiltinCommand for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self) -> &'static str {
        "help              show this message"
    }

    fn execute(
        &self,
        _args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        let (bold, reset) = if ctx.color {
            (style::Bold.to_string(), style::Reset.to_string())
        } else {
            Default::default()
        };

        writeln!(ctx.stdout, "{bold}Usage:{reset}")?;
        writeln!(ctx.stdout, "{SYNTAX}")?;
        writeln!(ctx.stdout)?;
        writeln!(ctx.stdout, "{bold}Builtins:{reset}")?;
        for builtin in BuiltinCommands::iter() {
            writeln!(ctx.stdout, "  {}", builtin.usage())?;
        }

        Ok(BuiltinOutcome::success())
    }
}
