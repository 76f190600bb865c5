use itertools::Itertools;

use super::{BuiltinCommand, BuiltinContext, BuiltinError, BuiltinOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl BuiltinCommand for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn usage(&self) -> &'static str {
        "echo [ARG]...     print the arguments separated by spaces"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        writeln!(ctx.stdout, "{}", args.iter().join(" "))?;

        Ok(BuiltinOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use crate::{builtins::tests::run, jobs::JobRegistry};

    #[test]
    fn joins_with_single_spaces() {
        let jobs = JobRegistry::new(1);
        assert_eq!(run("echo", &["a", "b", "c"], &jobs).1, "a b c\n");
        assert_eq!(run("echo", &[], &jobs).1, "\n");
    }
}
