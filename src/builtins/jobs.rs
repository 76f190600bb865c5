use super::{BuiltinCommand, BuiltinContext, BuiltinError, BuiltinOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Jobs;

impl BuiltinCommand for Jobs {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn usage(&self) -> &'static str {
        "jobs              list running background jobs"
    }

    fn execute(
        &self,
        _args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        ctx.jobs.reap();
        let running = ctx.jobs.running();

        if running.is_empty() {
            writeln!(ctx.stdout, "No background jobs.")?;
        }

        for job in running {
            writeln!(ctx.stdout, "[{}]  Running                 {} &", job.id, job.text)?;
        }

        Ok(BuiltinOutcome::success())
    }
}
