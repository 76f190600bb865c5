use std::{
    io::{self, Stdout, Write},
    sync::Arc,
};

use termion::color;
use thiserror::Error;

use crate::{
    builtins::{BuiltinCommand, BuiltinCommands, BuiltinContext, BuiltinError, BuiltinOutcome},
    cmd::{
        execute::{self, ExecuteError, Outcome},
        execution_plan::Pipeline,
    },
    config::Config,
    env::{ProcessEnv, Vars},
    jobs::JobRegistry,
    parse::{parse_line, SyntaxError},
    process::ExitStatus,
    prompt,
};

/// Status of a line that failed to parse.
pub const SYNTAX_ERROR: i32 = 2;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error("{name}: {source}")]
    Builtin {
        name: &'static str,
        #[source]
        source: BuiltinError,
    },
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::Syntax(_) => ExitStatus::Exited(SYNTAX_ERROR),
            Self::Execute(err) => err.status(),
            Self::Builtin { .. } | Self::Io(_) => ExitStatus::new_failure(),
        }
    }
}

/// Whether the read-eval loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// The process environment plus the shell's own `$?`.
#[derive(Debug, Clone, Copy)]
pub struct ShellVars {
    pub last_status: ExitStatus,
}

impl Vars for ShellVars {
    fn var(&self, name: &str) -> Option<String> {
        match name {
            "?" => Some(self.last_status.code().to_string()),
            _ => ProcessEnv.var(name),
        }
    }
}

/// One interactive session.
///
/// Builtin output, process notices, job lines and the prompt go to `out`.
/// External programs write straight to the inherited descriptors.
pub struct Shell<W: Write = Stdout> {
    config: Config,
    jobs: Arc<JobRegistry>,
    out: W,
    last_status: ExitStatus,
}

impl Shell<Stdout> {
    /// A session on the process's stdout. Color is dropped when stdout is
    /// not a terminal.
    pub fn new(mut config: Config) -> Self {
        let stdout = io::stdout();
        config.color = prompt::use_color(config.color, &stdout);
        Self::with_output(config, stdout)
    }
}

impl<W: Write> Shell<W> {
    pub fn with_output(config: Config, out: W) -> Self {
        let jobs = Arc::new(JobRegistry::new(config.jobs.capacity));

        Self {
            config,
            jobs,
            out,
            last_status: ExitStatus::new_success(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn last_status(&self) -> ExitStatus {
        self.last_status
    }

    pub fn vars(&self) -> ShellVars {
        ShellVars {
            last_status: self.last_status,
        }
    }

    /// Parses, expands and runs one input line. Errors are reported on
    /// stderr and recorded as the line's status.
    pub fn execute_line(&mut self, line: &str) -> Flow {
        match self.try_execute(line) {
            Ok(flow) => flow,
            Err(err) => {
                warn!(%err, "line failed");
                eprintln!("mysh: {err}");
                self.last_status = err.status();
                Flow::Continue
            }
        }
    }

    fn try_execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let Some(pipeline) = parse_line(line)? else {
            return Ok(Flow::Continue);
        };

        let vars = self.vars();
        let pipeline = pipeline.expand(&vars);
        debug!(?pipeline, "parsed line");

        if pipeline.is_simple() {
            if let Some(builtin) = BuiltinCommands::from_name(pipeline.stages[0].name()) {
                return self.run_builtin(builtin, &pipeline);
            }
        }

        // anything buffered must reach the terminal before the children do
        self.out.flush()?;

        let outcome = execute::run(&pipeline, &vars, &self.jobs)?;
        self.last_status = outcome.status();
        self.report(&outcome)?;

        Ok(Flow::Continue)
    }

    fn run_builtin(
        &mut self,
        builtin: BuiltinCommands,
        pipeline: &Pipeline,
    ) -> Result<Flow, ShellError> {
        if pipeline.background {
            eprintln!("mysh: builtins cannot run in the background; running in foreground");
        }

        trace!(name = builtin.name(), "running builtin");

        let mut ctx = BuiltinContext {
            stdout: &mut self.out,
            jobs: &self.jobs,
            color: self.config.color,
        };
        let result = builtin.execute(pipeline.stages[0].args(), &mut ctx);
        self.out.flush()?;

        match result {
            Ok(BuiltinOutcome::Status(status)) => {
                self.last_status = status;
                Ok(Flow::Continue)
            }
            Ok(BuiltinOutcome::Exit(code)) => Ok(Flow::Exit(code)),
            Err(source) => Err(ShellError::Builtin {
                name: builtin.name(),
                source,
            }),
        }
    }

    fn report(&mut self, outcome: &Outcome) -> io::Result<()> {
        let colored = self.config.color;

        match outcome {
            Outcome::Finished(statuses) => {
                for status in statuses {
                    let notice = match (status, status.notice()) {
                        (ExitStatus::Signaled(_), Some(notice)) => {
                            prompt::paint(notice, color::Red, colored)
                        }
                        (_, Some(notice)) => prompt::paint(notice, color::Yellow, colored),
                        (_, None) => continue,
                    };
                    writeln!(self.out, "{notice}")?;
                }
            }
            Outcome::Detached { job: Some(id), pid } => writeln!(self.out, "[{id}] {pid}")?,
            Outcome::Detached { job: None, .. } | Outcome::Abandoned(_) => {}
        }

        self.out.flush()
    }

    /// Reaps finished jobs and prints their completion lines.
    pub fn flush_notices(&mut self) -> io::Result<()> {
        self.jobs.reap();

        for notice in self.jobs.take_notices() {
            writeln!(self.out, "{notice}")?;
        }

        self.out.flush()
    }

    /// Prints pending notices followed by a fresh prompt.
    pub fn prompt(&mut self) -> io::Result<()> {
        self.flush_notices()?;
        let vars = self.vars();
        prompt::print(&mut self.out, &vars, &self.config)
    }

    pub fn greet(&mut self) -> io::Result<()> {
        if self.config.banner {
            prompt::banner(&mut self.out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobsConfig;

    fn shell() -> Shell<Vec<u8>> {
        let config = Config {
            color: false,
            ..Config::default()
        };
        Shell::with_output(config, Vec::new())
    }

    fn output(shell: &Shell<Vec<u8>>) -> String {
        String::from_utf8_lossy(shell.output()).into_owned()
    }

    #[test]
    fn blank_line_changes_nothing() {
        let mut shell = shell();
        assert_eq!(shell.execute_line("   \n"), Flow::Continue);
        assert!(shell.output().is_empty());
        assert!(shell.last_status().success());
    }

    #[test]
    fn echo_builtin_writes_to_shell_output() {
        let mut shell = shell();
        shell.execute_line("echo hello   world\n");
        assert_eq!(output(&shell), "hello world\n");
    }

    #[test]
    fn last_status_is_expanded() {
        let mut shell = shell();
        shell.execute_line("ls >");
        assert_eq!(shell.last_status(), ExitStatus::Exited(SYNTAX_ERROR));

        shell.execute_line("echo $?");
        assert_eq!(output(&shell), "2\n");
    }

    #[test]
    fn exit_stops_the_loop() {
        let mut shell = shell();
        assert_eq!(shell.execute_line("exit 3"), Flow::Exit(3));
        assert_eq!(shell.execute_line("exit"), Flow::Exit(0));
    }

    #[test]
    fn background_builtin_runs_in_foreground() {
        let mut shell = shell();
        assert_eq!(shell.execute_line("echo now &"), Flow::Continue);
        assert_eq!(output(&shell), "now\n");
        assert!(shell.jobs().is_empty());
    }

    #[test]
    fn unknown_command_is_127_without_a_notice() {
        let mut shell = shell();
        shell.execute_line("definitely-not-a-command-mysh");
        assert_eq!(shell.last_status().code(), 127);
        assert!(output(&shell).is_empty());
    }

    #[test]
    fn full_job_table_starts_the_job_quietly() {
        let config = Config {
            color: false,
            jobs: JobsConfig { capacity: 0 },
            ..Config::default()
        };
        let mut shell = Shell::with_output(config, Vec::new());

        shell.execute_line("sleep 0.05 &");

        assert!(shell.last_status().success());
        assert!(shell.jobs().is_empty());
        assert!(output(&shell).is_empty());
    }

    #[test]
    fn failing_program_gets_a_notice() {
        let mut shell = shell();
        shell.execute_line("false");
        assert_eq!(shell.last_status(), ExitStatus::Exited(1));
        assert_eq!(output(&shell), "[Process exited with code 1]\n");
    }
}
