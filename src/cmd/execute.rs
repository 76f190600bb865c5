use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    io,
    os::{
        fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
        unix::{ffi::OsStrExt, fs::OpenOptionsExt},
    },
    ptr,
};

use nix::{
    errno::Errno,
    fcntl::OFlag,
    libc,
    sys::signal::{self, SigHandler, Signal},
    unistd::{self, ForkResult, Pid},
};
use thiserror::Error;

use super::execution_plan::{CommandSpec, Pipeline};
use crate::{
    builtins::BuiltinCommands,
    env::Vars,
    jobs::{JobId, JobRegistry},
    process::{status::NOT_FOUND, Child, ExitStatus},
    resolve::{resolve, ResolveError},
};

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to create pipe: {0}")]
    Pipe(#[source] Errno),
    #[error("{name}: failed to start process: {source}")]
    Spawn {
        name: String,
        #[source]
        source: Errno,
    },
    #[error("{path}: {source}")]
    Redirection {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}: argument contains a NUL byte")]
    Nul(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("{0}: builtins cannot be used in a pipeline or with redirection")]
    BuiltinInPipeline(String),
}

impl ExecuteError {
    /// Status recorded for a stage that failed with this error.
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::Resolve(_) | Self::BuiltinInPipeline(_) => ExitStatus::NotFound,
            _ => ExitStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every stage was waited for; statuses are in stage order.
    Finished(Vec<ExitStatus>),
    /// The final stage runs in the background. `job` is `None` when the job
    /// table had no room for it.
    Detached { job: Option<JobId>, pid: Pid },
    /// A background pipeline whose final stage never started.
    Abandoned(ExitStatus),
}

impl Outcome {
    /// The status reported for the whole line: the terminal stage's.
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::Finished(statuses) => statuses
                .last()
                .copied()
                .unwrap_or_else(ExitStatus::new_success),
            Self::Detached { .. } => ExitStatus::new_success(),
            Self::Abandoned(status) => *status,
        }
    }
}

/// A stage ready to fork: program resolved, argv converted, files open.
struct Prepared {
    name: String,
    program: CString,
    #[allow(dead_code)]
    argv: Vec<CString>,
    /// Null-terminated pointers into `argv`, built before forking.
    argv_ptrs: Vec<*const libc::c_char>,
    input: Option<File>,
    output: Option<File>,
}

enum Stage {
    Ready(Prepared),
    Skipped(ExitStatus),
}

impl Stage {
    fn files(&self) -> Vec<RawFd> {
        match self {
            Self::Ready(prepared) => prepared
                .input
                .iter()
                .chain(prepared.output.iter())
                .map(AsRawFd::as_raw_fd)
                .collect(),
            Self::Skipped(_) => Vec::new(),
        }
    }
}

/// The `n - 1` pipes joining `n` stages. Dropping closes every end.
struct Pipes(Vec<(OwnedFd, OwnedFd)>);

impl Pipes {
    fn new(count: usize) -> Result<Self, ExecuteError> {
        let mut pipes = Vec::with_capacity(count);

        for _ in 0..count {
            let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecuteError::Pipe)?;
            // SAFETY: pipe2 just returned these descriptors; nothing else owns them.
            pipes.push(unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) });
        }

        Ok(Self(pipes))
    }

    fn read_end(&self, idx: usize) -> RawFd {
        self.0[idx].0.as_raw_fd()
    }

    fn write_end(&self, idx: usize) -> RawFd {
        self.0[idx].1.as_raw_fd()
    }

    fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.0
            .iter()
            .flat_map(|(read, write)| [read.as_raw_fd(), write.as_raw_fd()])
    }
}

/// Runs an already expanded pipeline.
///
/// Stages that cannot be prepared (unknown program, unopenable file) are
/// reported on stderr and skipped; the rest still run, wired to pipes whose
/// other end is closed. In background mode only the final stage becomes a
/// job; earlier stages are handed to the registry for silent reaping.
pub fn run<V: Vars + ?Sized>(
    pipeline: &Pipeline,
    vars: &V,
    jobs: &JobRegistry,
) -> Result<Outcome, ExecuteError> {
    let count = pipeline.stages.len();
    debug!(
        stages = count,
        background = pipeline.background,
        text = %pipeline.text,
        "running pipeline"
    );

    let stages = pipeline
        .stages
        .iter()
        .map(|spec| match prepare(spec, vars) {
            Ok(prepared) => Stage::Ready(prepared),
            Err(err) => {
                report(&err);
                Stage::Skipped(err.status())
            }
        })
        .collect::<Vec<_>>();

    let pipes = Pipes::new(count.saturating_sub(1))?;

    // Everything a child has to close once its own stdio is wired.
    let inherited = pipes
        .raw_fds()
        .chain(stages.iter().flat_map(Stage::files))
        .collect::<Vec<_>>();

    let mut statuses = stages
        .iter()
        .map(|stage| match stage {
            Stage::Skipped(status) => Some(*status),
            Stage::Ready(_) => None,
        })
        .collect::<Vec<_>>();

    let mut spawned = Vec::with_capacity(count);

    for (idx, stage) in stages.iter().enumerate() {
        let Stage::Ready(prepared) = stage else {
            continue;
        };

        let stdin = prepared
            .input
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .or_else(|| (idx > 0).then(|| pipes.read_end(idx - 1)));
        let stdout = prepared
            .output
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .or_else(|| (idx + 1 < count).then(|| pipes.write_end(idx)));

        // SAFETY: the child only makes async-signal-safe calls before it
        // execs or exits; everything it needs was allocated above.
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => exec_stage(prepared, stdin, stdout, &inherited),
            Ok(ForkResult::Parent { child }) => {
                trace!(stage = idx, pid = %child, name = %prepared.name, "spawned stage");
                spawned.push((idx, Child::new(child, &prepared.name)));
            }
            Err(source) => {
                report(&ExecuteError::Spawn {
                    name: prepared.name.clone(),
                    source,
                });
                for status in &mut statuses[idx..] {
                    status.get_or_insert(ExitStatus::Failed);
                }
                break;
            }
        }
    }

    // The parent never reads or writes pipeline data.
    drop(pipes);
    drop(stages);

    if pipeline.background {
        return Ok(detach(pipeline, spawned, &statuses, jobs));
    }

    for (idx, child) in &spawned {
        let status = child.wait().unwrap_or_else(|err| {
            error!(pid = %child.pid, %err, "failed to wait for stage");
            ExitStatus::Failed
        });
        statuses[*idx] = Some(status);
    }

    Ok(Outcome::Finished(
        statuses
            .into_iter()
            .map(|status| status.unwrap_or(ExitStatus::Failed))
            .collect(),
    ))
}

fn detach(
    pipeline: &Pipeline,
    mut spawned: Vec<(usize, Child)>,
    statuses: &[Option<ExitStatus>],
    jobs: &JobRegistry,
) -> Outcome {
    let last = pipeline.stages.len() - 1;

    let final_stage = match spawned.last() {
        Some((idx, _)) if *idx == last => spawned.pop().map(|(_, child)| child),
        _ => None,
    };
    let upstream = spawned.into_iter().map(|(_, child)| child);

    match final_stage {
        Some(child) => {
            let pid = child.pid;
            let job = jobs.register(child, upstream.collect(), &pipeline.text);
            Outcome::Detached { job, pid }
        }
        None => {
            jobs.adopt(upstream);
            Outcome::Abandoned(statuses[last].unwrap_or(ExitStatus::Failed))
        }
    }
}

fn prepare<V: Vars + ?Sized>(spec: &CommandSpec, vars: &V) -> Result<Prepared, ExecuteError> {
    let input = spec.input.as_deref().map(open_input).transpose()?;
    let output = spec.output.as_deref().map(open_output).transpose()?;

    let name = spec.name();
    let program = match resolve(name, vars) {
        Ok(program) => program,
        Err(ResolveError::NotFound(_)) if BuiltinCommands::from_name(name).is_some() => {
            return Err(ExecuteError::BuiltinInPipeline(name.to_owned()))
        }
        Err(err) => return Err(err.into()),
    };

    let nul = |_| ExecuteError::Nul(name.to_owned());
    let program = CString::new(program.as_os_str().as_bytes()).map_err(nul)?;
    let argv = spec
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(nul)?;

    let mut argv_ptrs = argv.iter().map(|arg| arg.as_ptr()).collect::<Vec<_>>();
    argv_ptrs.push(ptr::null());

    Ok(Prepared {
        name: name.to_owned(),
        program,
        argv,
        argv_ptrs,
        input,
        output,
    })
}

fn open_input(path: &str) -> Result<File, ExecuteError> {
    File::open(path).map_err(|source| ExecuteError::Redirection {
        path: path.to_owned(),
        source,
    })
}

fn open_output(path: &str) -> Result<File, ExecuteError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .map_err(|source| ExecuteError::Redirection {
            path: path.to_owned(),
            source,
        })
}

fn report(err: &ExecuteError) {
    warn!(%err, "stage not started");
    eprintln!("mysh: {err}");
}

/// Body of a forked stage. Never returns.
fn exec_stage(
    stage: &Prepared,
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    inherited: &[RawFd],
) -> ! {
    for (fd, target) in [(stdin, libc::STDIN_FILENO), (stdout, libc::STDOUT_FILENO)] {
        if let Some(fd) = fd {
            if let Err(errno) = unistd::dup2(fd, target) {
                child_exit(&stage.name, errno, 1);
            }
        }
    }

    for &fd in inherited {
        let _ = unistd::close(fd);
    }

    // Rust ignores SIGPIPE at startup; the new image expects the default.
    // SAFETY: restoring the default disposition installs no handler code.
    let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };

    // SAFETY: `program` and every non-null entry of `argv_ptrs` point into
    // C strings owned by `stage`, and the pointer array is null-terminated.
    unsafe { libc::execv(stage.program.as_ptr(), stage.argv_ptrs.as_ptr()) };

    child_exit(&stage.name, Errno::last(), NOT_FOUND)
}

fn child_exit(name: &str, errno: Errno, code: i32) -> ! {
    let parts: [&[u8]; 5] = [
        b"mysh: ",
        name.as_bytes(),
        b": ",
        errno.desc().as_bytes(),
        b"\n",
    ];
    for part in parts {
        let _ = unistd::write(libc::STDERR_FILENO, part);
    }

    // SAFETY: _exit skips atexit handlers and destructors, which belong to
    // the parent's copy of this address space.
    unsafe { libc::_exit(code) }
}
