//! Background job table.
//!
//! The table is shared between the read-eval loop, which registers jobs,
//! and the reaper task, which marks them completed. Completion lines are
//! queued as [`Completion`]s and printed by the loop right before the next
//! prompt, never from the reaper itself.

use std::{
    fmt, io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use nix::unistd::Pid;
use tokio::{
    signal::unix::{signal, SignalKind},
    task::JoinHandle,
};

use crate::process::{Child, ExitStatus};

pub type JobId = usize;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
}

#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub child: Child,
    pub text: String,
    pub state: JobState,
    /// Earlier pipeline stages. They are reaped but never reported.
    upstream: Vec<Child>,
}

/// A running job as listed by `jobs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningJob {
    pub id: JobId,
    pub pid: Pid,
    pub text: String,
}

/// A finished job waiting to be announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: JobId,
    pub text: String,
    pub status: ExitStatus,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]+ Done                    {}", self.id, self.text)
    }
}

#[derive(Debug, Default)]
struct Table {
    jobs: Vec<Job>,
    /// Children that were started in the background but could not get a
    /// slot. They still need reaping.
    untracked: Vec<Child>,
    notices: Vec<Completion>,
}

#[derive(Debug)]
pub struct JobRegistry {
    capacity: usize,
    table: Mutex<Table>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl JobRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            table: Mutex::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a background pipeline whose final stage is `child`.
    ///
    /// Ids start at 1 and are never reused. Once the table is full the
    /// children are only reaped, and `None` is returned.
    pub fn register(&self, child: Child, upstream: Vec<Child>, text: &str) -> Option<JobId> {
        let mut table = self.lock();

        if table.jobs.len() >= self.capacity {
            warn!(pid = %child.pid, capacity = self.capacity, "job table full, not tracking job");
            table.untracked.push(child);
            table.untracked.extend(upstream);
            return None;
        }

        let id = table.jobs.len() + 1;
        debug!(id, pid = %child.pid, text, "registered job");

        table.jobs.push(Job {
            id,
            child,
            text: text.to_owned(),
            state: JobState::Running,
            upstream,
        });

        Some(id)
    }

    /// Takes over children that belong to no job so they get reaped.
    pub fn adopt(&self, children: impl IntoIterator<Item = Child>) {
        self.lock().untracked.extend(children);
    }

    /// Runs one non-blocking reaping pass over every child the registry
    /// owns and returns how many jobs completed.
    ///
    /// Only registered pids are waited for, so children the loop is waiting
    /// on in the foreground are never stolen.
    pub fn reap(&self) -> usize {
        let mut table = self.lock();
        let Table {
            jobs,
            untracked,
            notices,
        } = &mut *table;

        let mut completed = 0;

        for job in jobs.iter_mut() {
            job.upstream.retain(|child| !reaped(child));

            if job.state != JobState::Running {
                continue;
            }

            if let Some(status) = poll(&job.child) {
                job.state = JobState::Completed;
                completed += 1;
                debug!(id = job.id, %status, "job completed");
                notices.push(Completion {
                    id: job.id,
                    text: job.text.clone(),
                    status,
                });
            }
        }

        untracked.retain(|child| !reaped(child));

        completed
    }

    /// Drains the completions queued since the last call.
    pub fn take_notices(&self) -> Vec<Completion> {
        std::mem::take(&mut self.lock().notices)
    }

    pub fn running(&self) -> Vec<RunningJob> {
        self.lock()
            .jobs
            .iter()
            .filter(|job| job.state == JobState::Running)
            .map(|job| RunningJob {
                id: job.id,
                pid: job.child.pid,
                text: job.text.clone(),
            })
            .collect()
    }

    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.lock()
            .jobs
            .iter()
            .find(|job| job.id == id)
            .map(|job| job.state)
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poll(child: &Child) -> Option<ExitStatus> {
    match child.try_wait() {
        Ok(status) => status,
        Err(err) => {
            error!(pid = %child.pid, %err, "failed to poll child");
            None
        }
    }
}

fn reaped(child: &Child) -> bool {
    poll(child).is_some()
}

/// Spawns the task that reaps background children whenever `SIGCHLD`
/// arrives. Must be called from within a tokio runtime.
pub fn spawn_reaper(registry: Arc<JobRegistry>) -> io::Result<JoinHandle<()>> {
    let mut sigchld = signal(SignalKind::child())?;

    Ok(tokio::spawn(async move {
        while sigchld.recv().await.is_some() {
            let completed = registry.reap();
            trace!(completed, "SIGCHLD reaping pass");
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::{
        process::Command,
        thread,
        time::{Duration, Instant},
    };

    use super::*;

    fn spawn(program: &str, args: &[&str]) -> Child {
        let child = Command::new(program).args(args).spawn().unwrap();
        Child::new(Pid::from_raw(child.id() as i32), program)
    }

    fn reap_until<F: Fn(&JobRegistry) -> bool>(registry: &JobRegistry, done: F) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done(registry) {
            assert!(Instant::now() < deadline, "timed out waiting for jobs");
            registry.reap();
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let registry = JobRegistry::new(4);
        let first = registry.register(spawn("true", &[]), vec![], "true");
        let second = registry.register(spawn("true", &[]), vec![], "true");
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));

        reap_until(&registry, |r| r.running().is_empty());
    }

    #[test]
    fn completion_is_queued_once() {
        let registry = JobRegistry::new(4);
        let id = registry
            .register(spawn("sleep", &["0.1"]), vec![], "sleep 0.1")
            .unwrap();
        assert_eq!(registry.state(id), Some(JobState::Running));
        assert_eq!(registry.running().len(), 1);

        reap_until(&registry, |r| r.state(id) == Some(JobState::Completed));

        let notices = registry.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].id, id);
        assert_eq!(notices[0].text, "sleep 0.1");
        assert_eq!(notices[0].status, ExitStatus::new_success());
        assert_eq!(
            notices[0].to_string(),
            format!("[{id}]+ Done                    sleep 0.1")
        );

        registry.reap();
        assert!(registry.take_notices().is_empty());
        assert!(registry.running().is_empty());
        // completed jobs stay in the table
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn several_terminations_drain_in_one_pass() {
        let registry = JobRegistry::new(8);
        for _ in 0..3 {
            registry.register(spawn("true", &[]), vec![], "true");
        }

        thread::sleep(Duration::from_millis(300));
        reap_until(&registry, |r| r.running().is_empty());
        assert_eq!(registry.take_notices().len(), 3);
    }

    #[tokio::test]
    async fn reaper_task_collects_without_polling() {
        let registry = Arc::new(JobRegistry::new(4));
        let reaper = spawn_reaper(registry.clone()).unwrap();

        let id = registry
            .register(spawn("sleep", &["0.1"]), vec![], "sleep 0.1")
            .unwrap();

        let notices = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let notices = registry.take_notices();
                if !notices.is_empty() {
                    break notices;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("SIGCHLD never reaped the job");

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].id, id);
        assert_eq!(registry.state(id), Some(JobState::Completed));

        reaper.abort();
    }

    #[test]
    fn full_table_drops_registration_but_still_reaps() {
        let registry = JobRegistry::new(1);
        assert_eq!(registry.register(spawn("true", &[]), vec![], "a"), Some(1));

        let extra = spawn("true", &[]);
        let extra_pid = extra.pid;
        assert_eq!(registry.register(extra, vec![], "b"), None);
        assert_eq!(registry.len(), 1);

        reap_until(&registry, |r| r.running().is_empty());
        for _ in 0..50 {
            registry.reap();
            thread::sleep(Duration::from_millis(20));
        }

        // the untracked child has been waited for by the registry
        assert_eq!(
            nix::sys::wait::waitpid(extra_pid, Some(nix::sys::wait::WaitPidFlag::WNOHANG)),
            Err(nix::errno::Errno::ECHILD)
        );
    }
}
