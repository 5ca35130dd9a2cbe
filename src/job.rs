//! The job table (component D): an insertion-ordered list of [`Job`]s,
//! each one a process group tracking the lifecycle of a submitted pipeline.

use crate::parser::UserInput;

use nix::sys::resource::Usage;
use nix::sys::signal::{kill, killpg, Signal};
use nix::sys::termios::Termios;
use nix::unistd::Pid;
use std::time::Instant;
use tracing::debug;

pub type JobId = usize;

/// The lifecycle state of a tracked job. See SPEC_FULL.md §4.E.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    New,
    Running,
    Suspended,
    Exited,
    Aborted,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Exited | JobStatus::Aborted)
    }

    pub fn is_live(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Suspended)
    }

    fn label(self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Running => "running",
            JobStatus::Suspended => "suspended",
            JobStatus::Exited => "exited",
            JobStatus::Aborted => "aborted",
            JobStatus::Canceled => "canceled",
        }
    }
}

/// One submitted [`UserInput`] being tracked by the shell.
pub struct Job {
    pub input: UserInput,
    pub job_id: JobId,
    pub pgid: Pid,
    /// Every child pid belonging to this job's process group. Matching a
    /// reaped pid against this set (rather than only `pgid`) is what lets the
    /// non-blocking reaper attribute a late-reporting pipeline follower to
    /// the right job even after the group leader is already gone.
    pub pids: Vec<Pid>,
    /// The pid of the pipeline's last command — `$?`/the job's terminal
    /// `exit_code` always comes from this pid's wait status, never from
    /// whichever pid the reaper happens to observe exit last.
    pub tail_pid: Option<Pid>,
    pub status: JobStatus,
    pub exit_code: i32,
    pub is_in_background: bool,
    pub saved_termios: Option<Termios>,
    pub start_time: Option<Instant>,
    /// `getrusage(RUSAGE_CHILDREN)` snapshotted right before the job's first
    /// fork, so completion reporting (§4.J) can report just this job's
    /// share of child resource usage rather than the shell's lifetime total.
    pub rusage_start: Option<Usage>,
}

impl Job {
    pub fn new(job_id: JobId, input: UserInput, start_time: Option<Instant>) -> Job {
        Job {
            input,
            job_id,
            pgid: Pid::from_raw(0),
            pids: Vec::new(),
            tail_pid: None,
            status: JobStatus::New,
            exit_code: 0,
            is_in_background: false,
            saved_termios: None,
            start_time,
            rusage_start: None,
        }
    }

    /// The line the user typed, for `jobs` display.
    pub fn raw(&self) -> &str {
        &self.input.raw
    }

    /// Remove a pid from the job's tracked set; returns true if the job's
    /// group has no remaining live members.
    pub fn forget_pid(&mut self, pid: Pid) -> bool {
        self.pids.retain(|&p| p != pid);
        self.pids.is_empty()
    }

    pub fn display_line(&self) -> String {
        match self.status {
            JobStatus::Exited | JobStatus::Aborted => format!(
                "[{}] ({} {}) {}",
                self.job_id,
                self.status.label(),
                self.exit_code,
                self.raw()
            ),
            _ => format!("[{}] ({}) {}", self.job_id, self.status.label(), self.raw()),
        }
    }
}

/// Component D. Insertion-ordered; job ids are the previous tail's id + 1,
/// restarting at 1 once the table fully drains.
#[derive(Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn new() -> JobTable {
        JobTable { jobs: Vec::new() }
    }

    pub fn next_id(&self) -> JobId {
        self.jobs.last().map(|j| j.job_id + 1).unwrap_or(1)
    }

    pub fn insert(&mut self, job: Job) -> JobId {
        let id = job.job_id;
        self.jobs.push(job);
        id
    }

    pub fn remove(&mut self, job_id: JobId) -> Option<Job> {
        let pos = self.jobs.iter().position(|j| j.job_id == job_id)?;
        Some(self.jobs.remove(pos))
    }

    pub fn lookup(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    pub fn lookup_mut(&mut self, job_id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.job_id == job_id)
    }

    /// Find the job owning a given child pid (not just a pgid match).
    pub fn find_by_pid(&self, pid: Pid) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|j| j.pids.contains(&pid))
            .map(|j| j.job_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Print every tracked job; terminal jobs are printed then dropped from
    /// the table (the only place terminated jobs are surfaced to the user).
    pub fn list_and_reap_terminal(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut terminal_ids = Vec::new();
        for job in &self.jobs {
            lines.push(job.display_line());
            if job.status.is_terminal() {
                terminal_ids.push(job.job_id);
            }
        }
        for id in terminal_ids {
            self.remove(id);
        }
        lines
    }

    /// SIGCONT then SIGTERM every live job's group, marking it Canceled.
    /// Called once at shell teardown; escalation to SIGKILL happens in
    /// `wait_all` if a group survives the grace period.
    pub fn cancel_all(&mut self) {
        for job in &mut self.jobs {
            if job.status.is_live() {
                debug!(job_id = job.job_id, pgid = job.pgid.as_raw(), "canceling job");
                let _ = killpg(job.pgid, Signal::SIGCONT);
                let _ = killpg(job.pgid, Signal::SIGTERM);
                job.status = JobStatus::Canceled;
            }
        }
    }

    /// Block until every job not already in a terminal state is reaped,
    /// escalating to SIGKILL for groups that outlive a short grace period.
    pub fn wait_all(&mut self) {
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
        use std::time::Duration;

        const GRACE: Duration = Duration::from_millis(500);

        let pgids: Vec<Pid> = self
            .jobs
            .iter()
            .filter(|j| !j.status.is_terminal())
            .map(|j| j.pgid)
            .collect();

        for pgid in pgids {
            let deadline = Instant::now() + GRACE;
            let mut killed = false;
            loop {
                match waitpid(Pid::from_raw(-pgid.as_raw()), Some(WaitPidFlag::WNOHANG)) {
                    Ok(WaitStatus::StillAlive) | Ok(WaitStatus::Exited(_, _))
                        if !killed && Instant::now() >= deadline =>
                    {
                        let _ = killpg(pgid, Signal::SIGKILL);
                        killed = true;
                    }
                    Ok(WaitStatus::StillAlive) => {
                        if Instant::now() >= deadline && !killed {
                            let _ = killpg(pgid, Signal::SIGKILL);
                            killed = true;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(nix::errno::Errno::ECHILD) => break,
                    Ok(_) => continue,
                    Err(nix::errno::Errno::EINTR) => continue,
                    Err(_) => break,
                }
            }
        }

        self.jobs.clear();
    }

    /// Best-effort: send a signal to a single job's process group. Only
    /// {Running, Suspended} jobs are valid `kill` targets.
    pub fn signal_job(&self, job_id: JobId, signal: Signal) -> Result<(), JobLookupError> {
        let job = self.lookup(job_id).ok_or(JobLookupError::NotFound(job_id))?;
        if !job.status.is_live() {
            return Err(JobLookupError::NotLive(job_id));
        }
        let _ = kill(Pid::from_raw(-job.pgid.as_raw()), signal);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobLookupError {
    #[error("no such job: {0}")]
    NotFound(JobId),
    #[error("job {0} is not running or suspended")]
    NotLive(JobId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::UserInput;

    fn ui(raw: &str) -> UserInput {
        UserInput {
            raw: raw.to_string(),
            commands: Vec::new(),
            is_background: false,
        }
    }

    #[test]
    fn ids_increment_from_one() {
        let mut table = JobTable::new();
        let id1 = table.next_id();
        assert_eq!(id1, 1);
        table.insert(Job::new(id1, ui("a"), None));
        let id2 = table.next_id();
        assert_eq!(id2, 2);
        table.insert(Job::new(id2, ui("b"), None));
        assert_eq!(table.next_id(), 3);
    }

    #[test]
    fn id_restarts_at_one_after_drain() {
        let mut table = JobTable::new();
        let id = table.next_id();
        table.insert(Job::new(id, ui("a"), None));
        table.remove(id);
        assert!(table.is_empty());
        assert_eq!(table.next_id(), 1);
    }

    #[test]
    fn terminal_jobs_are_reaped_on_listing() {
        let mut table = JobTable::new();
        let id = table.next_id();
        let mut job = Job::new(id, ui("sleep 1"), None);
        job.status = JobStatus::Exited;
        job.exit_code = 0;
        table.insert(job);

        let lines = table.list_and_reap_terminal();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("exited 0"));
        assert!(table.is_empty());
    }

    #[test]
    fn find_by_pid_matches_any_tracked_pid() {
        let mut table = JobTable::new();
        let id = table.next_id();
        let mut job = Job::new(id, ui("a | b"), None);
        job.pids = vec![Pid::from_raw(100), Pid::from_raw(101)];
        table.insert(job);

        assert_eq!(table.find_by_pid(Pid::from_raw(101)), Some(id));
        assert_eq!(table.find_by_pid(Pid::from_raw(999)), None);
    }

    #[test]
    fn signal_job_rejects_terminal_state() {
        let mut table = JobTable::new();
        let id = table.next_id();
        let mut job = Job::new(id, ui("a"), None);
        job.status = JobStatus::Exited;
        table.insert(job);

        assert!(matches!(
            table.signal_job(id, Signal::SIGTERM),
            Err(JobLookupError::NotLive(_))
        ));
    }

    #[test]
    fn signal_job_unknown_id_errors() {
        let table = JobTable::new();
        assert!(matches!(
            table.signal_job(42, Signal::SIGTERM),
            Err(JobLookupError::NotFound(42))
        ));
    }
}
