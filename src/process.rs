//! Component E: the job engine — the core state machine. Forks a pipeline,
//! wires pipes and redirections, sets process groups, hands over the
//! controlling terminal, waits/reaps, and restores the terminal to the
//! shell. See SPEC_FULL.md §4.E.

use crate::expand;
use crate::job::{Job, JobId, JobStatus};
use crate::parser::{Command, UserInput};
use crate::shell::Shell;

use nix::fcntl::{open, OFlag};
use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::stat::Mode;
use nix::sys::termios::{tcgetattr, tcsetattr, SetArg::TCSADRAIN};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, getpid, pipe, setpgid, tcsetpgrp, ForkResult, Pid};
use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::time::Instant;
use tracing::{debug, warn};

const RESET_SIGNALS: &[Signal] = &[
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
    Signal::SIGCHLD,
];

/// Submit a freshly parsed line: insert it into the job table, fork its
/// pipeline, and either run it to completion (non-interactive / foreground)
/// or return immediately (background). Returns the assigned job id.
pub fn exec_job(shell: &mut Shell, input: UserInput) -> JobId {
    let is_background = input.is_background;
    let start_time = if shell.report_resources() {
        Some(Instant::now())
    } else {
        None
    };

    let job_id = shell.jobs().next_id();
    let mut job = Job::new(job_id, input, start_time);
    job.rusage_start = getrusage(UsageWho::RUSAGE_CHILDREN).ok();

    let fork_result = fork_pipeline(shell, &job.input, !is_background);

    match fork_result {
        Ok((pgid, pids)) => {
            job.pgid = pgid;
            job.tail_pid = pids.last().copied();
            job.pids = pids;
            job.status = JobStatus::Running;
            job.is_in_background = is_background;
        }
        Err(err) => {
            crate::smash_err!("failed to launch job: {}", err);
            job.status = JobStatus::Aborted;
            job.exit_code = 1;
        }
    }

    let pgid = job.pgid;
    let launch_failed = job.status == JobStatus::Aborted && job.pids.is_empty();
    let job_id = shell.jobs_mut().insert(job);

    if launch_failed {
        return job_id;
    }

    if is_background && shell.interactive() {
        crate::smash_err!("[{}] {}", job_id, pgid);
    } else {
        // A freshly launched foreground job already has the terminal (the
        // child handed it to itself in `fork_pipeline`) and is already
        // marked Running/foreground, so this goes straight to the wait —
        // not through `run_in_foreground`, whose idempotency guard (§8
        // invariant 6) would mistake "just launched" for "already
        // foregrounded, nothing to do" and return without ever waiting.
        wait_foreground(shell, job_id);
        report_resources_if_enabled(shell, job_id);
    }

    job_id
}

/// Forks every command in the pipeline, wiring pipes between adjacent
/// commands and each command's own redirections, and returns the job's
/// pgid together with the pids of every forked child.
fn fork_pipeline(shell: &Shell, input: &UserInput, foreground: bool) -> anyhow::Result<(Pid, Vec<Pid>)> {
    let n = input.commands.len();
    let mut prev_read: Option<RawFd> = None;
    let mut pgid: Option<Pid> = None;
    let mut pids = Vec::with_capacity(n);

    for (k, command) in input.commands.iter().enumerate() {
        let is_last = k == n - 1;
        let (next_read, write_end) = if !is_last {
            let (r, w) = pipe()?;
            (Some(r), Some(w))
        } else {
            (None, None)
        };

        match unsafe { fork() }? {
            ForkResult::Child => {
                let pid = getpid();
                let this_pgid = pgid.unwrap_or(pid);
                let _ = setpgid(pid, this_pgid);

                let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
                for &sig in RESET_SIGNALS {
                    unsafe {
                        let _ = sigaction(sig, &default);
                    }
                }

                if foreground && k == 0 {
                    let _ = tcsetpgrp(0, this_pgid);
                }

                if let Some(r) = prev_read {
                    let _ = dup2(r, 0);
                    let _ = close(r);
                }
                if let Some(w) = write_end {
                    let _ = dup2(w, 1);
                    let _ = close(w);
                }
                if let Some(r) = next_read {
                    let _ = close(r);
                }

                if let Err(err) = apply_redirections(command) {
                    crate::smash_err!("{}: {}", command.program().unwrap_or("?"), err);
                    std::process::exit(1);
                }

                match expand::expand_words(shell, &command.components) {
                    Ok(argv) => exec_child(&argv),
                    Err(err) => {
                        crate::smash_err!("{}: {}", command.program().unwrap_or("?"), err);
                        std::process::exit(1);
                    }
                }
            }
            ForkResult::Parent { child } => {
                let this_pgid = pgid.unwrap_or(child);
                let _ = setpgid(child, this_pgid);
                pgid.get_or_insert(this_pgid);
                pids.push(child);

                if let Some(r) = prev_read {
                    let _ = close(r);
                }
                if let Some(w) = write_end {
                    let _ = close(w);
                }
                prev_read = next_read;
            }
        }
    }

    match pgid {
        Some(pgid) => Ok((pgid, pids)),
        None => anyhow::bail!("empty pipeline"),
    }
}

/// Applies `<`/`>`/`>>`/`2>` redirections, in that order, onto fds 0/1/2.
/// Called after pipe wiring so explicit redirections on the head/tail win.
fn apply_redirections(command: &Command) -> anyhow::Result<()> {
    if let Some(path) = &command.redirect_stdin {
        let fd = open(path.as_str(), OFlag::O_RDONLY, Mode::empty())?;
        dup2(fd, 0)?;
        close(fd)?;
    }
    if let Some(path) = &command.redirect_stdout {
        let flags = OFlag::O_WRONLY
            | OFlag::O_CREAT
            | if command.append_stdout { OFlag::O_APPEND } else { OFlag::O_TRUNC };
        let mode = Mode::from_bits_truncate(0o666);
        let fd = open(path.as_str(), flags, mode)?;
        dup2(fd, 1)?;
        close(fd)?;
    }
    if let Some(path) = &command.redirect_stderr {
        let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
        let mode = Mode::from_bits_truncate(0o666);
        let fd = open(path.as_str(), flags, mode)?;
        dup2(fd, 2)?;
        close(fd)?;
    }
    Ok(())
}

/// Never returns: either `execvp` replaces this process image, or it fails
/// and the child `_exit`s with a diagnostic.
fn exec_child(argv: &[String]) -> ! {
    if argv.is_empty() {
        crate::smash_err!("empty command");
        std::process::exit(1);
    }

    let cargv: Vec<CString> = argv
        .iter()
        .map(|s| CString::new(s.as_str()).unwrap_or_default())
        .collect();
    let refs: Vec<&std::ffi::CStr> = cargv.iter().map(|s| s.as_c_str()).collect();

    match execvp(&cargv[0], &refs) {
        Ok(_) => unreachable!(),
        Err(nix::errno::Errno::ENOENT) => {
            crate::smash_err!("command not found: {}", argv[0]);
            std::process::exit(127);
        }
        Err(nix::errno::Errno::EACCES) => {
            crate::smash_err!("permission denied: {}", argv[0]);
            std::process::exit(126);
        }
        Err(err) => {
            crate::smash_err!("exec failed for {}: {}", argv[0], err);
            std::process::exit(1);
        }
    }
}

/// §4.E.3: move a job into the background, sending SIGCONT if it was
/// suspended.
pub fn run_in_background(shell: &mut Shell, job_id: JobId, send_cont: bool) {
    let pgid = {
        let job = match shell.jobs_mut().lookup_mut(job_id) {
            Some(job) => job,
            None => return,
        };
        job.is_in_background = true;
        job.status = JobStatus::Running;
        job.pgid
    };
    if send_cont {
        let _ = nix::sys::signal::killpg(pgid, Signal::SIGCONT);
    }
}

/// §4.E.3: bring a job to the foreground, hand it the terminal, send
/// SIGCONT if it was suspended, and block until it exits or stops again.
pub fn run_in_foreground(shell: &mut Shell, job_id: JobId, send_cont: bool) {
    let (pgid, was_suspended) = match shell.jobs().lookup(job_id) {
        Some(job) if !job.is_in_background && job.status == JobStatus::Running => {
            // Already foreground: idempotent no-op (§8 invariant 6).
            return;
        }
        Some(job) => (job.pgid, job.status == JobStatus::Suspended),
        None => return,
    };

    if let Some(job) = shell.jobs_mut().lookup_mut(job_id) {
        job.is_in_background = false;
        job.status = JobStatus::Running;
    }

    let _ = tcsetpgrp(0, pgid);
    if send_cont && was_suspended {
        if let Some(job) = shell.jobs().lookup(job_id) {
            if let Some(termios) = &job.saved_termios {
                let _ = tcsetattr(0, TCSADRAIN, termios);
            }
        }
        let _ = nix::sys::signal::killpg(pgid, Signal::SIGCONT);
    }

    wait_foreground(shell, job_id);
    report_resources_if_enabled(shell, job_id);
}

/// Blocks on `waitpid(WUNTRACED)` until the job's tracked pids are either
/// all reaped or the job has stopped, reclaiming the terminal afterward.
fn wait_foreground(shell: &mut Shell, job_id: JobId) {
    loop {
        let done = match shell.jobs().lookup(job_id) {
            Some(job) => job.status.is_terminal() || job.status == JobStatus::Suspended,
            None => true,
        };
        if done {
            break;
        }

        match waitpid(None, Some(WaitPidFlag::WUNTRACED)) {
            Ok(status) => apply_wait_status(shell, status),
            Err(nix::errno::Errno::EINTR) => continue,
            Err(nix::errno::Errno::ECHILD) => break,
            Err(err) => {
                warn!("waitpid failed: {}", err);
                break;
            }
        }
    }

    reclaim_terminal(shell, job_id);

    if let Some(job) = shell.jobs().lookup(job_id) {
        match job.status {
            JobStatus::Exited => shell.set_last_exit_code(job.exit_code),
            JobStatus::Suspended => {
                let line = job.display_line();
                crate::smash_err!("{}", line);
            }
            _ => {}
        }
    }
}

fn reclaim_terminal(shell: &mut Shell, job_id: JobId) {
    if !shell.interactive() {
        return;
    }
    if let Ok(current) = tcgetattr(0) {
        if let Some(job) = shell.jobs_mut().lookup_mut(job_id) {
            job.saved_termios = Some(current);
        }
    }
    let _ = tcsetpgrp(0, shell.shell_pgid());
    if let Some(termios) = shell.shell_termios() {
        let _ = tcsetattr(0, TCSADRAIN, termios);
    }
}

/// §4.E.4: the non-blocking reaper invoked before and after each line read.
/// The only place background job progress is observed.
pub fn reap_nonblocking(shell: &mut Shell) {
    loop {
        let options = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        match waitpid(None, Some(options)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => apply_wait_status(shell, status),
            Err(nix::errno::Errno::ECHILD) => break,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(err) => {
                warn!("non-blocking reap failed: {}", err);
                break;
            }
        }
    }
}

fn apply_wait_status(shell: &mut Shell, status: WaitStatus) {
    let pid = match status.pid() {
        Some(pid) => pid,
        None => return,
    };

    let job_id = match shell.jobs().find_by_pid(pid) {
        Some(id) => id,
        None => {
            debug!(pid = pid.as_raw(), "reaped pid with no tracked job");
            return;
        }
    };

    let terminal_completion = matches!(status, WaitStatus::Exited(..) | WaitStatus::Signaled(..));
    if terminal_completion {
        if let Some(job) = shell.jobs_mut().lookup_mut(job_id) {
            job.forget_pid(pid);
        }
    }

    let job = match shell.jobs_mut().lookup_mut(job_id) {
        Some(job) => job,
        None => return,
    };

    // §8 invariant 5: `exit_code` always comes from the pipeline's last
    // command, never from whichever pid the reaper happens to see last.
    match status {
        WaitStatus::Exited(exited_pid, code) if Some(exited_pid) == job.tail_pid => {
            job.exit_code = code;
        }
        WaitStatus::Signaled(signaled_pid, signal, _) if Some(signaled_pid) == job.tail_pid => {
            job.exit_code = signal as i32;
        }
        _ => {}
    }

    // The job itself only reaches a terminal state once every pipeline
    // member has been reaped (§8 invariant 1), regardless of which one
    // supplied the exit code above.
    match status {
        WaitStatus::Exited(..) => {
            if job.pids.is_empty() {
                job.status = JobStatus::Exited;
            }
        }
        WaitStatus::Signaled(..) => {
            if job.pids.is_empty() {
                job.status = JobStatus::Aborted;
            }
        }
        WaitStatus::Stopped(..) => {
            job.status = JobStatus::Suspended;
        }
        WaitStatus::Continued(_) => {
            job.status = JobStatus::Running;
        }
        _ => {}
    }
}

fn report_resources_if_enabled(shell: &Shell, job_id: JobId) {
    if !shell.report_resources() {
        return;
    }
    let job = match shell.jobs().lookup(job_id) {
        Some(job) => job,
        None => return,
    };

    let real = job
        .start_time
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0);

    let (user, sys) = match (job.rusage_start.as_ref(), getrusage(UsageWho::RUSAGE_CHILDREN).ok()) {
        (Some(start), Some(end)) => {
            let user = timeval_diff_secs(end.user_time(), start.user_time());
            let sys = timeval_diff_secs(end.system_time(), start.system_time());
            (user, sys)
        }
        _ => (0.0, 0.0),
    };

    eprintln!("TIMES: real={:.3} user={:.3} sys={:.3}", real, user, sys);
}

fn timeval_diff_secs(end: nix::sys::time::TimeVal, start: nix::sys::time::TimeVal) -> f64 {
    let end_secs = end.tv_sec() as f64 + end.tv_usec() as f64 / 1_000_000.0;
    let start_secs = start.tv_sec() as f64 + start.tv_usec() as f64 / 1_000_000.0;
    (end_secs - start_secs).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::dup;
    use std::io::Write;

    fn stdout_command(path: &std::path::Path, append: bool) -> Command {
        Command {
            raw: String::new(),
            components: vec!["test".to_string()],
            redirect_stdin: None,
            redirect_stdout: Some(path.to_string_lossy().into_owned()),
            redirect_stderr: None,
            append_stdout: append,
            in_fd: -1,
            out_fd: -1,
        }
    }

    /// Temporarily redirects the *test process's* own fd 1 through
    /// `apply_redirections`, the same operation a forked child performs
    /// before `execvp`, and checks the bytes landed in the target file.
    #[test]
    fn stdout_redirect_creates_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale").unwrap();

        let saved_stdout = dup(1).unwrap();
        apply_redirections(&stdout_command(&path, false)).unwrap();
        print!("fresh");
        std::io::stdout().flush().unwrap();
        dup2(saved_stdout, 1).unwrap();
        close(saved_stdout).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[test]
    fn stdout_redirect_appends_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "existing-").unwrap();

        let saved_stdout = dup(1).unwrap();
        apply_redirections(&stdout_command(&path, true)).unwrap();
        print!("appended");
        std::io::stdout().flush().unwrap();
        dup2(saved_stdout, 1).unwrap();
        close(saved_stdout).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing-appended");
    }

    #[test]
    fn timeval_diff_never_goes_negative() {
        use nix::sys::time::{TimeVal, TimeValLike};
        let earlier = TimeVal::seconds(10);
        let later = TimeVal::seconds(5);
        assert_eq!(timeval_diff_secs(later, earlier), 0.0);
    }
}
