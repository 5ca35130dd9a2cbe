//! Component F: shell-startup signal disposition and controlling-terminal
//! acquisition. Runs once, before the top-level loop starts, and only when
//! the shell is interactive.

use nix::sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{tcgetattr, Termios};
use nix::unistd::{getpgrp, getpid, setpgid, tcgetpgrp, tcsetpgrp, Pid};
use tracing::debug;

const JOB_CONTROL_SIGNALS: &[Signal] = &[
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// Claims the controlling terminal for the shell's own process group and
/// puts SIGINT/SIGQUIT/SIGTSTP/SIGTTIN/SIGTTOU into "ignore" so the shell
/// itself is never stopped or killed by job-control signals meant for a
/// foreground child. SIGCHLD is left at its default disposition — the shell
/// reaps only by explicit `waitpid`, never from a handler (§4.E.4).
///
/// Returns the terminal attributes snapshotted once setup completes, and the
/// shell's own pgid. Callers that are not interactive should skip this
/// entirely.
pub fn setup(stdin_fd: i32) -> nix::Result<(Pid, Termios)> {
    let pid = getpid();

    // Spin until we're the terminal's foreground group: a backgrounded
    // shell (e.g. `smash &`) would otherwise get stopped by SIGTTIN on its
    // first tcsetpgrp below.
    while tcgetpgrp(stdin_fd)? != getpgrp() {
        let _ = kill(Pid::from_raw(-pid.as_raw()), Signal::SIGTTIN);
    }

    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::SA_RESTART, SigSet::empty());
    for &sig in JOB_CONTROL_SIGNALS {
        unsafe {
            sigaction(sig, &ignore)?;
        }
    }

    setpgid(pid, pid)?;
    tcsetpgrp(stdin_fd, pid)?;
    let termios = tcgetattr(stdin_fd)?;

    debug!(pgid = pid.as_raw(), "acquired controlling terminal");
    Ok((pid, termios))
}
