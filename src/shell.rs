//! Process-wide shell state (SPEC_FULL.md §3 "Process-wide state").

use crate::job::JobTable;

use nix::sys::termios::Termios;
use nix::unistd::{getpid, Pid};

pub struct Shell {
    shell_pgid: Pid,
    shell_termios: Option<Termios>,
    interactive: bool,
    last_exit_code: i32,
    report_resources: bool,
    debug: bool,
    jobs: JobTable,
}

impl Shell {
    /// Constructs the shell's process-wide state. `shell_pgid`/`shell_termios`
    /// are filled in by [`crate::terminal::setup`] once that runs; until
    /// then they hold the pre-setup defaults.
    pub fn new(interactive: bool, report_resources: bool, debug: bool) -> Shell {
        Shell {
            shell_pgid: getpid(),
            shell_termios: None,
            interactive,
            last_exit_code: 0,
            report_resources,
            debug,
            jobs: JobTable::new(),
        }
    }

    /// A non-interactive shell with no terminal state, for unit tests.
    pub fn new_noninteractive() -> Shell {
        Shell::new(false, false, false)
    }

    pub fn adopt_terminal_state(&mut self, pgid: Pid, termios: Termios) {
        self.shell_pgid = pgid;
        self.shell_termios = Some(termios);
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn report_resources(&self) -> bool {
        self.report_resources
    }

    pub fn shell_pgid(&self) -> Pid {
        self.shell_pgid
    }

    pub fn shell_termios(&self) -> Option<&Termios> {
        self.shell_termios.as_ref()
    }

    pub fn last_exit_code(&self) -> i32 {
        self.last_exit_code
    }

    pub fn set_last_exit_code(&mut self, code: i32) {
        self.last_exit_code = code;
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut JobTable {
        &mut self.jobs
    }
}
