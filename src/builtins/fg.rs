use super::{BuiltinCommand, BuiltinCommandContext};
use crate::process;

/// `fg N`: bring job `N` to the foreground, resuming it with SIGCONT if it
/// was suspended.
pub struct Fg;

impl BuiltinCommand for Fg {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        let job_id = match ctx.argv.get(1).and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => {
                crate::smash_err!("fg: usage: fg <job>");
                return 1;
            }
        };

        if ctx.shell.jobs().lookup(job_id).is_none() {
            crate::smash_err!("fg: no such job: {}", job_id);
            return 1;
        }

        process::run_in_foreground(ctx.shell, job_id, true);
        ctx.shell.last_exit_code()
    }
}
