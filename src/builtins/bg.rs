use super::{BuiltinCommand, BuiltinCommandContext};
use crate::process;

/// `bg N`: resume job `N` in the background with SIGCONT.
pub struct Bg;

impl BuiltinCommand for Bg {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        let job_id = match ctx.argv.get(1).and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => {
                crate::smash_err!("bg: usage: bg <job>");
                return 1;
            }
        };

        if ctx.shell.jobs().lookup(job_id).is_none() {
            crate::smash_err!("bg: no such job: {}", job_id);
            return 1;
        }

        process::run_in_background(ctx.shell, job_id, true);
        0
    }
}
