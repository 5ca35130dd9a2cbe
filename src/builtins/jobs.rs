use super::{BuiltinCommand, BuiltinCommandContext};

/// `jobs`: prints every tracked job; terminal jobs are reaped from the
/// table right after being printed (§4.C, §4.D).
pub struct Jobs;

impl BuiltinCommand for Jobs {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        for line in ctx.shell.jobs_mut().list_and_reap_terminal() {
            println!("{}", line);
        }
        0
    }
}
