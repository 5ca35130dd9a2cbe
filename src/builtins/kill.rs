use super::{BuiltinCommand, BuiltinCommandContext};
use nix::sys::signal::Signal;
use std::convert::TryFrom;

/// `kill -SIG N`: send signal `SIG` to job `N`'s process group. Only
/// {Running, Suspended} jobs are valid targets (§4.C).
pub struct Kill;

impl BuiltinCommand for Kill {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        let sig_arg = match ctx.argv.get(1).and_then(|s| s.strip_prefix('-')) {
            Some(s) => s,
            None => {
                crate::smash_err!("kill: usage: kill -SIG <job>");
                return 1;
            }
        };
        let signal = match sig_arg.parse::<i32>().ok().and_then(|n| Signal::try_from(n).ok()) {
            Some(sig) => sig,
            None => {
                crate::smash_err!("kill: unknown signal: {}", sig_arg);
                return 1;
            }
        };

        let job_id = match ctx.argv.get(2).and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => {
                crate::smash_err!("kill: usage: kill -SIG <job>");
                return 1;
            }
        };

        match ctx.shell.jobs().signal_job(job_id, signal) {
            Ok(()) => 0,
            Err(err) => {
                crate::smash_err!("kill: {}", err);
                1
            }
        }
    }
}
