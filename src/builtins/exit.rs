use super::{BuiltinCommand, BuiltinCommandContext};

/// `exit [N]`: tears down every live job the same way shell teardown does
/// (§4.E.5), then terminates the process with `N` (default 0).
pub struct Exit;

impl BuiltinCommand for Exit {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        let code = ctx
            .argv
            .get(1)
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);

        ctx.shell.jobs_mut().cancel_all();
        ctx.shell.jobs_mut().wait_all();
        std::process::exit(code);
    }
}
