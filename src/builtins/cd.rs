use super::{BuiltinCommand, BuiltinCommandContext};
use crate::expand;

/// `cd [path]`: no argument goes to `$HOME` (error if unset); the argument
/// is `$`- and tilde-expanded the same way a path redirection would be.
pub struct Cd;

impl BuiltinCommand for Cd {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        let target = match ctx.argv.get(1) {
            Some(raw) => expand::expand_path_argument(ctx.shell, raw),
            None => match std::env::var("HOME") {
                Ok(home) => home,
                Err(_) => {
                    crate::smash_err!("cd: HOME not set");
                    return 1;
                }
            },
        };

        match std::env::set_current_dir(&target) {
            Ok(()) => 0,
            Err(err) => {
                crate::smash_err!("cd: {}: {}", target, err);
                1
            }
        }
    }
}
