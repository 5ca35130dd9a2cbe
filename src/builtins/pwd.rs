use super::{BuiltinCommand, BuiltinCommandContext};

/// `pwd`: prints the current working directory.
pub struct Pwd;

impl BuiltinCommand for Pwd {
    fn run(&self, _ctx: &mut BuiltinCommandContext) -> i32 {
        match std::env::current_dir() {
            Ok(dir) => {
                println!("{}", dir.display());
                0
            }
            Err(err) => {
                crate::smash_err!("pwd: {}", err);
                1
            }
        }
    }
}
