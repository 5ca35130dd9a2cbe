use super::{BuiltinCommand, BuiltinCommandContext};
use crate::expand;

/// `echo args…`: `$`-expands each argument and prints them space-joined.
pub struct Echo;

impl BuiltinCommand for Echo {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32 {
        match expand::expand_words(ctx.shell, ctx.argv) {
            Ok(words) => {
                println!("{}", words[1..].join(" "));
                0
            }
            Err(err) => {
                crate::smash_err!("echo: {}", err);
                1
            }
        }
    }
}
