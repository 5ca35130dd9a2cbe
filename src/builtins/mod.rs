//! Component C: the builtin dispatcher. A fixed table of (name, handler)
//! pairs, matched against the first whitespace-delimited token of a line by
//! **full string equality** — never a prefix match (§4.C, §9).

use crate::shell::Shell;

use thiserror::Error;

mod bg;
mod cd;
mod echo;
mod exit;
mod fg;
mod jobs;
mod kill;
mod noop;
mod pwd;

pub trait BuiltinCommand {
    fn run(&self, ctx: &mut BuiltinCommandContext) -> i32;
}

pub struct BuiltinCommandContext<'a> {
    pub argv: &'a [String],
    pub shell: &'a mut Shell,
}

#[derive(Debug, Error)]
pub enum BuiltinCommandError {
    #[error("command not found")]
    NotFound,
}

const BUILTIN_NAMES: &[&str] = &["exit", "cd", "pwd", "echo", "jobs", "fg", "bg", "kill", "#"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

pub fn dispatch(name: &str) -> Result<Box<dyn BuiltinCommand>, BuiltinCommandError> {
    match name {
        "exit" => Ok(Box::new(exit::Exit)),
        "cd" => Ok(Box::new(cd::Cd)),
        "pwd" => Ok(Box::new(pwd::Pwd)),
        "echo" => Ok(Box::new(echo::Echo)),
        "jobs" => Ok(Box::new(jobs::Jobs)),
        "fg" => Ok(Box::new(fg::Fg)),
        "bg" => Ok(Box::new(bg::Bg)),
        "kill" => Ok(Box::new(kill::Kill)),
        "#" => Ok(Box::new(noop::Noop)),
        _ => Err(BuiltinCommandError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_are_builtins() {
        for name in BUILTIN_NAMES {
            assert!(is_builtin(name));
        }
    }

    #[test]
    fn prefix_is_not_a_builtin() {
        assert!(!is_builtin("exitfoo"));
        assert!(!is_builtin("ex"));
    }

    #[test]
    fn unknown_name_is_not_a_builtin() {
        assert!(!is_builtin("ls"));
    }
}
