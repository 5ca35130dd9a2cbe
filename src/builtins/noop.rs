use super::{BuiltinCommand, BuiltinCommandContext};

/// `#`: a comment line that slipped past the line reader's own stripping
/// (e.g. a line that is *only* `#...` with no leading whitespace removed
/// yet) — does nothing.
pub struct Noop;

impl BuiltinCommand for Noop {
    fn run(&self, _ctx: &mut BuiltinCommandContext) -> i32 {
        0
    }
}
