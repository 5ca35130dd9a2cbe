/// Prints a shell-level diagnostic to stderr, prefixed the way an interactive
/// user expects (`smash: ...`), independent of whatever `RUST_LOG` is set to.
#[macro_export]
macro_rules! smash_err {
    ($($arg:tt)*) => {
        eprintln!("smash: {}", format!($($arg)*));
    };
}
