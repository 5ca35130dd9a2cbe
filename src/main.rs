use std::fs::File;
use std::io::{self, Write};

use crossterm::tty::IsTty;
use tracing_subscriber::{self, fmt, prelude::*, EnvFilter};

use builtins::BuiltinCommandContext;
use reader::ReadOutcome;
use shell::Shell;

#[macro_use]
mod macros;

mod builtins;
mod expand;
mod job;
mod parser;
mod process;
mod reader;
mod shell;
mod terminal;

struct Config {
    debug: bool,
    report_resources: bool,
    file: Option<String>,
}

/// Hand-rolled flag parsing for `smash [-d] [-t] [file]` (§10.3): a two-flag,
/// one-positional CLI doesn't earn a `clap` dependency.
fn parse_args(args: impl Iterator<Item = String>) -> Config {
    let mut config = Config {
        debug: false,
        report_resources: false,
        file: None,
    };

    for arg in args {
        match arg.as_str() {
            "-d" => config.debug = true,
            "-t" => config.report_resources = true,
            _ => config.file = Some(arg),
        }
    }

    config
}

fn main() {
    let config = parse_args(std::env::args().skip(1));

    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let is_tty = std::io::stdin().is_tty() && config.file.is_none();
    let mut shell = Shell::new(is_tty, config.report_resources, config.debug);

    if is_tty {
        match terminal::setup(0) {
            Ok((pgid, termios)) => shell.adopt_terminal_state(pgid, termios),
            Err(err) => {
                smash_err!("failed to acquire controlling terminal: {}", err);
                std::process::exit(1);
            }
        }
    }

    let input: Box<dyn io::Read> = match &config.file {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(f),
            Err(err) => {
                smash_err!("{}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => Box::new(io::stdin()),
    };

    let exit_code = run(&mut shell, input);
    shell.jobs_mut().cancel_all();
    shell.jobs_mut().wait_all();
    std::process::exit(exit_code);
}

/// Component G: the top-level loop.
fn run(shell: &mut Shell, input: Box<dyn io::Read>) -> i32 {
    let mut lines = reader::LineReader::new(input);

    loop {
        process::reap_nonblocking(shell);

        if shell.interactive() {
            print!("smash> ");
            let _ = io::stdout().flush();
        }

        let line = match lines.read_line() {
            Ok(ReadOutcome::Line(line)) => line,
            Ok(ReadOutcome::Eof) => break,
            Err(err) => {
                smash_err!("read error: {}", err);
                break;
            }
        };

        process::reap_nonblocking(shell);

        if line.is_empty() {
            continue;
        }

        let first_token = match line.split_whitespace().next() {
            Some(tok) => tok,
            None => continue,
        };

        if builtins::is_builtin(first_token) {
            let argv: Vec<String> = line.split_whitespace().map(String::from).collect();
            match builtins::dispatch(first_token) {
                Ok(command) => {
                    let mut ctx = BuiltinCommandContext { argv: &argv, shell };
                    let code = command.run(&mut ctx);
                    shell.set_last_exit_code(code);
                }
                Err(err) => smash_err!("{}: {}", first_token, err),
            }
            continue;
        }

        match parser::parse(&line) {
            Ok(ui) => {
                process::exec_job(shell, ui);
            }
            Err(parser::ParseError::Empty) => continue,
            Err(parser::ParseError::Fatal(err)) => {
                smash_err!("parse error: {}", err);
            }
        }
    }

    shell.last_exit_code()
}
