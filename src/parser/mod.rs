//! Component B: turns one input line into a [`UserInput`] — a pipeline of
//! [`Command`]s, each with its redirections parsed out, plus the background
//! sentinel. Tokenization is handled by a `pest` grammar (`grammar.pest`);
//! this module only walks the resulting parse tree into the data model.

use std::os::unix::io::RawFd;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
struct LineParser;

/// One program invocation within a pipeline. See SPEC_FULL.md §3.
///
/// `components` is the ordered sequence of shell-words: index 0 is the
/// program name, the rest is its argv tail. A bare `String` is used rather
/// than a wrapper type since a component carries nothing but its text.
#[derive(Debug, Clone)]
pub struct Command {
    pub raw: String,
    pub components: Vec<String>,
    pub redirect_stdin: Option<String>,
    pub redirect_stdout: Option<String>,
    pub redirect_stderr: Option<String>,
    pub append_stdout: bool,
    pub in_fd: RawFd,
    pub out_fd: RawFd,
}

impl Command {
    fn new(raw: String) -> Command {
        Command {
            raw,
            components: Vec::new(),
            redirect_stdin: None,
            redirect_stdout: None,
            redirect_stderr: None,
            append_stdout: false,
            in_fd: -1,
            out_fd: -1,
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.components.first().map(|s| s.as_str())
    }
}

/// One user command line. See SPEC_FULL.md §3.
#[derive(Debug, Clone)]
pub struct UserInput {
    pub raw: String,
    pub commands: Vec<Command>,
    pub is_background: bool,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("parse error: {0}")]
    Fatal(String),
}

/// Parses one (already trimmed, non-comment) input line. Returns
/// `Err(ParseError::Empty)` for a line with no pipeline (e.g. only
/// whitespace slipped through); the caller treats that as "re-prompt".
pub fn parse(line: &str) -> Result<UserInput, ParseError> {
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut pairs = LineParser::parse(Rule::line, line).map_err(|e| ParseError::Fatal(e.to_string()))?;
    let line_pair = pairs.next().ok_or(ParseError::Empty)?;

    let mut commands = Vec::new();
    let mut is_background = false;

    for inner in line_pair.into_inner() {
        match inner.as_rule() {
            Rule::pipeline => {
                for command_pair in inner.into_inner() {
                    commands.push(build_command(command_pair));
                }
            }
            Rule::background => is_background = true,
            Rule::EOI => {}
            _ => unreachable!("unexpected top-level rule: {:?}", inner.as_rule()),
        }
    }

    if commands.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(UserInput {
        raw: line.to_string(),
        commands,
        is_background,
    })
}

fn build_command(pair: Pair<Rule>) -> Command {
    let raw = pair.as_str().trim().to_string();
    let mut command = Command::new(raw);

    for segment in pair.into_inner() {
        match segment.as_rule() {
            Rule::word => command.components.push(segment.as_str().to_string()),
            Rule::redirect => apply_redirect(&mut command, segment),
            other => unreachable!("unexpected command segment: {:?}", other),
        }
    }

    command
}

fn apply_redirect(command: &mut Command, pair: Pair<Rule>) {
    let inner = pair.into_inner().next().expect("redirect has one child");
    let path = inner
        .clone()
        .into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();

    match inner.as_rule() {
        Rule::append_redirect => {
            command.redirect_stdout = Some(path);
            command.append_stdout = true;
        }
        Rule::stdout_redirect => {
            command.redirect_stdout = Some(path);
            command.append_stdout = false;
        }
        Rule::stderr_redirect => command.redirect_stderr = Some(path),
        Rule::stdin_redirect => command.redirect_stdin = Some(path),
        other => unreachable!("unexpected redirect variant: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_command() {
        let ui = parse("echo hello world").unwrap();
        assert_eq!(ui.commands.len(), 1);
        assert_eq!(ui.commands[0].components, vec!["echo", "hello", "world"]);
        assert!(!ui.is_background);
    }

    #[test]
    fn pipeline_splits_on_pipe() {
        let ui = parse("du /tmp | sort -nr | wc -l").unwrap();
        assert_eq!(ui.commands.len(), 3);
        assert_eq!(ui.commands[0].components, vec!["du", "/tmp"]);
        assert_eq!(ui.commands[1].components, vec!["sort", "-nr"]);
        assert_eq!(ui.commands[2].components, vec!["wc", "-l"]);
    }

    #[test]
    fn trailing_background_sentinel() {
        let ui = parse("sleep 2 &").unwrap();
        assert!(ui.is_background);
        assert_eq!(ui.commands[0].components, vec!["sleep", "2"]);
    }

    #[test]
    fn joined_background_sentinel() {
        let ui = parse("sleep 2&").unwrap();
        assert!(ui.is_background);
        assert_eq!(ui.commands[0].components, vec!["sleep", "2"]);
    }

    #[test]
    fn redirect_joined_to_path() {
        let ui = parse("ls >out.txt").unwrap();
        assert_eq!(ui.commands[0].redirect_stdout.as_deref(), Some("out.txt"));
        assert!(!ui.commands[0].append_stdout);
    }

    #[test]
    fn redirect_separated_from_path() {
        let ui = parse("ls >> out.txt").unwrap();
        assert_eq!(ui.commands[0].redirect_stdout.as_deref(), Some("out.txt"));
        assert!(ui.commands[0].append_stdout);
    }

    #[test]
    fn stderr_redirect() {
        let ui = parse("cmd 2> err.txt").unwrap();
        assert_eq!(ui.commands[0].redirect_stderr.as_deref(), Some("err.txt"));
    }

    #[test]
    fn stdin_redirect_and_pipe_combo() {
        let ui = parse("cat < out.txt").unwrap();
        assert_eq!(ui.commands[0].redirect_stdin.as_deref(), Some("out.txt"));
    }

    #[test]
    fn empty_line_is_empty_error() {
        assert!(matches!(parse("   "), Err(ParseError::Empty)));
    }

    #[test]
    fn raw_is_preserved_for_display() {
        let ui = parse("echo hi").unwrap();
        assert_eq!(ui.raw, "echo hi");
    }

    #[test]
    fn dollar_component_is_kept_verbatim_for_expansion() {
        let ui = parse("echo $HOME $?").unwrap();
        assert_eq!(ui.commands[0].components, vec!["echo", "$HOME", "$?"]);
    }
}
