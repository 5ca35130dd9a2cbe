//! Component H: environment-variable and (optionally) glob/tilde expansion
//! of a command's argv, shared by builtins and the job engine so both
//! expand `$`-components the same way (§9 resolved open question).

use crate::shell::Shell;

/// Expand every component of `argv` (program name at index 0 is left
/// untouched) according to SPEC_FULL.md §4.B/§4.H:
///
/// - A component whose first character is `$` is replaced wholesale:
///   `$?` becomes the last exit code, `$NAME` becomes the environment
///   variable's value or the empty string.
/// - With the `glob-expand` feature, a component containing `*` or starting
///   with `~` is passed through glob-with-tilde-expand; a pattern with no
///   matches is a hard error (the caller aborts the job).
pub fn expand_words(shell: &Shell, argv: &[String]) -> Result<Vec<String>, ExpandError> {
    let mut out = Vec::with_capacity(argv.len());
    for (i, raw) in argv.iter().enumerate() {
        if i == 0 {
            out.push(raw.clone());
            continue;
        }

        let expanded = expand_variable(shell, raw);
        out.extend(expand_glob_tilde(&expanded)?);
    }
    Ok(out)
}

fn expand_variable(shell: &Shell, component: &str) -> String {
    if !component.starts_with('$') {
        return component.to_string();
    }

    let name = &component[1..];
    if name == "?" {
        return shell.last_exit_code().to_string();
    }

    std::env::var(name).unwrap_or_default()
}

/// Resolves a leading `~` or `~/...` against `$HOME`, independent of the
/// `glob-expand` feature — `cd`'s own tilde handling (§4.C) isn't gated on
/// it the way general argument glob expansion is.
pub fn expand_tilde(component: &str) -> String {
    if component == "~" {
        return dirs::home_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| component.to_string());
    }
    if let Some(rest) = component.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    component.to_string()
}

/// Expands a single free-standing path argument (`$`-variable then
/// tilde), for builtins like `cd` that take one path and never glob it.
pub fn expand_path_argument(shell: &Shell, raw: &str) -> String {
    expand_tilde(&expand_variable(shell, raw))
}

#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    #[error("no match: {0}")]
    NoGlobMatch(String),
}

#[cfg(feature = "glob-expand")]
fn expand_glob_tilde(component: &str) -> Result<Vec<String>, ExpandError> {
    let tilde_expanded = expand_tilde(component);

    if !tilde_expanded.contains('*') {
        return Ok(vec![tilde_expanded]);
    }

    let matches: Vec<String> = glob::glob(&tilde_expanded)
        .map_err(|_| ExpandError::NoGlobMatch(tilde_expanded.clone()))?
        .filter_map(|entry| entry.ok())
        .map(|path| path.to_string_lossy().into_owned())
        .collect();

    if matches.is_empty() {
        return Err(ExpandError::NoGlobMatch(tilde_expanded));
    }

    Ok(matches)
}

#[cfg(not(feature = "glob-expand"))]
fn expand_glob_tilde(component: &str) -> Result<Vec<String>, ExpandError> {
    Ok(vec![component.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_question_expands_to_last_exit_code() {
        let mut shell = Shell::new_noninteractive();
        shell.set_last_exit_code(42);
        assert_eq!(expand_variable(&shell, "$?"), "42");
    }

    #[test]
    fn dollar_name_expands_env_var() {
        let shell = Shell::new_noninteractive();
        std::env::set_var("SMASH_TEST_EXPAND_VAR", "value");
        assert_eq!(expand_variable(&shell, "$SMASH_TEST_EXPAND_VAR"), "value");
        std::env::remove_var("SMASH_TEST_EXPAND_VAR");
    }

    #[test]
    fn dollar_unset_name_expands_to_empty() {
        let shell = Shell::new_noninteractive();
        assert_eq!(expand_variable(&shell, "$SMASH_DEFINITELY_NOT_SET"), "");
    }

    #[test]
    fn non_dollar_component_is_unchanged() {
        let shell = Shell::new_noninteractive();
        assert_eq!(expand_variable(&shell, "hello"), "hello");
    }

    #[test]
    fn bare_tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~"), home.to_string_lossy());
        }
    }

    #[test]
    fn tilde_slash_expands_relative_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_path_argument(&Shell::new_noninteractive(), "~/docs"),
                home.join("docs").to_string_lossy()
            );
        }
    }

    #[test]
    fn program_name_is_never_expanded() {
        let mut shell = Shell::new_noninteractive();
        shell.set_last_exit_code(7);
        let argv = vec!["$?".to_string(), "$?".to_string()];
        let out = expand_words(&shell, &argv).unwrap();
        assert_eq!(out, vec!["$?".to_string(), "7".to_string()]);
    }
}
