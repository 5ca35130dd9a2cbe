//! Component A: read one trimmed, comment-stripped line from a file
//! descriptor at a time, or report EOF.

use std::io::{self, BufRead};

pub enum ReadOutcome {
    Line(String),
    Eof,
}

pub struct LineReader<R> {
    inner: io::BufReader<R>,
}

impl<R: io::Read> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader {
            inner: io::BufReader::new(inner),
        }
    }

    /// Reads one newline-terminated line, strips the trailing newline,
    /// truncates at the first `#` (comment), and trims surrounding
    /// whitespace. Returns `Eof` once the underlying reader is exhausted.
    pub fn read_line(&mut self) -> io::Result<ReadOutcome> {
        let mut buf = String::new();
        let n = self.inner.read_line(&mut buf)?;
        if n == 0 {
            return Ok(ReadOutcome::Eof);
        }

        if let Some(idx) = buf.find('\n') {
            buf.truncate(idx);
        }
        if let Some(idx) = buf.find('#') {
            buf.truncate(idx);
        }

        Ok(ReadOutcome::Line(buf.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_newline_and_trims() {
        let mut r = LineReader::new("  echo hi  \n".as_bytes());
        match r.read_line().unwrap() {
            ReadOutcome::Line(s) => assert_eq!(s, "echo hi"),
            ReadOutcome::Eof => panic!("expected a line"),
        }
    }

    #[test]
    fn truncates_at_comment() {
        let mut r = LineReader::new("echo hi # a comment\n".as_bytes());
        match r.read_line().unwrap() {
            ReadOutcome::Line(s) => assert_eq!(s, "echo hi"),
            ReadOutcome::Eof => panic!("expected a line"),
        }
    }

    #[test]
    fn reports_eof() {
        let mut r = LineReader::new("".as_bytes());
        assert!(matches!(r.read_line().unwrap(), ReadOutcome::Eof));
    }

    #[test]
    fn comment_only_line_is_empty_after_strip() {
        let mut r = LineReader::new("# just a comment\n".as_bytes());
        match r.read_line().unwrap() {
            ReadOutcome::Line(s) => assert_eq!(s, ""),
            ReadOutcome::Eof => panic!("expected a line"),
        }
    }

    #[test]
    fn reads_multiple_lines_in_sequence() {
        let mut r = LineReader::new("one\ntwo\n".as_bytes());
        match r.read_line().unwrap() {
            ReadOutcome::Line(s) => assert_eq!(s, "one"),
            ReadOutcome::Eof => panic!(),
        }
        match r.read_line().unwrap() {
            ReadOutcome::Line(s) => assert_eq!(s, "two"),
            ReadOutcome::Eof => panic!(),
        }
        assert!(matches!(r.read_line().unwrap(), ReadOutcome::Eof));
    }
}
