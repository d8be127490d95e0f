//! pip requirements-file parsing.
//!
//! Supports one requirement per line, `#` comments, `\` line continuations,
//! `-r/--requirement` includes and `-c/--constraint` includes. Paths in
//! includes are relative to the including file. Other pip options are
//! skipped with a warning.

use std::path::{Path, PathBuf};

use pinset_util::fs::relative_to_file;

use crate::error::ParseError;
use crate::requirement::Requirement;

/// Requirements and constraints collected from a file and its includes,
/// in the order they were read.
#[derive(Debug, Default)]
pub struct RequirementsFile {
    pub requirements: Vec<Requirement>,
    pub constraints: Vec<Requirement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Requirement,
    Constraint,
}

impl RequirementsFile {
    /// Read a requirements file (`-r`).
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let mut reader = Reader::default();
        reader.read_file(path, EntryKind::Requirement)?;
        Ok(reader.out)
    }

    /// Read a constraints file (`-c`); every entry, including entries of
    /// nested `-r` files, becomes a constraint.
    pub fn constraints_from_path(path: &Path) -> Result<Self, ParseError> {
        let mut reader = Reader::default();
        reader.read_file(path, EntryKind::Constraint)?;
        Ok(reader.out)
    }

    /// Parse requirements-file content; includes resolve relative to `origin`.
    pub fn parse_str(content: &str, origin: &Path) -> Result<Self, ParseError> {
        let mut reader = Reader::default();
        reader.read_str(content, origin, EntryKind::Requirement)?;
        Ok(reader.out)
    }

    pub fn extend(&mut self, other: RequirementsFile) {
        self.requirements.extend(other.requirements);
        self.constraints.extend(other.constraints);
    }
}

#[derive(Default)]
struct Reader {
    stack: Vec<PathBuf>,
    out: RequirementsFile,
}

impl Reader {
    fn read_file(&mut self, path: &Path, kind: EntryKind) -> Result<(), ParseError> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.stack.contains(&key) {
            return Err(ParseError::IncludeCycle {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("reading {}", path.display());
        self.stack.push(key);
        let result = self.read_str(&content, path, kind);
        self.stack.pop();
        result
    }

    fn read_str(&mut self, content: &str, origin: &Path, kind: EntryKind) -> Result<(), ParseError> {
        for (line_no, line) in logical_lines(content) {
            let at = |source: ParseError| ParseError::AtLine {
                path: origin.to_path_buf(),
                line: line_no,
                source: Box::new(source),
            };
            match classify(&line).map_err(at)? {
                Line::Blank => {}
                Line::Include(target) => self.read_file(&relative_to_file(origin, target), kind)?,
                Line::Constraint(target) => {
                    self.read_file(&relative_to_file(origin, target), EntryKind::Constraint)?
                }
                Line::Option(option) => {
                    tracing::warn!(
                        "{}:{line_no}: ignoring unsupported option {option}",
                        origin.display()
                    );
                }
                Line::Requirement(text) => {
                    let req = Requirement::parse(text).map_err(at)?;
                    match kind {
                        EntryKind::Requirement => self.out.requirements.push(req),
                        EntryKind::Constraint => self.out.constraints.push(req),
                    }
                }
            }
        }
        Ok(())
    }
}

enum Line<'a> {
    Blank,
    Include(&'a str),
    Constraint(&'a str),
    Option(&'a str),
    Requirement(&'a str),
}

fn classify(line: &str) -> Result<Line<'_>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Blank);
    }
    if !line.starts_with('-') {
        return Ok(Line::Requirement(line));
    }

    let (option, value) = if let Some(long) = line.strip_prefix("--") {
        let end = long
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(long.len());
        let value = long[end..].trim_start_matches('=').trim();
        (&line[..end + 2], value)
    } else {
        let split = line.char_indices().nth(2).map_or(line.len(), |(i, _)| i);
        (&line[..split], line[split..].trim())
    };

    match option {
        "-r" | "--requirement" | "-c" | "--constraint" if value.is_empty() => {
            Err(ParseError::InvalidRequirement {
                requirement: line.to_string(),
                reason: format!("{option} needs a file path"),
            })
        }
        "-r" | "--requirement" => Ok(Line::Include(value)),
        "-c" | "--constraint" => Ok(Line::Constraint(value)),
        _ => Ok(Line::Option(option)),
    }
}

/// Join `\` continuations and strip comments, yielding 1-based line numbers
/// of the first physical line of each logical line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (idx, raw) in content.lines().enumerate() {
        let (start, mut joined) = pending.take().unwrap_or((idx + 1, String::new()));
        match raw.strip_suffix('\\') {
            Some(head) => {
                joined.push_str(head);
                pending = Some((start, joined));
            }
            None => {
                joined.push_str(raw);
                out.push((start, strip_comment(&joined).to_string()));
            }
        }
    }
    if let Some((start, joined)) = pending {
        out.push((start, strip_comment(&joined).to_string()));
    }
    out
}

/// Remove a `#` comment that starts the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return &line[..i];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_continuations() {
        let lines = logical_lines("# header\nfoo>=1.0 # trailing\nbar \\\n  [x]\nbaz#notacomment\n");
        let texts: Vec<&str> = lines.iter().map(|(_, l)| l.trim()).collect();
        assert_eq!(texts, ["", "foo>=1.0", "bar   [x]", "baz#notacomment"]);
        assert_eq!(lines[2].0, 3);
    }

    #[test]
    fn classifies_options() {
        assert!(matches!(classify("-r base.txt").unwrap(), Line::Include("base.txt")));
        assert!(matches!(classify("-rbase.txt").unwrap(), Line::Include("base.txt")));
        assert!(matches!(
            classify("--requirement=base.txt").unwrap(),
            Line::Include("base.txt")
        ));
        assert!(matches!(
            classify("--constraint pins.txt").unwrap(),
            Line::Constraint("pins.txt")
        ));
        assert!(matches!(
            classify("--index-url https://example.org").unwrap(),
            Line::Option("--index-url")
        ));
        assert!(matches!(classify("-e .").unwrap(), Line::Option("-e")));
        assert!(classify("-r").is_err());
    }

    #[test]
    fn parse_str_collects_requirements() {
        let file = RequirementsFile::parse_str("Flask\n\n# comment\nJinja2>=2.7\n", Path::new("reqs.txt"))
            .unwrap();
        let names: Vec<&str> = file.requirements.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Flask", "Jinja2"]);
        assert!(file.constraints.is_empty());
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let err = RequirementsFile::parse_str("Flask\nnot a requirement!\n", Path::new("reqs.txt"))
            .unwrap_err();
        match err {
            ParseError::AtLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
