//! PEP 440 version parsing and comparison.
//!
//! Versions are ordered by:
//! - epoch (`1!2.0` sorts after every version without an epoch)
//! - release segments, compared numerically with trailing zeros ignored
//! - pre-release phase: `.devN` alone < `aN` < `bN` < `rcN` < final release
//! - post-release: no post < `.postN`
//! - dev-release within the same phase: `.devN` < none
//! - local label: none < any label; numeric segments sort after text segments

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A parsed PEP 440 version. Display keeps the original text.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

/// Pre-release phase, ordered alpha < beta < release candidate.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
enum LocalSegment {
    Text(String),
    Number(u64),
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
enum DevKey {
    Dev(u64),
    Release,
}

impl Version {
    pub fn parse(version: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidVersion {
            version: version.to_string(),
        };
        let trimmed = version.trim();
        let lower = trimmed.to_ascii_lowercase();
        let body = lower.strip_prefix('v').unwrap_or(&lower);
        let mut c = Cursor::new(body);

        let first = c.digits().ok_or_else(invalid)?;
        let (epoch, mut release) = if c.eat(b'!') {
            (first, vec![c.digits().ok_or_else(invalid)?])
        } else {
            (0, vec![first])
        };
        while c.peek() == Some(b'.') && c.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            c.bump();
            release.push(c.digits().ok_or_else(invalid)?);
        }

        let pre = c.attempt(|c| {
            c.eat_separator();
            let kind = match c.word(&["alpha", "beta", "preview", "pre", "rc", "a", "b", "c"])? {
                "alpha" | "a" => PreKind::Alpha,
                "beta" | "b" => PreKind::Beta,
                _ => PreKind::Rc,
            };
            c.eat_separator();
            Some((kind, c.digits().unwrap_or(0)))
        });

        let post = c
            .attempt(|c| {
                if c.eat(b'-') {
                    c.digits()
                } else {
                    None
                }
            })
            .or_else(|| {
                c.attempt(|c| {
                    c.eat_separator();
                    c.word(&["post", "rev", "r"])?;
                    c.eat_separator();
                    Some(c.digits().unwrap_or(0))
                })
            });

        let dev = c.attempt(|c| {
            c.eat_separator();
            c.word(&["dev"])?;
            c.eat_separator();
            Some(c.digits().unwrap_or(0))
        });

        let mut local = Vec::new();
        if c.eat(b'+') {
            let rest = c.rest();
            for part in rest.split(['.', '-', '_']) {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return Err(invalid());
                }
                local.push(match part.parse::<u64>() {
                    Ok(n) => LocalSegment::Number(n),
                    Err(_) => LocalSegment::Text(part.to_string()),
                });
            }
            c.finish();
        }

        if !c.is_done() {
            return Err(invalid());
        }

        Ok(Self {
            original: trimmed.to_string(),
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Release segments as written (`1.0` gives `[1, 0]`).
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreKind, u64)> {
        self.pre
    }

    /// True for alpha, beta, release-candidate and dev releases.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The public version with any `+local` label removed.
    pub fn without_local(&self) -> Version {
        if self.local.is_empty() {
            return self.clone();
        }
        let original = match self.original.find('+') {
            Some(idx) => self.original[..idx].to_string(),
            None => self.original.clone(),
        };
        Version {
            original,
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// True when both versions share epoch and (zero-padded) release segments.
    pub fn same_release(&self, other: &Version) -> bool {
        self.epoch == other.epoch && self.trimmed_release() == other.trimmed_release()
    }

    fn trimmed_release(&self) -> &[u64] {
        let mut end = self.release.len();
        while end > 0 && self.release[end - 1] == 0 {
            end -= 1;
        }
        &self.release[..end]
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
            _ => PreKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Release,
        }
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte cursor over a lowercased version string.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self) -> bool {
        matches!(self.peek(), Some(b'.' | b'-' | b'_')) && {
            self.bump();
            true
        }
    }

    fn digits(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        self.src[start..self.pos].parse().ok()
    }

    /// Match the first word of `words` found at the cursor. Longer words
    /// must come before their prefixes.
    fn word(&mut self, words: &[&'static str]) -> Option<&'static str> {
        let rest = &self.src[self.pos..];
        let found = words.iter().copied().find(|w| rest.starts_with(w))?;
        self.pos += found.len();
        Some(found)
    }

    /// Run `f`, rewinding the cursor if it returns `None`.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let start = self.pos;
        let result = f(self);
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn finish(&mut self) {
        self.pos = self.src.len();
    }

    fn is_done(&self) -> bool {
        self.pos == self.src.len()
    }
}
