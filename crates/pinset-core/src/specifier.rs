//! PEP 440 version specifiers (`>=1.0,<2`, `~=2.2`, `==1.4.*`).

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::version::Version;

/// Comparison operator of a single specifier clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Compatible,
    ArbitraryEqual,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Compatible => "~=",
            Operator::ArbitraryEqual => "===",
        }
    }

    /// Split a leading operator off `clause`. Longer operators are tried first.
    fn split(clause: &str) -> Option<(Operator, &str)> {
        const OPERATORS: [(&str, Operator); 8] = [
            ("===", Operator::ArbitraryEqual),
            ("==", Operator::Equal),
            ("!=", Operator::NotEqual),
            ("<=", Operator::LessEqual),
            (">=", Operator::GreaterEqual),
            ("~=", Operator::Compatible),
            ("<", Operator::Less),
            (">", Operator::Greater),
        ];
        OPERATORS
            .iter()
            .find_map(|(text, op)| clause.strip_prefix(*text).map(|rest| (*op, rest.trim())))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One clause such as `>=1.0` or `==2.*`.
#[derive(Debug, Clone)]
pub struct Specifier {
    op: Operator,
    /// Version text after the operator, without any `.*` suffix.
    text: String,
    /// Parsed version; `None` only for `===` against a non-PEP 440 string.
    version: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    pub fn parse(clause: &str) -> Result<Self, ParseError> {
        let clause = clause.trim();
        let invalid = |reason: &str| ParseError::InvalidSpecifier {
            specifier: clause.to_string(),
            reason: reason.to_string(),
        };
        let (op, rest) = Operator::split(clause).ok_or_else(|| invalid("missing operator"))?;
        if rest.is_empty() {
            return Err(invalid("missing version"));
        }

        if op == Operator::ArbitraryEqual {
            return Ok(Self {
                op,
                text: rest.to_string(),
                version: Version::parse(rest).ok(),
                wildcard: false,
            });
        }

        let (text, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (rest, false),
        };
        if wildcard && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(invalid("'.*' is only allowed with == and !="));
        }
        let version = Version::parse(text).map_err(|_| invalid("invalid version"))?;
        if op == Operator::Compatible && version.release().len() < 2 {
            return Err(invalid("~= needs at least two release segments"));
        }
        if version.has_local() && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(invalid("local versions are only allowed with == and !="));
        }

        Ok(Self {
            op,
            text: text.to_string(),
            version: Some(version),
            wildcard,
        })
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// True for `==X` (no wildcard) and `===X`: a clause naming one version.
    pub fn is_exact(&self) -> bool {
        matches!(self.op, Operator::Equal | Operator::ArbitraryEqual) && !self.wildcard
    }

    /// Whether `candidate` satisfies this clause, ignoring pre-release policy.
    pub fn contains(&self, candidate: &Version) -> bool {
        let Some(spec) = &self.version else {
            return self.text.eq_ignore_ascii_case(&candidate.to_string());
        };
        match self.op {
            Operator::ArbitraryEqual => self.text.eq_ignore_ascii_case(&candidate.to_string()),
            Operator::Equal => self.equals(spec, candidate),
            Operator::NotEqual => !self.equals(spec, candidate),
            Operator::LessEqual => candidate.without_local() <= *spec,
            Operator::GreaterEqual => candidate.without_local() >= *spec,
            Operator::Less => {
                let public = candidate.without_local();
                public < *spec
                    && !(!spec.is_prerelease()
                        && public.is_prerelease()
                        && public.same_release(spec))
            }
            Operator::Greater => {
                let public = candidate.without_local();
                public > *spec
                    && !(!spec.is_postrelease()
                        && public.is_postrelease()
                        && public.same_release(spec))
            }
            Operator::Compatible => {
                let prefix = &spec.release()[..spec.release().len() - 1];
                candidate.without_local() >= *spec && release_has_prefix(spec, prefix, candidate)
            }
        }
    }

    fn equals(&self, spec: &Version, candidate: &Version) -> bool {
        if self.wildcard {
            return release_has_prefix(spec, spec.release(), candidate);
        }
        if spec.has_local() {
            candidate == spec
        } else {
            candidate.without_local() == *spec
        }
    }
}

/// Zero-padded release prefix match used by `==X.*` and `~=`.
fn release_has_prefix(spec: &Version, prefix: &[u64], candidate: &Version) -> bool {
    if spec.epoch() != candidate.epoch() {
        return false;
    }
    let release = candidate.release();
    prefix
        .iter()
        .enumerate()
        .all(|(i, part)| release.get(i).copied().unwrap_or(0) == *part)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.text)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

/// Comma-separated specifier clauses; an empty set matches every version.
#[derive(Debug, Clone, Default)]
pub struct SpecifierSet {
    clauses: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn parse(spec: &str) -> Result<Self, ParseError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::default());
        }
        let clauses = spec
            .split(',')
            .map(Specifier::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clauses })
    }

    /// A set with the single clause `==version`.
    pub fn exact(version: &Version) -> Self {
        Self {
            clauses: vec![Specifier {
                op: Operator::Equal,
                text: version.to_string(),
                version: Some(version.clone()),
                wildcard: false,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Specifier] {
        &self.clauses
    }

    /// The version named by a single exact clause, if that is all this set says.
    pub fn as_exact(&self) -> Option<&Version> {
        match self.clauses.as_slice() {
            [only] if only.is_exact() => only.version(),
            _ => None,
        }
    }

    /// True when a clause explicitly names a pre-release, which opts the set
    /// into pre-release candidates.
    pub fn mentions_prerelease(&self) -> bool {
        self.clauses.iter().any(|c| {
            !matches!(c.op, Operator::NotEqual)
                && c.version.as_ref().is_some_and(Version::is_prerelease)
        })
    }

    /// Whether every clause admits `candidate`, ignoring pre-release policy.
    pub fn contains(&self, candidate: &Version) -> bool {
        self.clauses.iter().all(|c| c.contains(candidate))
    }

    /// Pick the highest candidate satisfying this set.
    ///
    /// Pre-releases are considered when `prereleases` is set or a clause names
    /// one; otherwise they are only used when no final release matches.
    pub fn best_match<'a, I>(&self, candidates: I, prereleases: bool) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let allow_pre = prereleases || self.mentions_prerelease();
        let mut best_final: Option<&Version> = None;
        let mut best_any: Option<&Version> = None;
        for candidate in candidates.into_iter().filter(|v| self.contains(v)) {
            if best_any.map_or(true, |b| candidate > b) {
                best_any = Some(candidate);
            }
            if !candidate.is_prerelease() && best_final.map_or(true, |b| candidate > b) {
                best_final = Some(candidate);
            }
        }
        if allow_pre {
            best_any
        } else {
            best_final.or(best_any)
        }
    }
}

impl FromStr for SpecifierSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecifierSet::parse(s)
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}
