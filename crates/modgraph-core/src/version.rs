//! Semantic version parsing and range matching.
//!
//! Versions follow SemVer 2.0 ordering (prereleases sort before their
//! release). Ranges are a single interval built from the intersection of
//! every term in the expression:
//! - exact and partial versions: `1.2.3`, `1.2.3-rc1`, `1`, `1.2`, `1.x`, `1.2.*`
//! - inequalities: `>1.2.3`, `>=1.2`, `<2`, `<=1.2.3-rc1`
//! - approximate: `~1`, `~1.2`, `~1.2.3`, `~1.2.3-pre`
//! - inclusive hyphen ranges: `1.0.0 - 1.3.9`
//! - intersections: `>=1.0.0 <2.0.0`
//!
//! A stable endpoint stops short of the prereleases of that release, so
//! `1.x` admits `1.4.0-rc1` but not `2.0.0-rc1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

pub use semver::Version;

/// Malformed version or range text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum VersionError {
    #[error("Invalid version {input:?}: {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Unparsable version range: {input:?}")]
    #[diagnostic(help("Use a version like `1.2.3`, `1.x`, `>=1.0.0 <2.0.0` or `~1.2`"))]
    InvalidRange { input: String },
}

/// Parse a version string, accepting an optional leading `v`.
pub fn parse_version(input: &str) -> Result<Version, VersionError> {
    let trimmed = input.trim();
    let text = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(text).map_err(|e| VersionError::InvalidVersion {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a range expression.
pub fn parse_range(input: &str) -> Result<VersionRange, VersionError> {
    VersionRange::parse(input)
}

/// A position on the version line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Point {
    /// Just below every release of this `major.minor.patch`, prereleases included.
    Floor(u64, u64, u64),
    /// An actual version.
    At(Version),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    point: Point,
    inclusive: bool,
}

impl Bound {
    fn floor(triple: (u64, u64, u64)) -> Self {
        Bound {
            point: Point::Floor(triple.0, triple.1, triple.2),
            inclusive: false,
        }
    }

    fn at(version: Version, inclusive: bool) -> Self {
        Bound {
            point: Point::At(version),
            inclusive,
        }
    }
}

/// A version range: every version between an optional lower and upper bound.
#[derive(Debug, Clone)]
pub struct VersionRange {
    source: String,
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower && self.upper == other.upper
    }
}

impl Eq for VersionRange {}

impl VersionRange {
    /// The range that admits every version.
    pub fn any() -> Self {
        VersionRange {
            source: ">= 0.0.0".to_string(),
            lower: None,
            upper: None,
        }
    }

    /// Exactly `version`.
    pub fn exact(version: &Version) -> Self {
        VersionRange {
            source: version.to_string(),
            lower: Some(Bound::at(version.clone(), true)),
            upper: Some(Bound::at(version.clone(), true)),
        }
    }

    /// `version` or anything newer.
    pub fn at_least(version: &Version) -> Self {
        let lower = if version.pre.is_empty() {
            Bound::floor(triple(version))
        } else {
            Bound::at(version.clone(), true)
        };
        VersionRange {
            source: format!(">={version}"),
            lower: Some(lower),
            upper: None,
        }
    }

    /// `version` or anything newer within the same major release line.
    pub fn same_major_at_least(version: &Version) -> Self {
        let next_major = (version.major + 1, 0, 0);
        VersionRange {
            source: format!(">={version} {}.x", version.major),
            upper: Some(Bound::floor(next_major)),
            ..Self::at_least(version)
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let err = || VersionError::InvalidRange {
            input: input.to_string(),
        };
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Ok(VersionRange {
                source: input.trim().to_string(),
                ..Self::any()
            });
        }

        let mut range = VersionRange {
            source: input.trim().to_string(),
            lower: None,
            upper: None,
        };
        for term in normalized.split_whitespace() {
            let (lower, upper) = parse_term(term).ok_or_else(err)?;
            range.lower = tighter_lower(range.lower.take(), lower);
            range.upper = tighter_upper(range.upper.take(), upper);
        }
        Ok(range)
    }

    /// Whether `version` lies inside this range.
    pub fn satisfies(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            match compare_to_point(version, &lower.point) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(ref upper) = self.upper {
            match compare_to_point(version, &upper.point) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// The single version this range pins, if it pins one.
    ///
    /// Both `=1.2.3-rc1` style pins and a plain `1.2.3` count; the latter
    /// still admits prereleases of `1.2.3` but names one release.
    pub fn is_exact(&self) -> Option<Version> {
        match (&self.lower, &self.upper) {
            (
                Some(Bound {
                    point: Point::At(lo),
                    inclusive: true,
                }),
                Some(Bound {
                    point: Point::At(hi),
                    inclusive: true,
                }),
            ) if lo == hi => Some(lo.clone()),
            (
                Some(Bound {
                    point: Point::Floor(a, b, c),
                    ..
                }),
                Some(Bound {
                    point: Point::Floor(x, y, z),
                    ..
                }),
            ) if (a, b) == (x, y) && c + 1 == *z => Some(Version::new(*a, *b, *c)),
            _ => None,
        }
    }

    /// Whether some version satisfies both ranges.
    pub fn intersects(&self, other: &VersionRange) -> bool {
        self.intersection(other).is_satisfiable()
    }

    /// The conjunction of two ranges.
    pub fn intersection(&self, other: &VersionRange) -> VersionRange {
        VersionRange {
            source: format!("{} {}", self.source, other.source),
            lower: tighter_lower(self.lower.clone(), other.lower.clone()),
            upper: tighter_upper(self.upper.clone(), other.upper.clone()),
        }
    }

    /// Whether any version at all lies inside this range.
    pub fn is_satisfiable(&self) -> bool {
        let (Some(lower), Some(upper)) = (&self.lower, &self.upper) else {
            return true;
        };
        match compare_points(&lower.point, &upper.point) {
            Ordering::Less => true,
            Ordering::Equal => lower.inclusive && upper.inclusive,
            Ordering::Greater => false,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn triple(v: &Version) -> (u64, u64, u64) {
    (v.major, v.minor, v.patch)
}

/// Compare a version against a point on the version line.
fn compare_to_point(version: &Version, point: &Point) -> Ordering {
    match point {
        Point::Floor(a, b, c) => {
            if triple(version) >= (*a, *b, *c) {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        Point::At(p) => version.cmp_precedence(p),
    }
}

fn compare_points(a: &Point, b: &Point) -> Ordering {
    match (a, b) {
        (Point::Floor(a0, a1, a2), Point::Floor(b0, b1, b2)) => (a0, a1, a2).cmp(&(b0, b1, b2)),
        (Point::At(v), p) => compare_to_point(v, p),
        (p, Point::At(v)) => compare_to_point(v, p).reverse(),
    }
}

fn tighter_lower(a: Option<Bound>, b: Option<Bound>) -> Option<Bound> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => match compare_points(&a.point, &b.point) {
            Ordering::Greater => Some(a),
            Ordering::Less => Some(b),
            Ordering::Equal => Some(if a.inclusive { b } else { a }),
        },
    }
}

fn tighter_upper(a: Option<Bound>, b: Option<Bound>) -> Option<Bound> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => match compare_points(&a.point, &b.point) {
            Ordering::Less => Some(a),
            Ordering::Greater => Some(b),
            Ordering::Equal => Some(if a.inclusive { b } else { a }),
        },
    }
}

/// Collapse whitespace after operators and mark hyphen ranges with `#`.
fn normalize(input: &str) -> String {
    let hyphenated = input.trim().replace(" - ", "#");
    let mut out = String::with_capacity(hyphenated.len());
    let mut after_operator = false;
    for ch in hyphenated.chars() {
        if after_operator && ch == ' ' {
            continue;
        }
        after_operator = matches!(ch, '>' | '<' | '=' | '~');
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Major,
    Minor,
    Patch,
}

/// A partial version such as `1`, `1.2.x` or `1.2.3-rc1`.
struct Loose {
    version: Version,
    /// `None` for prerelease versions, which name exactly one version.
    arity: Option<Arity>,
}

impl Loose {
    fn is_stable(&self) -> bool {
        self.arity.is_some()
    }

    /// The first release past this partial version.
    fn successor(&self) -> (u64, u64, u64) {
        let (major, minor, patch) = triple(&self.version);
        match self.arity {
            Some(Arity::Major) => (major + 1, 0, 0),
            Some(Arity::Minor) => (major, minor + 1, 0),
            Some(Arity::Patch) | None => (major, minor, patch + 1),
        }
    }

    fn start(&self) -> Bound {
        if self.is_stable() {
            Bound::floor(triple(&self.version))
        } else {
            Bound::at(self.version.clone(), true)
        }
    }

    fn finish(&self) -> Bound {
        if self.is_stable() {
            Bound::floor(self.successor())
        } else {
            Bound::at(self.version.clone(), true)
        }
    }
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

fn parse_loose(expr: &str) -> Option<Loose> {
    let expr = expr.strip_prefix('v').unwrap_or(expr);
    let number = |s: &str| s.parse::<u64>().ok();
    let parts: Vec<&str> = expr.splitn(3, '.').collect();

    match parts.as_slice() {
        [major] => Some(Loose {
            version: Version::new(number(major)?, 0, 0),
            arity: Some(Arity::Major),
        }),
        [major, minor] if is_wildcard(minor) => Some(Loose {
            version: Version::new(number(major)?, 0, 0),
            arity: Some(Arity::Major),
        }),
        [major, minor] => Some(Loose {
            version: Version::new(number(major)?, number(minor)?, 0),
            arity: Some(Arity::Minor),
        }),
        [major, minor, patch] if is_wildcard(minor) && is_wildcard(patch) => Some(Loose {
            version: Version::new(number(major)?, 0, 0),
            arity: Some(Arity::Major),
        }),
        [major, minor, patch] if is_wildcard(patch) => Some(Loose {
            version: Version::new(number(major)?, number(minor)?, 0),
            arity: Some(Arity::Minor),
        }),
        [_, _, _] => {
            let version = Version::parse(expr).ok()?;
            let arity = version.pre.is_empty().then_some(Arity::Patch);
            Some(Loose { version, arity })
        }
        _ => None,
    }
}

type Interval = (Option<Bound>, Option<Bound>);

fn parse_term(term: &str) -> Option<Interval> {
    if is_wildcard(term) {
        return Some((None, None));
    }
    if let Some((start, finish)) = term.split_once('#') {
        let start = parse_loose(start)?;
        let finish = parse_loose(finish)?;
        return Some((Some(start.start()), Some(finish.finish())));
    }
    if let Some(rest) = term.strip_prefix(">=") {
        let l = parse_loose(rest)?;
        return Some((Some(l.start()), None));
    }
    if let Some(rest) = term.strip_prefix("<=") {
        let l = parse_loose(rest)?;
        return Some((None, Some(l.finish())));
    }
    if let Some(rest) = term.strip_prefix('>') {
        let l = parse_loose(rest)?;
        let lower = if l.is_stable() {
            Bound::floor(l.successor())
        } else {
            Bound::at(l.version, false)
        };
        return Some((Some(lower), None));
    }
    if let Some(rest) = term.strip_prefix('<') {
        let l = parse_loose(rest)?;
        let upper = if l.is_stable() {
            Bound::floor(triple(&l.version))
        } else {
            Bound::at(l.version, false)
        };
        return Some((None, Some(upper)));
    }
    if let Some(rest) = term.strip_prefix('~') {
        let rest = rest.strip_prefix('>').unwrap_or(rest);
        let l = parse_loose(rest)?;
        let (major, minor, _) = triple(&l.version);
        let limit = match l.arity {
            Some(Arity::Major) => (major + 1, 0, 0),
            _ => (major, minor + 1, 0),
        };
        return Some((Some(l.start()), Some(Bound::floor(limit))));
    }
    let rest = term.strip_prefix('=').unwrap_or(term);
    let l = parse_loose(rest)?;
    Some((Some(l.start()), Some(l.finish())))
}
