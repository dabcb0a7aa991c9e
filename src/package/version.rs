//! Semantic version ranges.
//!
//! Versions themselves are [`semver::Version`]. Ranges are parsed here because
//! package metadata uses the npm-like syntax (`>=1.2.0 <2.0.0`, `^1.0`, `1.x`,
//! `a || b`) rather than the comma-separated syntax of [`semver::VersionReq`].

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A range expression that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid version range '{range}': {reason}")]
pub struct RangeError {
    pub range: String,
    pub reason: String,
}

/// Compare two versions by semver precedence (build metadata is ignored).
pub fn compare_precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Parse a possibly partial version such as `1.4` or `v2` by padding the
/// missing components with zeros.
pub fn parse_lenient(text: &str) -> Option<Version> {
    let partial = Partial::parse(text.trim()).ok()?;
    partial.major?;
    Some(partial.floor())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    op: Op,
    version: Version,
}

impl Bound {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, version: &Version) -> bool {
        let ord = compare_precedence(version, &self.version);
        match self.op {
            Op::Exact => ord == Ordering::Equal,
            Op::Greater => ord == Ordering::Greater,
            Op::GreaterEq => ord != Ordering::Less,
            Op::Less => ord == Ordering::Less,
            Op::LessEq => ord != Ordering::Greater,
        }
    }

    /// A pre-release only matches when some bound names a pre-release of the
    /// same major.minor.patch.
    fn admits_prerelease_of(&self, version: &Version) -> bool {
        !self.version.pre.is_empty()
            && self.version.major == version.major
            && self.version.minor == version.minor
            && self.version.patch == version.patch
    }
}

/// A set of alternatives (`||`), each a conjunction of bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    source: String,
    alternatives: Vec<Vec<Bound>>,
}

impl VersionRange {
    /// The range that accepts every release version.
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            alternatives: vec![Vec::new()],
        }
    }

    pub fn parse(text: &str) -> Result<Self, RangeError> {
        let source = text.trim();
        let to_error = |reason: String| RangeError {
            range: text.to_string(),
            reason,
        };

        let mut alternatives = Vec::new();
        for alternative in source.split("||") {
            alternatives.push(parse_alternative(alternative).map_err(to_error)?);
        }

        Ok(Self {
            source: if source.is_empty() { "*" } else { source }.to_string(),
            alternatives,
        })
    }

    /// The expression as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|bounds| {
            if !version.pre.is_empty() && !bounds.iter().any(|b| b.admits_prerelease_of(version))
            {
                return false;
            }
            bounds.iter().all(|b| b.matches(version))
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        VersionRange::parse(&text).map_err(serde::de::Error::custom)
    }
}

const OPERATORS: [&str; 8] = [">=", "<=", "==", ">", "<", "=", "^", "~"];

fn parse_alternative(text: &str) -> Result<Vec<Bound>, String> {
    let mut bounds = Vec::new();
    let mut tokens = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());

    while let Some(token) = tokens.next() {
        // Allow "  >= 1.2.0" with a space after the operator.
        let token = if OPERATORS.contains(&token) {
            match tokens.next() {
                Some(next) => format!("{}{}", token, next),
                None => return Err(format!("operator '{}' has no version", token)),
            }
        } else {
            token.to_string()
        };
        bounds.extend(parse_comparator(&token)?);
    }
    Ok(bounds)
}

fn parse_comparator(token: &str) -> Result<Vec<Bound>, String> {
    let (prefix, rest) = OPERATORS
        .iter()
        .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", token));
    Partial::parse(rest)?.expand(prefix)
}

/// A version with optional (wildcard) minor and patch components.
#[derive(Debug)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(text: &str) -> Result<Self, String> {
        let text = text.strip_prefix('v').unwrap_or(text);
        let text = text.split('+').next().unwrap_or(text);
        let (core, pre) = match text.split_once('-') {
            Some((core, pre)) => (
                core,
                Prerelease::new(pre).map_err(|e| format!("bad pre-release '{}': {}", pre, e))?,
            ),
            None => (text, Prerelease::EMPTY),
        };

        let mut parts = core.split('.');
        let major = parse_part(parts.next())?;
        let minor = parse_part(parts.next())?;
        let patch = parse_part(parts.next())?;
        if parts.next().is_some() {
            return Err(format!("too many components in '{}'", text));
        }
        if (major.is_none() && minor.is_some()) || (minor.is_none() && patch.is_some()) {
            return Err(format!("wildcard followed by a number in '{}'", text));
        }
        if patch.is_none() && !pre.is_empty() {
            return Err(format!("pre-release on a partial version '{}'", text));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: BuildMetadata::EMPTY,
        }
    }

    /// The first version past the wildcarded components.
    fn bump(&self) -> Result<Version, String> {
        let major = self.major.unwrap_or(0);
        Ok(match self.minor {
            Some(minor) => Version::new(major, successor(minor)?, 0),
            None => Version::new(successor(major)?, 0, 0),
        })
    }

    fn expand(&self, prefix: &str) -> Result<Vec<Bound>, String> {
        let Some(major) = self.major else {
            return Ok(Vec::new());
        };
        let full = self.patch.is_some();
        let floor = self.floor();

        Ok(match prefix {
            ">=" => vec![Bound::new(Op::GreaterEq, floor)],
            ">" if full => vec![Bound::new(Op::Greater, floor)],
            ">" => vec![Bound::new(Op::GreaterEq, self.bump()?)],
            "<" => vec![Bound::new(Op::Less, floor)],
            "<=" if full => vec![Bound::new(Op::LessEq, floor)],
            "<=" => vec![Bound::new(Op::Less, self.bump()?)],
            "^" => {
                let minor = self.minor.unwrap_or(0);
                let upper = if major > 0 || self.minor.is_none() {
                    Version::new(successor(major)?, 0, 0)
                } else if minor > 0 || self.patch.is_none() {
                    Version::new(0, successor(minor)?, 0)
                } else {
                    Version::new(0, 0, successor(self.patch.unwrap_or(0))?)
                };
                vec![
                    Bound::new(Op::GreaterEq, floor),
                    Bound::new(Op::Less, upper),
                ]
            }
            "~" => vec![
                Bound::new(Op::GreaterEq, floor),
                Bound::new(Op::Less, self.bump()?),
            ],
            _ if full => vec![Bound::new(Op::Exact, floor)],
            _ => vec![
                Bound::new(Op::GreaterEq, floor),
                Bound::new(Op::Less, self.bump()?),
            ],
        })
    }
}

fn successor(n: u64) -> Result<u64, String> {
    n.checked_add(1)
        .ok_or_else(|| format!("component {} is too large", n))
}

fn parse_part(part: Option<&str>) -> Result<Option<u64>, String> {
    match part {
        None | Some("x") | Some("X") | Some("*") => Ok(None),
        Some(p) => p
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("'{}' is not a number", p)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn range(text: &str) -> VersionRange {
        VersionRange::parse(text).unwrap()
    }

    #[test]
    fn test_precedence_ordering() {
        let ordered = ["1.0.0-alpha", "1.0.0", "1.0.1", "1.1.0", "2.0.0"];
        for pair in ordered.windows(2) {
            assert_eq!(
                compare_precedence(&v(pair[0]), &v(pair[1])),
                Ordering::Less,
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_precedence_ignores_build_metadata() {
        assert_eq!(
            compare_precedence(&v("1.2.3+abc"), &v("1.2.3+def")),
            Ordering::Equal
        );
        assert!(range("1.2.3").matches(&v("1.2.3+build.5")));
    }

    #[test]
    fn test_exact_match() {
        let r = range("1.2.3");
        assert!(r.matches(&v("1.2.3")));
        assert!(!r.matches(&v("1.2.4")));
        assert!(range("=1.2.3").matches(&v("1.2.3")));
        assert!(range("==1.2.3").matches(&v("1.2.3")));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(range(">=1.2.0").matches(&v("1.2.0")));
        assert!(range(">=1.2.0").matches(&v("3.0.0")));
        assert!(!range(">=1.2.0").matches(&v("1.1.9")));

        assert!(range(">1.2.0").matches(&v("1.2.1")));
        assert!(!range(">1.2.0").matches(&v("1.2.0")));

        assert!(range("<=1.2.0").matches(&v("1.2.0")));
        assert!(!range("<=1.2.0").matches(&v("1.2.1")));

        assert!(range("<1.2.0").matches(&v("1.1.99")));
        assert!(!range("<1.2.0").matches(&v("1.2.0")));
    }

    #[test]
    fn test_conjunction() {
        let r = range(">=1.2.0 <2.0.0");
        assert!(r.matches(&v("1.2.0")));
        assert!(r.matches(&v("1.9.9")));
        assert!(!r.matches(&v("2.0.0")));
        assert!(!r.matches(&v("1.1.0")));

        let comma = range(">=1.2.0, <2.0.0");
        assert!(comma.matches(&v("1.5.0")));
        assert!(!comma.matches(&v("2.1.0")));

        let spaced = range(">= 1.2.0 < 2.0.0");
        assert!(spaced.matches(&v("1.5.0")));
        assert!(!spaced.matches(&v("2.0.0")));
    }

    #[test]
    fn test_caret_and_tilde() {
        assert!(range("^1.2.3").matches(&v("1.9.0")));
        assert!(!range("^1.2.3").matches(&v("2.0.0")));
        assert!(!range("^1.2.3").matches(&v("1.2.2")));

        assert!(range("^0.2.3").matches(&v("0.2.9")));
        assert!(!range("^0.2.3").matches(&v("0.3.0")));
        assert!(range("^0.0.3").matches(&v("0.0.3")));
        assert!(!range("^0.0.3").matches(&v("0.0.4")));

        assert!(range("~1.2.3").matches(&v("1.2.9")));
        assert!(!range("~1.2.3").matches(&v("1.3.0")));
        assert!(range("~1").matches(&v("1.9.0")));
    }

    #[test]
    fn test_wildcards_and_partials() {
        assert!(range("*").matches(&v("0.0.1")));
        assert!(range("").matches(&v("42.0.0")));
        assert!(range("1.x").matches(&v("1.4.0")));
        assert!(!range("1.x").matches(&v("2.0.0")));
        assert!(range("1.2").matches(&v("1.2.7")));
        assert!(!range("1.2").matches(&v("1.3.0")));
        assert!(range(">=1.2").matches(&v("1.2.0")));
        assert!(range(">1.2").matches(&v("1.3.0")));
        assert!(!range(">1.2").matches(&v("1.2.5")));
        assert!(range("<=1.2").matches(&v("1.2.5")));
        assert!(!range("<=1.2").matches(&v("1.3.0")));
    }

    #[test]
    fn test_alternatives() {
        let r = range("^1.0.0 || >=3.0.0");
        assert!(r.matches(&v("1.5.0")));
        assert!(r.matches(&v("3.1.0")));
        assert!(!r.matches(&v("2.0.0")));
    }

    #[test]
    fn test_prerelease_requires_explicit_bound() {
        assert!(!range(">=1.0.0").matches(&v("2.0.0-beta")));
        assert!(!range("<2.0.0").matches(&v("2.0.0-beta")));
        assert!(range(">=2.0.0-alpha").matches(&v("2.0.0-beta")));
        assert!(range("1.0.0-alpha").matches(&v("1.0.0-alpha")));
        assert!(!range(">=2.0.0-alpha").matches(&v("2.1.0-beta")));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(VersionRange::parse(">=").is_err());
        assert!(VersionRange::parse("abc").is_err());
        assert!(VersionRange::parse("1.2.3.4").is_err());
        assert!(VersionRange::parse("x.2").is_err());

        let err = VersionRange::parse(">=one").unwrap_err();
        assert_eq!(err.range, ">=one");
    }

    #[test]
    fn test_upper_bound_past_u64_is_an_error() {
        let max = u64::MAX;
        for text in [
            format!("^{max}.0.0"),
            format!("~1.{max}"),
            format!("1.{max}"),
            format!("{max}.x"),
            format!(">1.{max}"),
            format!("^0.0.{max}"),
        ] {
            let err = VersionRange::parse(&text).unwrap_err();
            assert!(err.reason.contains("too large"), "{text}: {err}");
        }

        // Bounds that need no successor are fine
        assert!(range(&format!(">={max}.0.0")).matches(&Version::new(max, 0, 0)));
        assert!(range(&format!("{max}.{max}.{max}")).matches(&Version::new(max, max, max)));
    }

    #[test]
    fn test_display_keeps_source() {
        assert_eq!(range(">=1.2.0 <2.0.0").to_string(), ">=1.2.0 <2.0.0");
        assert_eq!(range("  ").to_string(), "*");
        assert_eq!(VersionRange::any().to_string(), "*");
    }

    #[test]
    fn test_serde_as_string() {
        let r = range("^1.2.0");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#""^1.2.0""#);
        let back: VersionRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert!(serde_json::from_str::<VersionRange>(r#""nope""#).is_err());
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("1.4"), Some(v("1.4.0")));
        assert_eq!(parse_lenient("v2"), Some(v("2.0.0")));
        assert_eq!(parse_lenient("1.4.2"), Some(v("1.4.2")));
        assert_eq!(parse_lenient("*"), None);
        assert_eq!(parse_lenient("garbage"), None);
    }
}
