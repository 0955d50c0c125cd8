//! Dotted version type with annotated segments.
//!
//! A version is `major.minor.micro[.qualifier]`. The major segment is an
//! integer; every other segment is a leading numeric run followed by an
//! optional annotation (`3sp1` is numeric `3`, annotation `sp1`).
//!
//! Segments compare numerically first, then by annotation, and a segment
//! without an annotation sorts before one with an annotation:
//!
//! - `1.1.0 > 1.0.0`
//! - `1.1.1sp1 > 1.1.1`
//! - `1.1.10 > 1.1.1alpha1`
//! - `1.1.10p1 > 1.1.10`

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::Constraint;
use crate::error::{ParcelError, ParcelResult};

/// Immutable dotted version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: String,
    micro: String,
    qualifier: Option<String>,
}

impl Version {
    /// Create a version from its three leading segments
    pub fn new(major: u64, minor: impl Into<String>, micro: impl Into<String>) -> Self {
        Self {
            major,
            minor: minor.into(),
            micro: micro.into(),
            qualifier: None,
        }
    }

    /// Attach a qualifier segment
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Build a version from an ordered list of segments.
    ///
    /// Missing minor and micro segments default to `"0"`. Segments past the
    /// fourth are folded into the qualifier so rendering stays lossless.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> ParcelResult<Self> {
        let Some(first) = segments.first() else {
            return Err(ParcelError::Format {
                input: String::new(),
                reason: "version has no segments".to_string(),
            });
        };

        let major_str = first.as_ref().trim();
        let major = major_str.parse::<u64>().map_err(|_| ParcelError::Format {
            input: join_segments(segments),
            reason: format!("major segment '{major_str}' is not an integer"),
        })?;

        let segment = |index: usize| {
            segments
                .get(index)
                .map(|s| s.as_ref().trim().to_string())
                .unwrap_or_else(|| "0".to_string())
        };

        let qualifier = (segments.len() > 3).then(|| {
            segments[3..]
                .iter()
                .map(|s| s.as_ref().trim())
                .collect::<Vec<_>>()
                .join(".")
        });

        Ok(Self {
            major,
            minor: segment(1),
            micro: segment(2),
            qualifier,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> &str {
        &self.minor
    }

    pub fn micro(&self) -> &str {
        &self.micro
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Check whether this version satisfies `constraint`
    pub fn matches(&self, constraint: &Constraint) -> bool {
        constraint.matches(self)
    }

    fn pieces(&self) -> [Piece<'_>; 3] {
        [
            Piece::split(Some(&self.minor)),
            Piece::split(Some(&self.micro)),
            Piece::split(self.qualifier.as_deref()),
        ]
    }
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// A non-major segment split into its numeric run and annotation.
///
/// An absent segment behaves like `"0"`; an empty annotation is treated
/// as no annotation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece<'a> {
    numeric: &'a str,
    annotation: Option<&'a str>,
}

impl<'a> Piece<'a> {
    fn split(segment: Option<&'a str>) -> Self {
        let Some(segment) = segment else {
            return Self {
                numeric: "",
                annotation: None,
            };
        };

        let digits = segment
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(segment.len());
        let (numeric, annotation) = segment.split_at(digits);

        Self {
            numeric: numeric.trim_start_matches('0'),
            annotation: (!annotation.is_empty()).then_some(annotation),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        // Leading zeros are already stripped, so a longer run is a larger number.
        self.numeric
            .len()
            .cmp(&other.numeric.len())
            .then_with(|| self.numeric.cmp(other.numeric))
            .then_with(|| self.annotation.cmp(&other.annotation))
    }
}

impl FromStr for Version {
    type Err = ParcelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(ParcelError::Format {
                input: s.to_string(),
                reason: "version string is empty".to_string(),
            });
        }

        let segments: Vec<&str> = input.split('.').collect();
        Self::from_segments(&segments)
    }
}

impl TryFrom<String> for Version {
    type Error = ParcelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;

        if let Some(ref qualifier) = self.qualifier {
            write!(f, ".{}", qualifier)?;
        }

        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        for piece in self.pieces() {
            piece.numeric.hash(state);
            piece.annotation.hash(state);
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major.cmp(&other.major).then_with(|| {
            self.pieces()
                .iter()
                .zip(other.pieces().iter())
                .map(|(a, b)| a.compare(b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let version = v("1.3.3sp1");
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), "3");
        assert_eq!(version.micro(), "3sp1");
        assert_eq!(version.qualifier(), None);
        assert_eq!(version.to_string(), "1.3.3sp1");
    }

    #[test]
    fn test_missing_segments_default_to_zero() {
        let version = v("2");
        assert_eq!(version.minor(), "0");
        assert_eq!(version.micro(), "0");
        assert_eq!(version.to_string(), "2.0.0");
    }

    #[test]
    fn test_from_segments() {
        let version = Version::from_segments(&["1", "4", "2", "rc1"]).unwrap();
        assert_eq!(version.qualifier(), Some("rc1"));
        assert_eq!(version.to_string(), "1.4.2.rc1");

        let long = Version::from_segments(&["1", "2", "3", "4", "5"]).unwrap();
        assert_eq!(long.qualifier(), Some("4.5"));
        assert_eq!(v(&long.to_string()), long);
    }

    #[test]
    fn test_invalid_major() {
        assert!(matches!(
            "beta.1".parse::<Version>(),
            Err(ParcelError::Format { .. })
        ));
        assert!("".parse::<Version>().is_err());
        assert!(Version::from_segments::<&str>(&[]).is_err());
    }

    #[test]
    fn test_permissive_minor_segments() {
        let version = v("1.x.final");
        assert_eq!(version.minor(), "x");
        assert!(version > v("1.0.0"));
    }

    #[test]
    fn test_version_comparison() {
        assert!(v("1.0.0") < v("1.1.0"));
        assert!(v("1.1.0") < v("1.1.1"));
        assert!(v("1.1.1") < v("1.1.1sp1"));
        assert!(v("1.1.10") > v("1.1.1alpha1"));
        assert!(v("1.1.10p1") > v("1.1.10"));
        assert!(v("1.3.3") < v("1.3.3sp1"));
        assert!(v("1.4.0") > v("1.3.3sp1"));
        assert!(v("1.3.3p1") < v("1.4.0"));
    }

    #[test]
    fn test_qualifier_ordering() {
        assert!(v("1.0.0") < v("1.0.0.1"));
        assert!(v("1.0.0.2") < v("1.0.0.10"));
        assert_eq!(v("1.0.0"), v("1.0.0.0"));
    }

    #[test]
    fn test_numeric_runs_do_not_overflow() {
        let huge = v("1.0.123456789012345678901234567890");
        assert!(huge > v("1.0.99999999999999999999"));
        assert_eq!(v("1.007.0"), v("1.7.0"));
    }

    #[test]
    fn test_serde_as_string() {
        let version = v("1.2.3beta");
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"1.2.3beta\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);
    }
}
