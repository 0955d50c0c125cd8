//! Version constraints.
//!
//! A constraint pairs an operator with a target version, or with two
//! bounds for the range operator. Range bounds are both exclusive:
//! `1.0..2.0` matches `1.5` but neither `1.0` nor `2.0`.

use std::fmt;
use std::str::FromStr;

use super::Version;
use crate::error::{ParcelError, ParcelResult};

/// Comparison operator for a version constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Exact,     // =1.0.0
    Range,     // 1.0.0..2.0.0
}

impl Op {
    /// All operators, in the order they are tried when parsing a prefix
    pub const ALL: [Op; 6] = [
        Op::GreaterEq,
        Op::LessEq,
        Op::Greater,
        Op::Less,
        Op::Exact,
        Op::Range,
    ];

    /// Operator token as written on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Exact => "=",
            Op::Range => "..",
        }
    }
}

impl FromStr for Op {
    type Err = ParcelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Op::Greater),
            ">=" => Ok(Op::GreaterEq),
            "<" => Ok(Op::Less),
            "<=" => Ok(Op::LessEq),
            "=" | "==" => Ok(Op::Exact),
            ".." => Ok(Op::Range),
            other => Err(ParcelError::Format {
                input: other.to_string(),
                reason: "unknown operator, expected one of > >= < <= = ..".to_string(),
            }),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version constraint a candidate must satisfy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Single-bound comparison. `op` is never `Op::Range`; the constructors
    /// route ranges to [`Constraint::Range`].
    Compare { op: Op, version: Version },
    /// Exclusive range `low < candidate < high`
    Range { low: Version, high: Version },
}

impl Constraint {
    /// Build a constraint from an operator and a target string.
    ///
    /// For `Op::Range` the target holds two bounds separated by `,`, `:`
    /// or `-` (tried in that order).
    pub fn new(op: Op, target: &str) -> ParcelResult<Self> {
        match op {
            Op::Range => {
                let (low, high) = split_bounds(target)?;
                Ok(Self::range(low.parse()?, high.parse()?))
            }
            op => Ok(Self::Compare {
                op,
                version: target.parse()?,
            }),
        }
    }

    /// Build a single-bound comparison
    pub fn compare(op: Op, version: Version) -> ParcelResult<Self> {
        if op == Op::Range {
            return Err(ParcelError::Format {
                input: version.to_string(),
                reason: "the range operator needs two bounds".to_string(),
            });
        }
        Ok(Self::Compare { op, version })
    }

    /// Build an exclusive range
    pub fn range(low: Version, high: Version) -> Self {
        Self::Range { low, high }
    }

    /// Build a range from a two-element list of bounds
    pub fn range_from_bounds<S: AsRef<str>>(bounds: &[S]) -> ParcelResult<Self> {
        match bounds {
            [low, high] => Ok(Self::range(low.as_ref().parse()?, high.as_ref().parse()?)),
            _ => Err(ParcelError::Format {
                input: bounds
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(","),
                reason: format!("a range needs exactly two bounds, got {}", bounds.len()),
            }),
        }
    }

    pub fn op(&self) -> Op {
        match self {
            Constraint::Compare { op, .. } => *op,
            Constraint::Range { .. } => Op::Range,
        }
    }

    /// Check whether `candidate` satisfies this constraint
    pub fn matches(&self, candidate: &Version) -> bool {
        match self {
            Constraint::Compare { op, version } => match op {
                Op::Greater => candidate > version,
                Op::GreaterEq => candidate >= version,
                Op::Less => candidate < version,
                Op::LessEq => candidate <= version,
                Op::Exact => candidate == version,
                Op::Range => false,
            },
            Constraint::Range { low, high } => low < candidate && candidate < high,
        }
    }

    /// Check a candidate given as a string; unparseable candidates never match
    pub fn matches_str(&self, candidate: &str) -> bool {
        candidate
            .parse::<Version>()
            .map(|version| self.matches(&version))
            .unwrap_or(false)
    }
}

impl Default for Constraint {
    /// Anything newer than `0.0.0`
    fn default() -> Self {
        Self::Compare {
            op: Op::Greater,
            version: Version::new(0, "0", "0"),
        }
    }
}

fn split_bounds(target: &str) -> ParcelResult<(&str, &str)> {
    [',', ':', '-']
        .iter()
        .find_map(|sep| target.split_once(*sep))
        .map(|(low, high)| (low.trim(), high.trim()))
        .ok_or_else(|| ParcelError::Format {
            input: target.to_string(),
            reason: "a range needs two bounds separated by ',', ':' or '-'".to_string(),
        })
}

impl FromStr for Constraint {
    type Err = ParcelError;

    /// Parse `>=1.0`, `<2.0`, `=1.2.3`, `1.0..2.0` or a bare version (exact)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        if let Some((low, high)) = input.split_once("..") {
            return Ok(Self::range(low.trim().parse()?, high.trim().parse()?));
        }

        for op in [Op::GreaterEq, Op::LessEq, Op::Greater, Op::Less] {
            if let Some(rest) = input.strip_prefix(op.as_str()) {
                return Self::new(op, rest);
            }
        }

        let exact = input.trim_start_matches("==").trim_start_matches('=');
        Self::new(Op::Exact, exact)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Compare { op, version } => write!(f, "{}{}", op, version),
            Constraint::Range { low, high } => write!(f, "{}..{}", low, high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_op_parsing() {
        assert_eq!(">=".parse::<Op>().unwrap(), Op::GreaterEq);
        assert_eq!("==".parse::<Op>().unwrap(), Op::Exact);
        assert_eq!("..".parse::<Op>().unwrap(), Op::Range);
        assert!("~".parse::<Op>().is_err());

        for op in Op::ALL {
            assert_eq!(op.as_str().parse::<Op>().unwrap(), op);
        }
    }

    #[test]
    fn test_constraint_operators() {
        let target = "1.2.0";
        let gt = Constraint::new(Op::Greater, target).unwrap();
        assert!(!gt.matches(&v("1.2.0")));
        assert!(gt.matches(&v("1.2.0sp1")));

        let ge = Constraint::new(Op::GreaterEq, target).unwrap();
        assert!(ge.matches(&v("1.2.0")));
        assert!(!ge.matches(&v("1.1.9")));

        let lt = Constraint::new(Op::Less, target).unwrap();
        assert!(lt.matches(&v("1.1.99")));
        assert!(!lt.matches(&v("1.2.0")));

        let le = Constraint::new(Op::LessEq, target).unwrap();
        assert!(le.matches(&v("1.2")));
        assert!(!le.matches(&v("1.2.1")));

        let eq = Constraint::new(Op::Exact, target).unwrap();
        assert!(eq.matches(&v("1.2.0")));
        assert!(!eq.matches(&v("1.3.0")));
    }

    #[test]
    fn test_range_bounds_are_exclusive() {
        // Both ends of a range are deliberately exclusive.
        let range = Constraint::new(Op::Range, "1.0.0,2.0.0").unwrap();
        assert!(range.matches(&v("1.5.0")));
        assert!(range.matches(&v("1.0.0sp1")));
        assert!(!range.matches(&v("1.0.0")));
        assert!(!range.matches(&v("2.0.0")));
        assert!(!range.matches(&v("2.0.1")));
    }

    #[test]
    fn test_range_separators() {
        for target in ["1.0,2.0", "1.0:2.0", "1.0-2.0", " 1.0 , 2.0 "] {
            let range = Constraint::new(Op::Range, target).unwrap();
            assert_eq!(range, Constraint::range(v("1.0"), v("2.0")), "target {target}");
        }

        let listed = Constraint::range_from_bounds(&["1.0", "2.0"]).unwrap();
        assert_eq!(listed, Constraint::range(v("1.0"), v("2.0")));

        assert!(Constraint::new(Op::Range, "1.0").is_err());
        assert!(Constraint::range_from_bounds(&["1.0"]).is_err());
    }

    #[test]
    fn test_compare_rejects_range_operator() {
        assert!(Constraint::compare(Op::Range, v("1.0")).is_err());
        assert_eq!(Constraint::compare(Op::Less, v("1.0")).unwrap().op(), Op::Less);
    }

    #[test]
    fn test_constraint_from_str() {
        assert_eq!(
            ">=1.0.0".parse::<Constraint>().unwrap(),
            Constraint::new(Op::GreaterEq, "1.0.0").unwrap()
        );
        assert_eq!("<2".parse::<Constraint>().unwrap().op(), Op::Less);
        assert_eq!("1.2.3".parse::<Constraint>().unwrap().op(), Op::Exact);
        assert_eq!("=1.2.3".parse::<Constraint>().unwrap().op(), Op::Exact);
        assert_eq!(
            "1.0..2.0".parse::<Constraint>().unwrap(),
            Constraint::range(v("1.0"), v("2.0"))
        );
    }

    #[test]
    fn test_constraint_display_round_trip() {
        for text in [">=1.0.0", ">1.2.3sp1", "<2.0.0", "<=3.1.4", "=1.0.0", "1.0.0..2.0.0"] {
            let constraint: Constraint = text.parse().unwrap();
            assert_eq!(constraint.to_string(), text);
        }
    }

    #[test]
    fn test_matches_str_skips_garbage() {
        let constraint = Constraint::default();
        assert!(constraint.matches_str("0.0.1"));
        assert!(!constraint.matches_str("0.0.0"));
        assert!(!constraint.matches_str("tmp"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn version_strategy() -> impl Strategy<Value = Version> {
        (0u64..10, 0u32..10, 0u32..10, "[a-z]{0,2}")
            .prop_map(|(major, minor, micro, tag)| {
                Version::new(major, minor.to_string(), format!("{micro}{tag}"))
            })
    }

    proptest! {
        #[test]
        fn greater_eq_is_reflexive(version in version_strategy()) {
            let constraint = Constraint::compare(Op::GreaterEq, version.clone()).unwrap();
            prop_assert!(constraint.matches(&version));
        }

        #[test]
        fn greater_is_monotonic(
            a in version_strategy(),
            b in version_strategy(),
            target in version_strategy(),
        ) {
            let constraint = Constraint::compare(Op::Greater, target).unwrap();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            if low < high && constraint.matches(&low) {
                prop_assert!(constraint.matches(&high));
            }
        }
    }
}
