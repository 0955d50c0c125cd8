//! Version queries sent to sites.

use parcel_core::{Constraint, Op, Version};
use std::fmt;

use crate::SiteResult;

/// An identifier plus the constraint its version must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: String,
    pub constraint: Constraint,
}

impl Query {
    pub fn new(id: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            id: id.into(),
            constraint,
        }
    }

    /// Build a query from an operator and a target version string
    pub fn parse(id: impl Into<String>, op: Op, target: &str) -> SiteResult<Self> {
        Ok(Self::new(id, Constraint::new(op, target)?))
    }

    /// Check a candidate version directory or index key
    pub fn matches_version(&self, candidate: &str) -> bool {
        self.constraint.matches_str(candidate)
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        self.constraint.matches(candidate)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.constraint)
    }
}
