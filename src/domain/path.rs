use std::fmt;

use crate::domain::error::MatchError;

/// Quantifier kind carried by a wildcard segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// `*`: every element must satisfy the remainder.
    All,
    /// `?`: at least one element must satisfy the remainder.
    One,
}

impl Quantifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "*",
            Self::One => "?",
        }
    }
}

/// One component of a dotted expectation path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Literal(String),
    Wildcard(Quantifier),
}

impl PathSegment {
    fn from_part(part: &str) -> Self {
        match part {
            "*" => Self::Wildcard(Quantifier::All),
            "?" => Self::Wildcard(Quantifier::One),
            other => Self::Literal(other.to_string()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(key) => formatter.write_str(key),
            Self::Wildcard(quantifier) => formatter.write_str(quantifier.as_str()),
        }
    }
}

/// Parsed dotted path (`items.?.id`) with its optional tag.
///
/// A `Path` is immutable once built. Sub-paths derived while recursing
/// through quantifiers are new values that inherit the `optional` flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<PathSegment>,
    optional: bool,
}

impl Path {
    /// Parses a required path.
    pub fn parse(raw: &str) -> Result<Self, MatchError> {
        Self::parse_with(raw, false)
    }

    /// Parses a path whose `null` branches count as a vacuous pass.
    pub fn parse_optional(raw: &str) -> Result<Self, MatchError> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, optional: bool) -> Result<Self, MatchError> {
        if raw.contains("..") {
            return Err(MatchError::InvalidPath {
                path: raw.to_string(),
            });
        }

        // Leading or trailing dots still yield empty literal keys here.
        let segments = raw.split('.').map(PathSegment::from_part).collect();
        Ok(Self { segments, optional })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Builds the path made of the segments after `index`, keeping the tag.
    pub fn sub_path(&self, index: usize) -> Self {
        let start = (index + 1).min(self.segments.len());
        Self {
            segments: self.segments[start..].to_vec(),
            optional: self.optional,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                formatter.write_str(".")?;
            }
            write!(formatter, "{segment}")?;
        }
        Ok(())
    }
}
