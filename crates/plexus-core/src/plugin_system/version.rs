use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing a [`Version`] string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("the version '{0}' is not a correct version: expected major[.minor[.revision]]")]
    TooManyComponents(String),
    #[error("the version '{version}' is not a correct version: '{component}' is not a number")]
    InvalidComponent { version: String, component: String },
}

/// A three part `major.minor.revision` plugin version.
///
/// Components are compared numerically, so `1.10` is newer than `1.9`.
/// Missing components default to `0`, and an empty string parses as `0.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    major: u32,
    minor: u32,
    revision: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self { major, minor, revision }
    }

    /// Parses `major[.minor[.revision]]`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::TooManyComponents(input.to_string()));
        }

        let mut components = [0u32; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.trim().parse::<u32>().map_err(|_| VersionError::InvalidComponent {
                version: input.to_string(),
                component: part.to_string(),
            })?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Three-way comparison returning `1`, `0` or `-1`.
    pub fn compare(&self, other: &Version) -> i32 {
        match self.cmp(other) {
            Ordering::Greater => 1,
            Ordering::Equal => 0,
            Ordering::Less => -1,
        }
    }

    /// True when `self` is at least `required`.
    pub fn satisfies(&self, required: &Version) -> bool {
        self.compare(required) >= 0
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}
