//! GCP project identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProjectId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectIdError {
    /// The input string is empty.
    #[error("project id cannot be empty")]
    Empty,
    /// The input is shorter or longer than GCP allows.
    #[error("project id must be {min}-{max} characters")]
    InvalidLength {
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// The first character is not a lowercase ASCII letter.
    #[error("project id must start with a lowercase letter")]
    InvalidStart,
    /// The last character is a hyphen.
    #[error("project id cannot end with a hyphen")]
    TrailingHyphen,
    /// The input contains a character outside `[a-z0-9-]`.
    #[error("project id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A Google Cloud project ID.
///
/// Project ids end up in request paths, so they are validated against GCP's
/// grammar before any request is built.
///
/// ## Constraints
///
/// - Length: 6-30 characters
/// - Starts with a lowercase ASCII letter
/// - Only lowercase ASCII letters, digits and hyphens
/// - Does not end with a hyphen
///
/// ## Examples
///
/// ```
/// use chatops_core::ProjectId;
///
/// assert!(ProjectId::parse("my-project-123").is_ok());
///
/// assert!(ProjectId::parse("").is_err());            // empty
/// assert!(ProjectId::parse("proj").is_err());        // too short
/// assert!(ProjectId::parse("1project").is_err());    // starts with digit
/// assert!(ProjectId::parse("my/project").is_err());  // path separator
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Minimum length of a project id.
    pub const MIN_LENGTH: usize = 6;
    /// Maximum length of a project id.
    pub const MAX_LENGTH: usize = 30;

    /// Parse a `ProjectId` from a string.
    ///
    /// Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the input violates GCP's project id grammar.
    pub fn parse(s: &str) -> Result<Self, ProjectIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ProjectIdError::Empty);
        }

        let len = s.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(ProjectIdError::InvalidLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }

        if !s.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(ProjectIdError::InvalidStart);
        }

        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ProjectIdError::InvalidCharacter(bad));
        }

        if s.ends_with('-') {
            return Err(ProjectIdError::TrailingHyphen);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the project id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = ProjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = ProjectIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert!(ProjectId::parse("proj-1").is_ok());
        assert!(ProjectId::parse("my-project-123456").is_ok());
        assert!(ProjectId::parse("abcdef").is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = ProjectId::parse("  proj-1 ").unwrap();
        assert_eq!(id.as_str(), "proj-1");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ProjectId::parse("   "), Err(ProjectIdError::Empty));
    }

    #[test]
    fn test_parse_length_bounds() {
        assert!(matches!(
            ProjectId::parse("abc"),
            Err(ProjectIdError::InvalidLength { .. })
        ));
        assert!(matches!(
            ProjectId::parse(&"a".repeat(31)),
            Err(ProjectIdError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_path_characters() {
        assert_eq!(
            ProjectId::parse("proj/../x"),
            Err(ProjectIdError::InvalidCharacter('/'))
        );
        assert_eq!(
            ProjectId::parse("Project1"),
            Err(ProjectIdError::InvalidStart)
        );
    }

    #[test]
    fn test_parse_trailing_hyphen() {
        assert_eq!(
            ProjectId::parse("project-"),
            Err(ProjectIdError::TrailingHyphen)
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ProjectId = serde_json::from_str("\"proj-1\"").unwrap();
        assert_eq!(ok.as_str(), "proj-1");

        let err = serde_json::from_str::<ProjectId>("\"BAD ID\"");
        assert!(err.is_err());
    }
}
