// ABOUTME: Image reference split into repository name and tag.
// ABOUTME: Rejects references with more than one colon instead of guessing.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid image format: {0}")]
    TooManyColons(String),

    #[error("image reference has an empty name: {0}")]
    EmptyName(String),
}

/// A `name:tag` image reference.
///
/// The tag is empty when the reference carries none. References that need a
/// registry port (`registry:5000/app:v1`) are not representable and fail to
/// parse; deployments address images by `name` + `tag` separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    name: String,
    tag: String,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        let (name, tag) = match input.split_once(':') {
            None => (input, ""),
            Some((_, rest)) if rest.contains(':') => {
                return Err(ParseImageRefError::TooManyColons(input.to_string()));
            }
            Some((name, tag)) => (name, tag),
        };

        if name.is_empty() {
            return Err(ParseImageRefError::EmptyName(input.to_string()));
        }

        Ok(Self::new(name, tag))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn has_tag(&self) -> bool {
        !self.tag.is_empty()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.name, self.tag)
        }
    }
}

impl std::str::FromStr for ImageRef {
    type Err = ParseImageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
