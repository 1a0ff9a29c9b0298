//! Container identifiers.
//!
//! Targets are written `[platform/]identifier`:
//!
//! | Input            | Platform | Name          |
//! |------------------|----------|---------------|
//! | `web`            | Docker   | `web`         |
//! | `docker/web`     | Docker   | `web`         |
//! | `pod/web-5d8f`   | Pod      | `web-5d8f`    |
//!
//! Only the first `/` separates the prefix.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Platform a target lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Standalone container engine.
    Docker,
    /// Orchestrated pod.
    Pod,
}

impl Platform {
    /// Returns the identifier prefix for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Pod => "pod",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(Self::Docker),
            "pod" => Ok(Self::Pod),
            other => Err(Error::InvalidPlatformPrefix {
                prefix: other.to_string(),
            }),
        }
    }
}

/// A parsed container identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Platform the target lives on.
    pub platform: Platform,
    /// Platform-local name or id.
    pub name: String,
}

impl Target {
    /// Creates a target.
    pub fn new(platform: Platform, name: impl Into<String>) -> Self {
        Self {
            platform,
            name: name.into(),
        }
    }

    /// Parses `[platform/]identifier`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPlatformPrefix`] for an unknown prefix
    /// - [`Error::InvalidTarget`] for an empty identifier
    pub fn parse(input: &str) -> Result<Self> {
        let (platform, name) = match input.split_once('/') {
            Some((prefix, name)) => (prefix.parse()?, name),
            None => (Platform::Docker, input),
        };

        if name.is_empty() {
            return Err(Error::InvalidTarget {
                target: input.to_string(),
                reason: "empty identifier".to_string(),
            });
        }

        Ok(Self::new(platform, name))
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.name)
    }
}
