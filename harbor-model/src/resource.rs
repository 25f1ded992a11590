use std::fmt;

use crate::error::{ModelError, Result};

const MAX_RESOURCE_NAME_LEN: usize = 64;

/// Broad category of a declared resource. Drives the `resource_type` label of
/// its snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResourceKind {
    Project,
    Container,
    Executable,
    /// Resource whose lifecycle is driven by code inside the host rather
    /// than by a launched process.
    Custom,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Project => "Project",
            ResourceKind::Container => "Container",
            ResourceKind::Executable => "Executable",
            ResourceKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a declared resource, carried alongside every snapshot event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resource {
    name: String,
    kind: ResourceKind,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Result<Self> {
        let name = name.into();
        validate_resource_name(&name)?;
        Ok(Self { name, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

/// Resource names end up in host names and health check names, so they are
/// restricted to ASCII letters, digits and single hyphens, starting with a
/// letter.
pub fn validate_resource_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(ModelError::InvalidResourceName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name must not be empty");
    }
    if name.len() > MAX_RESOURCE_NAME_LEN {
        return invalid("name must be at most 64 characters");
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return invalid("name must start with an ASCII letter");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return invalid("name may only contain ASCII letters, digits and hyphens");
    }
    if name.ends_with('-') || name.contains("--") {
        return invalid("name must not end with or repeat hyphens");
    }
    Ok(())
}
