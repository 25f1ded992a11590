//! Immutable point-in-time views of a resource.
//!
//! Snapshots are never edited in place. Every update builds a new value that
//! copies the unchanged fields and substitutes the changed one, so a snapshot
//! handed to a watcher stays valid no matter what is published afterwards.

use chrono::{DateTime, Utc};

/// One URL a resource is reachable at.
///
/// Equality and hashing are structural so a snapshot can key a lookup map
/// from original URL to rewritten URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UrlSnapshot {
    name: String,
    url: String,
    is_internal: bool,
}

impl UrlSnapshot {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        is_internal: bool,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            is_internal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_internal(&self) -> bool {
        self.is_internal
    }

    /// Copy of this snapshot pointing at a different address.
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            url: url.into(),
            is_internal: self.is_internal,
        }
    }
}

/// Free-form key/value detail shown next to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePropertySnapshot {
    pub name: String,
    pub value: String,
}

/// Observable state of a resource at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceSnapshot {
    resource_type: String,
    state: Option<String>,
    urls: Vec<UrlSnapshot>,
    properties: Vec<ResourcePropertySnapshot>,
    created_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            state: None,
            urls: Vec::new(),
            properties: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn urls(&self) -> &[UrlSnapshot] {
        &self.urls
    }

    pub fn properties(&self) -> &[ResourcePropertySnapshot] {
        &self.properties
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn with_state(&self, state: impl Into<String>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            state: Some(state.into()),
            urls: self.urls.clone(),
            properties: self.properties.clone(),
            created_at: self.created_at,
        }
    }

    pub fn with_urls(&self, urls: Vec<UrlSnapshot>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            state: self.state.clone(),
            urls,
            properties: self.properties.clone(),
            created_at: self.created_at,
        }
    }

    /// Adds the property, replacing any existing value under the same name.
    pub fn with_property(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut properties: Vec<ResourcePropertySnapshot> = self
            .properties
            .iter()
            .filter(|existing| existing.name != name)
            .cloned()
            .collect();
        properties.push(ResourcePropertySnapshot {
            name,
            value: value.into(),
        });

        Self {
            resource_type: self.resource_type.clone(),
            state: self.state.clone(),
            urls: self.urls.clone(),
            properties,
            created_at: self.created_at,
        }
    }
}
