//! URL rewriting for remote development sandboxes (GitHub Codespaces).
//!
//! Inside a sandbox, `localhost` URLs published by resources are unreachable
//! from the developer's browser. Each forwarded port is instead exposed as
//! `{scheme}://{codespace}-{port}.{forwarding domain}`. This module rewrites
//! resource URLs accordingly and republishes the affected snapshots.

use std::collections::HashMap;

use harbor_model::UrlSnapshot;
use tracing::warn;
use url::Url;

use crate::error::{HarborError, Result};

mod hook;
mod rewriter;

pub use hook::SandboxUrlRewriteHook;
pub use rewriter::UrlRewriter;

/// Boolean flag that enables sandbox mode.
pub const CODESPACES_ENV: &str = "CODESPACES";
/// Name of the running codespace.
pub const CODESPACE_NAME_ENV: &str = "CODESPACE_NAME";
/// Domain under which forwarded ports are published.
pub const PORT_FORWARDING_DOMAIN_ENV: &str =
    "GITHUB_CODESPACES_PORT_FORWARDING_DOMAIN";

/// Raw sandbox settings as gathered from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxSettings {
    pub enabled: bool,
    pub codespace_name: Option<String>,
    pub port_forwarding_domain: Option<String>,
}

/// Validated forwarding target for rewritten URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxForwarding {
    codespace_name: String,
    port_forwarding_domain: String,
}

fn required(value: &Option<String>, key: &'static str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(HarborError::MissingConfiguration { key })
}

impl SandboxForwarding {
    pub fn new(
        codespace_name: impl Into<String>,
        port_forwarding_domain: impl Into<String>,
    ) -> Self {
        Self {
            codespace_name: codespace_name.into(),
            port_forwarding_domain: port_forwarding_domain.into(),
        }
    }

    /// Both keys are required; a blank value counts as missing.
    pub fn from_settings(settings: &SandboxSettings) -> Result<Self> {
        let port_forwarding_domain = required(
            &settings.port_forwarding_domain,
            PORT_FORWARDING_DOMAIN_ENV,
        )?;
        let codespace_name =
            required(&settings.codespace_name, CODESPACE_NAME_ENV)?;

        Ok(Self {
            codespace_name,
            port_forwarding_domain,
        })
    }

    pub fn codespace_name(&self) -> &str {
        &self.codespace_name
    }

    pub fn port_forwarding_domain(&self) -> &str {
        &self.port_forwarding_domain
    }

    /// Forwarded form of `original`, or `None` when the URL is internal, not
    /// http(s), not on `localhost`, or cannot be parsed.
    pub fn rewrite(&self, original: &UrlSnapshot) -> Option<UrlSnapshot> {
        if original.is_internal() {
            return None;
        }

        let parsed = match Url::parse(original.url()) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    target: "harbor::sandbox",
                    url = original.url(),
                    error = %err,
                    "skipping malformed resource url"
                );
                return None;
            }
        };

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return None;
        }
        if parsed.host_str() != Some("localhost") {
            return None;
        }
        let port = parsed.port_or_known_default()?;

        Some(original.with_url(format!(
            "{scheme}://{}-{port}.{}{}",
            self.codespace_name,
            self.port_forwarding_domain,
            parsed.path()
        )))
    }

    /// Rewrites for every qualifying entry, keyed by the original value.
    /// `None` when nothing needs rewriting.
    pub fn remap(&self, urls: &[UrlSnapshot]) -> Option<UrlRemap> {
        let mut remapped: Option<HashMap<UrlSnapshot, UrlSnapshot>> = None;

        for original in urls {
            if let Some(rewritten) = self.rewrite(original) {
                remapped
                    .get_or_insert_with(HashMap::new)
                    .insert(original.clone(), rewritten);
            }
        }

        remapped.map(UrlRemap)
    }
}

/// Original-to-rewritten URL lookup built once per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRemap(HashMap<UrlSnapshot, UrlSnapshot>);

impl UrlRemap {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Positional substitution: same length and order as `urls`, with
    /// unmatched entries passed through unchanged.
    pub fn apply(&self, urls: &[UrlSnapshot]) -> Vec<UrlSnapshot> {
        urls.iter()
            .map(|url| self.0.get(url).cloned().unwrap_or_else(|| url.clone()))
            .collect()
    }
}
