use std::collections::BTreeSet;

use super::models::Config;
use super::loader::ConfigLoadError;

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

/// Rejects models the host cannot start and flags settings that are
/// probably mistakes.
pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    let mut seen = BTreeSet::new();
    let names = config
        .resources
        .iter()
        .map(|r| r.name.as_str())
        .chain(config.simulated_resources.iter().map(|r| r.name.as_str()));
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigLoadError::DuplicateResource {
                name: name.to_string(),
            });
        }
    }

    let sandbox = &config.sandbox;
    if !sandbox.enabled
        && (sandbox.codespace_name.is_some()
            || sandbox.port_forwarding_domain.is_some())
    {
        warnings.push_with_hint(
            "Codespace settings are present but CODESPACES is not enabled; URLs will not be forwarded",
            "Set CODESPACES=true or [sandbox] enabled = true",
        );
    }

    if config.resources.is_empty() && config.simulated_resources.is_empty() {
        warnings.push("Application model declares no resources");
    }

    Ok(warnings)
}
