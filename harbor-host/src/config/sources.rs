use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use harbor_core::sandbox::{
    CODESPACE_NAME_ENV, CODESPACES_ENV, PORT_FORWARDING_DOMAIN_ENV,
};
use harbor_model::ResourceKind;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub sandbox: FileSandboxConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout: Option<String>,
    #[serde(default)]
    pub resources: Vec<FileResourceConfig>,
    #[serde(default)]
    pub simulated_resources: Vec<FileSimulatedResourceConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSandboxConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codespace_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_forwarding_domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileResourceConfig {
    pub name: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub endpoints: Vec<FileEndpointConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileEndpointConfig {
    pub name: String,
    pub scheme: String,
    pub port: u16,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileSimulatedResourceConfig {
    pub name: String,
    /// humantime duration, e.g. `"20s"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_delay: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub codespaces: Option<bool>,
    pub codespace_name: Option<String>,
    pub port_forwarding_domain: Option<String>,
    pub config_path: Option<PathBuf>,
    pub health_host: Option<String>,
    pub health_port: Option<u16>,
    pub shutdown_timeout: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the environment view from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = Self::default();

        env_config.codespaces =
            lookup(CODESPACES_ENV).and_then(|raw| parse_bool(&raw));
        env_config.codespace_name = lookup(CODESPACE_NAME_ENV);
        env_config.port_forwarding_domain = lookup(PORT_FORWARDING_DOMAIN_ENV);
        env_config.config_path = lookup("HARBOR_CONFIG").map(PathBuf::from);
        env_config.health_host = lookup("HARBOR_HEALTH_HOST");
        env_config.health_port =
            lookup("HARBOR_HEALTH_PORT").and_then(|s| s.parse().ok());
        env_config.shutdown_timeout = lookup("HARBOR_SHUTDOWN_TIMEOUT");

        env_config
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn codespaces_flag_accepts_common_spellings() {
        assert_eq!(env(&[("CODESPACES", "true")]).codespaces, Some(true));
        assert_eq!(env(&[("CODESPACES", "1")]).codespaces, Some(true));
        assert_eq!(env(&[("CODESPACES", "False")]).codespaces, Some(false));
        assert_eq!(env(&[("CODESPACES", "maybe")]).codespaces, None);
        assert_eq!(env(&[]).codespaces, None);
    }

    #[test]
    fn unparsable_port_is_ignored() {
        let config = env(&[
            ("HARBOR_HEALTH_PORT", "http"),
            ("CODESPACE_NAME", "fluffy-train"),
        ]);
        assert_eq!(config.health_port, None);
        assert_eq!(config.codespace_name.as_deref(), Some("fluffy-train"));
    }

    #[test]
    fn file_config_reads_resources() {
        let raw = r#"
            shutdown_timeout = "10s"

            [server]
            port = 9000

            [[resources]]
            name = "pg"
            kind = "container"
            endpoints = [{ name = "tcp", scheme = "tcp", port = 5432 }]

            [[simulated_resources]]
            name = "provisioner"
            startup_delay = "5s"
        "#;
        let file: FileConfig = toml::from_str(raw).unwrap();
        assert_eq!(file.server.port, Some(9000));
        assert_eq!(file.resources[0].kind, ResourceKind::Container);
        assert!(!file.resources[0].endpoints[0].internal);
        assert_eq!(
            file.simulated_resources[0].startup_delay.as_deref(),
            Some("5s")
        );
    }
}
