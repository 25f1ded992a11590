use std::{path::PathBuf, time::Duration};

use harbor_core::sandbox::SandboxSettings;
use harbor_model::{EndpointSpec, ResourceKind};

pub const DEFAULT_HEALTH_HOST: &str = "127.0.0.1";
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Fully resolved host configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub sandbox: SandboxSettings,
    pub shutdown_timeout: Duration,
    pub resources: Vec<ResourceConfig>,
    pub simulated_resources: Vec<SimulatedResourceConfig>,
    pub metadata: ConfigMetadata,
}

/// Bind address of the health endpoint server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HEALTH_HOST.to_string(),
            port: DEFAULT_HEALTH_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    pub name: String,
    pub kind: ResourceKind,
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedResourceConfig {
    pub name: String,
    pub startup_delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
    pub sample_model: bool,
}

/// Application model used when no configuration file is found: a database,
/// its admin UI, an API, a web frontend and one simulated custom resource.
pub const SAMPLE_MODEL: &str = r#"
[[resources]]
name = "pg"
kind = "container"
endpoints = [{ name = "tcp", scheme = "tcp", port = 5432 }]

[[resources]]
name = "pgadmin"
kind = "container"
endpoints = [{ name = "http", scheme = "http", port = 39999 }]

[[resources]]
name = "apiservice"
kind = "project"
endpoints = [
  { name = "http", scheme = "http", port = 5380 },
  { name = "https", scheme = "https", port = 7380 },
]

[[resources]]
name = "webfrontend"
kind = "project"
endpoints = [
  { name = "http", scheme = "http", port = 5080 },
  { name = "https", scheme = "https", port = 7080 },
]

[[simulated_resources]]
name = "provisioner"
startup_delay = "20s"
"#;
