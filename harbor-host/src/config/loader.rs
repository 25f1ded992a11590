use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use harbor_core::{
    lifecycle::DEFAULT_SHUTDOWN_TIMEOUT, sandbox::SandboxSettings,
    simulated::DEFAULT_STARTUP_DELAY,
};
use harbor_model::{EndpointSpec, ModelError, validate_resource_name};

use super::{
    models::{
        Config, ConfigMetadata, DEFAULT_HEALTH_HOST, DEFAULT_HEALTH_PORT,
        ResourceConfig, SAMPLE_MODEL, ServerConfig, SimulatedResourceConfig,
    },
    sources::{
        EnvConfig, FileConfig, FileEndpointConfig, FileResourceConfig,
        FileSimulatedResourceConfig,
    },
    validation::{self, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![PathBuf::from("harbor.toml"), PathBuf::from("config/harbor.toml")]
});

const SAMPLE_MODEL_SOURCE: &str = "<built-in sample model>";

#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Loads `.env` into the process environment, then composes the
    /// configuration from the environment and the TOML file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_from_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Composes the configuration from an already gathered environment,
    /// without touching `.env` files.
    pub fn load_from_env(
        &self,
        env_config: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env_config)?;
        let (config, warnings) =
            self.compose_config(file_config, env_config, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    /// A path named by `--config` or `HARBOR_CONFIG` must exist. Otherwise
    /// the first default location present is used, if any.
    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let requested = self
            .config_path
            .as_ref()
            .or(env_config.config_path.as_ref());

        let path = match requested {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path: path.clone() });
            }
            Some(path) => path.clone(),
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => path.clone(),
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config = parse_file_config(&contents, &path)?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        let sample_model = file_config.is_none();
        let file = match file_config {
            Some(file) => file,
            None => {
                warnings.push_with_hint(
                    "No harbor.toml detected; using the built-in sample application model",
                    "Pass --config or set HARBOR_CONFIG to describe your own resources",
                );
                parse_file_config(SAMPLE_MODEL, Path::new(SAMPLE_MODEL_SOURCE))?
            }
        };

        let FileConfig {
            server: file_server,
            sandbox: file_sandbox,
            shutdown_timeout: file_shutdown_timeout,
            resources: file_resources,
            simulated_resources: file_simulated,
        } = file;

        let server = ServerConfig {
            host: env
                .health_host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HEALTH_HOST.to_string()),
            port: env
                .health_port
                .or(file_server.port)
                .unwrap_or(DEFAULT_HEALTH_PORT),
        };

        let sandbox = SandboxSettings {
            enabled: env
                .codespaces
                .or(file_sandbox.enabled)
                .unwrap_or(false),
            codespace_name: env
                .codespace_name
                .clone()
                .or(file_sandbox.codespace_name),
            port_forwarding_domain: env
                .port_forwarding_domain
                .clone()
                .or(file_sandbox.port_forwarding_domain),
        };

        let shutdown_timeout = match env
            .shutdown_timeout
            .as_deref()
            .or(file_shutdown_timeout.as_deref())
        {
            Some(raw) => parse_duration("shutdown_timeout", raw)?,
            None => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        let resources = file_resources
            .into_iter()
            .map(resource_config)
            .collect::<Result<Vec<_>, _>>()?;

        let simulated_resources = file_simulated
            .into_iter()
            .map(simulated_config)
            .collect::<Result<Vec<_>, _>>()?;

        let config = Config {
            server,
            sandbox,
            shutdown_timeout,
            resources,
            simulated_resources,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
                sample_model,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn parse_file_config(
    contents: &str,
    path: &Path,
) -> Result<FileConfig, ConfigLoadError> {
    toml::from_str(contents).map_err(|err| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigLoadError::InvalidDuration {
            field: field.to_string(),
            value: raw.to_string(),
            source,
        }
    })
}

fn resource_config(
    file: FileResourceConfig,
) -> Result<ResourceConfig, ConfigLoadError> {
    validate_resource_name(&file.name)?;
    let endpoints = file
        .endpoints
        .into_iter()
        .map(endpoint_spec)
        .collect::<Result<Vec<_>, ModelError>>()?;

    Ok(ResourceConfig {
        name: file.name,
        kind: file.kind,
        endpoints,
    })
}

fn simulated_config(
    file: FileSimulatedResourceConfig,
) -> Result<SimulatedResourceConfig, ConfigLoadError> {
    validate_resource_name(&file.name)?;
    let startup_delay = match file.startup_delay.as_deref() {
        Some(raw) => {
            parse_duration(&format!("{}.startup_delay", file.name), raw)?
        }
        None => DEFAULT_STARTUP_DELAY,
    };

    Ok(SimulatedResourceConfig {
        name: file.name,
        startup_delay,
    })
}

fn endpoint_spec(file: FileEndpointConfig) -> Result<EndpointSpec, ModelError> {
    let spec = EndpointSpec::new(file.name, file.scheme, file.port)?;
    Ok(if file.internal { spec.internal() } else { spec })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration for {field}: '{value}'")]
    InvalidDuration {
        field: String,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("resource '{name}' is declared more than once")]
    DuplicateResource { name: String },
    #[error(transparent)]
    InvalidModel(#[from] ModelError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
