//! Host configuration: `.env`, process environment and an optional
//! `harbor.toml`, composed into a single [`Config`].

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{
    Config, ConfigMetadata, ResourceConfig, ServerConfig,
    SimulatedResourceConfig,
};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigWarning, ConfigWarnings};
