//! Turns a resolved [`Config`] into an [`AppHost`] ready to start.

use harbor_core::{AppHost, Result};
use tracing::debug;

use crate::config::Config;

pub fn build_app_host(config: &Config) -> Result<AppHost> {
    let mut builder = AppHost::builder().shutdown_timeout(config.shutdown_timeout);

    for resource in &config.resources {
        builder.add_resource(
            &resource.name,
            resource.kind,
            resource.endpoints.clone(),
        )?;
        debug!(
            target: "harbor::host",
            resource = %resource.name,
            kind = %resource.kind,
            endpoints = resource.endpoints.len(),
            "declared resource"
        );
    }

    for simulated in &config.simulated_resources {
        builder.add_simulated_resource(&simulated.name, simulated.startup_delay)?;
        debug!(
            target: "harbor::host",
            resource = %simulated.name,
            delay = ?simulated.startup_delay,
            "declared simulated resource"
        );
    }

    Ok(builder.with_sandbox(config.sandbox.clone()).build())
}
