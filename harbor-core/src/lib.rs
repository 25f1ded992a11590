//! # Harbor Core
//!
//! Runtime pieces of the Harbor application host: the resource notification
//! channel, the sandbox URL rewriter, simulated custom resources and the
//! health check registry.
//!
//! ## Architecture
//!
//! - [`notifications`]: ordered resource event stream plus snapshot publishing
//! - [`sandbox`]: rewrites `localhost` URLs to their forwarded form when the
//!   host runs inside a GitHub Codespace
//! - [`simulated`]: a custom resource that reports `Running` after a delay
//! - [`health`]: named health checks backed by readiness flags
//! - [`lifecycle`]: the before-start event and background task bookkeeping
//! - [`app_host`]: ties the above together
//!
//! ## Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use harbor_core::{AppHost, sandbox::SandboxSettings};
//! use harbor_model::{EndpointSpec, ResourceKind};
//!
//! async fn run() -> harbor_core::Result<()> {
//!     let mut builder = AppHost::builder();
//!     builder.add_resource(
//!         "webfrontend",
//!         ResourceKind::Project,
//!         vec![EndpointSpec::new("http", "http", 5080)?],
//!     )?;
//!     builder.add_simulated_resource("provisioner", Duration::from_secs(20))?;
//!
//!     let host = builder.with_sandbox(SandboxSettings::default()).build();
//!     host.start().await?;
//!     host.shutdown().await
//! }
//! ```
#![allow(missing_docs)]

pub mod app_host;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod notifications;
pub mod sandbox;
pub mod simulated;

pub use app_host::{AppHost, AppHostBuilder};
pub use error::{HarborError, Result};
pub use health::{HealthCheckRegistry, HealthFlag, HealthStatus, HealthSummary};
pub use notifications::{
    InProcResourceNotifications, ResourceNotifications, SnapshotTransform,
    snapshot_transform,
};
