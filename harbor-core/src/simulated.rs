//! Simulated custom resource.
//!
//! Stands in for any dependency whose readiness is not known when it is
//! declared: the driver moves the resource from `Unstarted` to `Starting`,
//! waits out a fixed provisioning delay, then reports `Running` and flips the
//! resource's health flag. No failure path is modelled.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use harbor_model::{ProvisioningState, ResourceId};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{HarborError, Result};
use crate::health::HealthFlag;
use crate::lifecycle::{BeforeStartHook, StartupContext};
use crate::notifications::{ResourceNotifications, snapshot_transform};

/// Provisioning delay used when none is configured.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(20);

pub struct SimulatedResourceDriver {
    resource_id: ResourceId,
    notifications: Arc<dyn ResourceNotifications>,
    health: HealthFlag,
    startup_delay: Duration,
    state: watch::Sender<ProvisioningState>,
}

impl fmt::Debug for SimulatedResourceDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedResourceDriver")
            .field("resource_id", &self.resource_id)
            .field("state", &*self.state.borrow())
            .field("healthy", &self.health.is_healthy())
            .field("startup_delay", &self.startup_delay)
            .finish_non_exhaustive()
    }
}

impl SimulatedResourceDriver {
    pub fn new(
        resource_id: ResourceId,
        notifications: Arc<dyn ResourceNotifications>,
        health: HealthFlag,
        startup_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ProvisioningState::Unstarted);
        Self {
            resource_id,
            notifications,
            health,
            startup_delay,
            state,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn state(&self) -> ProvisioningState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ProvisioningState> {
        self.state.subscribe()
    }

    pub fn health(&self) -> HealthFlag {
        self.health.clone()
    }

    /// Drives the resource through `Starting` to `Running`. Runs at most once;
    /// a second call fails with [`HarborError::AlreadyStarted`]. Cancelling
    /// during the provisioning delay leaves the resource `Starting` and
    /// unhealthy.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let started = self.state.send_if_modified(|state| {
            if *state == ProvisioningState::Unstarted {
                *state = ProvisioningState::Starting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(HarborError::AlreadyStarted(self.resource_id.to_string()));
        }

        self.publish(ProvisioningState::Starting).await?;
        info!(
            target: "harbor::simulated",
            resource = %self.resource_id,
            delay = ?self.startup_delay,
            "simulated resource provisioning"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(target: "harbor::simulated", resource = %self.resource_id, "provisioning cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(self.startup_delay) => {}
        }

        self.state.send_replace(ProvisioningState::Running);
        self.publish(ProvisioningState::Running).await?;
        self.health.mark_healthy();
        info!(target: "harbor::simulated", resource = %self.resource_id, "simulated resource running");
        Ok(())
    }

    async fn publish(&self, state: ProvisioningState) -> Result<()> {
        self.notifications
            .publish_update(
                &self.resource_id,
                snapshot_transform(move |current| current.with_state(state.label())),
            )
            .await
    }
}

/// Spawns the driver's run as a background task on the before-start event.
#[derive(Debug)]
pub struct SimulatedResourceHook {
    driver: Arc<SimulatedResourceDriver>,
}

impl SimulatedResourceHook {
    pub fn new(driver: Arc<SimulatedResourceDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl BeforeStartHook for SimulatedResourceHook {
    fn name(&self) -> &str {
        self.driver.resource_id.as_str()
    }

    async fn before_start(&self, context: &StartupContext) -> Result<()> {
        let driver = Arc::clone(&self.driver);
        let cancel = context.shutdown_token();
        context.spawn(
            format!("simulated:{}", driver.resource_id),
            async move { driver.run(cancel).await },
        );
        Ok(())
    }
}
