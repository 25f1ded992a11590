//! Application host that owns the notification channel, health registry and
//! background tasks, and raises the single before-start event.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use harbor_model::{
    EndpointSpec, Resource, ResourceId, ResourceKind, ResourceSnapshot,
    STATE_NOT_STARTED, STATE_RUNNING, UrlSnapshot,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{HarborError, Result};
use crate::health::{FlagHealthCheck, HealthCheckRegistry, HealthFlag, health_check_name};
use crate::lifecycle::{
    BackgroundTasks, BeforeStartHook, DEFAULT_SHUTDOWN_TIMEOUT, StartupContext,
    raise_before_start,
};
use crate::notifications::{
    InProcResourceNotifications, ResourceNotifications, snapshot_transform,
};
use crate::sandbox::{SandboxSettings, SandboxUrlRewriteHook};
use crate::simulated::{SimulatedResourceDriver, SimulatedResourceHook};

#[derive(Debug, Clone)]
struct DeclaredResource {
    resource_id: ResourceId,
    endpoints: Vec<EndpointSpec>,
}

/// Collects resources and hooks before the host starts.
pub struct AppHostBuilder {
    notifications: Arc<InProcResourceNotifications>,
    health: Arc<HealthCheckRegistry>,
    hooks: Vec<Arc<dyn BeforeStartHook>>,
    declared: Vec<DeclaredResource>,
    shutdown_timeout: Duration,
}

impl fmt::Debug for AppHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = self.hooks.iter().map(|hook| hook.name()).collect();
        f.debug_struct("AppHostBuilder")
            .field("notifications", &self.notifications)
            .field("health", &self.health)
            .field("hooks", &hooks)
            .field("declared", &self.declared)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Default for AppHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppHostBuilder {
    pub fn new() -> Self {
        Self::with_notifications(Arc::new(InProcResourceNotifications::default()))
    }

    pub fn with_notifications(notifications: Arc<InProcResourceNotifications>) -> Self {
        Self {
            notifications,
            health: Arc::new(HealthCheckRegistry::new()),
            hooks: Vec::new(),
            declared: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Declares a resource. It is announced as not started right away and
    /// gets its endpoint URLs once the host starts.
    pub fn add_resource(
        &mut self,
        name: &str,
        kind: ResourceKind,
        endpoints: Vec<EndpointSpec>,
    ) -> Result<ResourceId> {
        let resource = Resource::new(name, kind)?;
        let initial = ResourceSnapshot::new(kind.as_str()).with_state(STATE_NOT_STARTED);
        let resource_id = self.notifications.register(resource, initial)?;

        self.declared.push(DeclaredResource {
            resource_id: resource_id.clone(),
            endpoints,
        });
        Ok(resource_id)
    }

    /// Declares a simulated custom resource with a `{name}_check` health
    /// check that turns healthy once provisioning finishes.
    pub fn add_simulated_resource(
        &mut self,
        name: &str,
        startup_delay: Duration,
    ) -> Result<Arc<SimulatedResourceDriver>> {
        let resource = Resource::new(name, ResourceKind::Custom)?;
        let initial = ResourceSnapshot::new(ResourceKind::Custom.as_str())
            .with_state(harbor_model::ProvisioningState::Unstarted.label());
        let resource_id = self.notifications.register(resource, initial)?;

        let flag = HealthFlag::new();
        self.health.register(
            health_check_name(name),
            Arc::new(FlagHealthCheck::new(name, flag.clone())),
        )?;

        let notifications: Arc<dyn ResourceNotifications> = self.notifications.clone();
        let driver = Arc::new(SimulatedResourceDriver::new(
            resource_id,
            notifications,
            flag,
            startup_delay,
        ));
        self.hooks
            .push(Arc::new(SimulatedResourceHook::new(Arc::clone(&driver))));
        Ok(driver)
    }

    /// Enables URL forwarding when `settings.enabled`; otherwise a no-op.
    pub fn with_sandbox(mut self, settings: SandboxSettings) -> Self {
        if settings.enabled {
            self.hooks.push(Arc::new(SandboxUrlRewriteHook::new(settings)));
        }
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn BeforeStartHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(self) -> AppHost {
        AppHost {
            notifications: self.notifications,
            health: self.health,
            hooks: self.hooks,
            declared: self.declared,
            tasks: Arc::new(BackgroundTasks::new()),
            shutdown_token: CancellationToken::new(),
            shutdown_timeout: self.shutdown_timeout,
            started: AtomicBool::new(false),
        }
    }
}

pub struct AppHost {
    notifications: Arc<InProcResourceNotifications>,
    health: Arc<HealthCheckRegistry>,
    hooks: Vec<Arc<dyn BeforeStartHook>>,
    declared: Vec<DeclaredResource>,
    tasks: Arc<BackgroundTasks>,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
    started: AtomicBool,
}

impl fmt::Debug for AppHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = self.hooks.iter().map(|hook| hook.name()).collect();
        f.debug_struct("AppHost")
            .field("notifications", &self.notifications)
            .field("health", &self.health)
            .field("hooks", &hooks)
            .field("declared_count", &self.declared.len())
            .field("tasks", &self.tasks)
            .field("started", &self.started.load(Ordering::Acquire))
            .field("shutdown_cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl AppHost {
    pub fn builder() -> AppHostBuilder {
        AppHostBuilder::new()
    }

    pub fn notifications(&self) -> Arc<InProcResourceNotifications> {
        Arc::clone(&self.notifications)
    }

    pub fn health(&self) -> Arc<HealthCheckRegistry> {
        Arc::clone(&self.health)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn background_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Raises the before-start event, then allocates the endpoints of every
    /// declared resource. A failing hook aborts startup: the host token is
    /// cancelled so tasks spawned by earlier hooks wind down.
    ///
    /// A host starts at most once; later calls fail with
    /// [`HarborError::HostAlreadyStarted`] and leave the running host untouched.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(HarborError::HostAlreadyStarted);
        }

        let notifications: Arc<dyn ResourceNotifications> = self.notifications.clone();
        let context = StartupContext::new(
            notifications,
            Arc::clone(&self.tasks),
            self.shutdown_token.clone(),
        );

        if let Err(err) = raise_before_start(&self.hooks, &context).await {
            self.shutdown_token.cancel();
            return Err(err);
        }

        for declared in &self.declared {
            let urls: Vec<UrlSnapshot> = declared
                .endpoints
                .iter()
                .map(|endpoint| {
                    UrlSnapshot::new(
                        endpoint.name(),
                        endpoint.allocated_url(),
                        endpoint.is_internal(),
                    )
                })
                .collect();

            self.notifications
                .publish_update(
                    &declared.resource_id,
                    snapshot_transform(move |current| {
                        current.with_state(STATE_RUNNING).with_urls(urls)
                    }),
                )
                .await?;
        }

        info!(
            target: "harbor::host",
            resources = self.declared.len(),
            tasks = self.tasks.len(),
            "application host started"
        );
        Ok(())
    }

    /// Cancels the host token and joins every background task.
    pub async fn shutdown(&self) -> Result<()> {
        info!(target: "harbor::host", "initiating graceful shutdown of application host");
        self.shutdown_token.cancel();
        self.tasks.join_all(self.shutdown_timeout).await;

        if !self.tasks.is_empty() {
            warn!(target: "harbor::host", "background tasks spawned during shutdown were not joined");
            return Err(HarborError::Internal(
                "background tasks spawned during shutdown".into(),
            ));
        }

        info!(target: "harbor::host", "application host shutdown complete");
        Ok(())
    }
}
