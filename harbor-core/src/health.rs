//! Health checks polled by the host.
//!
//! Resources expose readiness through a [`HealthFlag`]; the host registers a
//! named [`HealthCheck`] per resource in the [`HealthCheckRegistry`] and polls
//! it on demand.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{HarborError, Result};

/// Name under which a resource's health check is registered.
pub fn health_check_name(resource_name: &str) -> String {
    format!("{resource_name}_check")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: None,
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: Some(description.into()),
        }
    }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> HealthCheckResult;
}

/// Shared readiness flag with a single writer and any number of readers.
///
/// The flag only ever moves from unhealthy to healthy.
#[derive(Debug, Clone, Default)]
pub struct HealthFlag(Arc<AtomicBool>);

impl HealthFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_healthy(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_healthy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Reports the state of a [`HealthFlag`].
#[derive(Debug, Clone)]
pub struct FlagHealthCheck {
    resource_name: String,
    flag: HealthFlag,
}

impl FlagHealthCheck {
    pub fn new(resource_name: impl Into<String>, flag: HealthFlag) -> Self {
        Self {
            resource_name: resource_name.into(),
            flag,
        }
    }
}

#[async_trait]
impl HealthCheck for FlagHealthCheck {
    async fn check(&self) -> HealthCheckResult {
        if self.flag.is_healthy() {
            HealthCheckResult::healthy()
        } else {
            HealthCheckResult::unhealthy(format!(
                "{} is not ready yet",
                self.resource_name
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub name: String,
    #[serde(flatten)]
    pub result: HealthCheckResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub status: HealthStatus,
    pub checks: Vec<HealthReport>,
}

/// Named health checks, polled on demand.
#[derive(Default)]
pub struct HealthCheckRegistry {
    checks: RwLock<BTreeMap<String, Arc<dyn HealthCheck>>>,
}

impl fmt::Debug for HealthCheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .checks
            .try_read()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("HealthCheckRegistry")
            .field("checks", &names)
            .finish()
    }
}

impl HealthCheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        check: Arc<dyn HealthCheck>,
    ) -> Result<()> {
        let name = name.into();
        let mut guard = self.checks.write();
        if guard.contains_key(&name) {
            return Err(HarborError::DuplicateHealthCheck(name));
        }
        guard.insert(name, check);
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.checks.read().keys().cloned().collect()
    }

    /// Runs a single check; `None` when no check is registered under `name`.
    pub async fn check(&self, name: &str) -> Option<HealthCheckResult> {
        let check = self.checks.read().get(name).cloned()?;
        Some(check.check().await)
    }

    /// Runs every registered check. The summary is healthy only when every
    /// check is; an empty registry counts as healthy.
    pub async fn check_all(&self) -> HealthSummary {
        let checks: Vec<(String, Arc<dyn HealthCheck>)> = self
            .checks
            .read()
            .iter()
            .map(|(name, check)| (name.clone(), Arc::clone(check)))
            .collect();

        let mut reports = Vec::with_capacity(checks.len());
        for (name, check) in checks {
            reports.push(HealthReport {
                name,
                result: check.check().await,
            });
        }

        let status = if reports.iter().all(|r| r.result.status.is_healthy()) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthSummary {
            status,
            checks: reports,
        }
    }
}
