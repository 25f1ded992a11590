use std::fmt;

/// State label for declared resources before the host has started them.
pub const STATE_NOT_STARTED: &str = "NotStarted";
/// State label for declared resources once their endpoints are allocated.
pub const STATE_RUNNING: &str = "Running";

/// Lifecycle of a resource whose readiness is only known after an opaque
/// provisioning step (image pull, external API call) completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProvisioningState {
    #[default]
    Unstarted,
    Starting,
    Running,
}

impl ProvisioningState {
    pub fn label(&self) -> &'static str {
        match self {
            ProvisioningState::Unstarted => "Unstarted",
            ProvisioningState::Starting => "Starting",
            ProvisioningState::Running => STATE_RUNNING,
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
