use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::lifecycle::{BeforeStartHook, StartupContext};
use crate::sandbox::{SandboxForwarding, SandboxSettings, UrlRewriter};

/// Starts the [`UrlRewriter`] when the host raises its before-start event.
///
/// Configuration is validated inside the hook, so a missing sandbox key
/// fails startup before any resource event is processed.
#[derive(Debug, Clone)]
pub struct SandboxUrlRewriteHook {
    settings: SandboxSettings,
}

impl SandboxUrlRewriteHook {
    pub fn new(settings: SandboxSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BeforeStartHook for SandboxUrlRewriteHook {
    fn name(&self) -> &str {
        "sandbox-url-rewrite"
    }

    async fn before_start(&self, context: &StartupContext) -> Result<()> {
        let forwarding = SandboxForwarding::from_settings(&self.settings)?;
        info!(
            target: "harbor::sandbox",
            codespace = forwarding.codespace_name(),
            "sandbox detected, forwarding localhost urls"
        );

        let rewriter = UrlRewriter::new(forwarding, context.notifications());
        context.spawn("sandbox-url-rewriter", rewriter.run(context.shutdown_token()));
        Ok(())
    }
}
