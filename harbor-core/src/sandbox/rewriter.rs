use std::{fmt, sync::Arc};

use futures::StreamExt;
use harbor_model::ResourceEvent;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::notifications::{ResourceNotifications, snapshot_transform};
use crate::sandbox::SandboxForwarding;

/// Watches resource events and republishes snapshots whose `localhost` URLs
/// need forwarding through the sandbox.
pub struct UrlRewriter {
    forwarding: SandboxForwarding,
    notifications: Arc<dyn ResourceNotifications>,
}

impl fmt::Debug for UrlRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlRewriter")
            .field("forwarding", &self.forwarding)
            .finish_non_exhaustive()
    }
}

impl UrlRewriter {
    pub fn new(
        forwarding: SandboxForwarding,
        notifications: Arc<dyn ResourceNotifications>,
    ) -> Self {
        Self {
            forwarding,
            notifications,
        }
    }

    /// Runs until `cancel` fires or the notification channel closes.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut events = self.notifications.watch(cancel.clone());
        info!(
            target: "harbor::sandbox",
            codespace = self.forwarding.codespace_name(),
            domain = self.forwarding.port_forwarding_domain(),
            "url rewriter watching resource events"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(target: "harbor::sandbox", "url rewriter shutting down");
                    break;
                }
                next = events.next() => match next {
                    Some(event) => self.process(event).await,
                    None => {
                        debug!(target: "harbor::sandbox", "resource event stream closed");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn process(&self, event: ResourceEvent) {
        let Some(remap) = self.forwarding.remap(event.snapshot.urls()) else {
            return;
        };

        let rewritten = remap.len();
        let result = self
            .notifications
            .publish_update(
                &event.resource_id,
                snapshot_transform(move |current| current.with_urls(remap.apply(current.urls()))),
            )
            .await;

        match result {
            Ok(()) => debug!(
                target: "harbor::sandbox",
                resource = %event.resource_id,
                rewritten,
                "published forwarded urls"
            ),
            Err(err) => warn!(
                target: "harbor::sandbox",
                resource = %event.resource_id,
                error = %err,
                "failed to publish forwarded urls"
            ),
        }
    }
}
