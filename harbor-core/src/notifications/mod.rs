//! Resource notification channel.
//!
//! Watchers observe an ordered stream of [`ResourceEvent`]s and publish new
//! snapshots by handing the channel a transform over the latest snapshot.

use async_trait::async_trait;
use futures::stream::BoxStream;
use harbor_model::{ResourceEvent, ResourceId, ResourceSnapshot};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

mod in_proc;

pub use in_proc::{DEFAULT_CHANNEL_CAPACITY, InProcResourceNotifications};

/// Builds the next snapshot of a resource from its current one.
pub type SnapshotTransform =
    Box<dyn FnOnce(&ResourceSnapshot) -> ResourceSnapshot + Send>;

/// Boxes a closure as a [`SnapshotTransform`].
pub fn snapshot_transform<F>(transform: F) -> SnapshotTransform
where
    F: FnOnce(&ResourceSnapshot) -> ResourceSnapshot + Send + 'static,
{
    Box::new(transform)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceNotifications: Send + Sync {
    /// Stream of resource events: the current snapshot of every known
    /// resource first, then each update as it is published. Ends when
    /// `cancel` fires or the channel closes; it cannot be restarted.
    fn watch(
        &self,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ResourceEvent>;

    /// Replaces the snapshot of `resource_id` with `transform(current)` and
    /// notifies watchers.
    async fn publish_update(
        &self,
        resource_id: &ResourceId,
        transform: SnapshotTransform,
    ) -> Result<()>;
}
