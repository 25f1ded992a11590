use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use harbor_model::{Resource, ResourceEvent, ResourceId, ResourceSnapshot};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{
    BroadcastStream, errors::BroadcastStreamRecvError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{HarborError, Result};
use crate::notifications::{ResourceNotifications, SnapshotTransform};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type ResourceTable = BTreeMap<ResourceId, ResourceEntry>;

struct ResourceEntry {
    resource: Arc<Resource>,
    snapshot: ResourceSnapshot,
}

impl ResourceEntry {
    fn to_event(&self, resource_id: &ResourceId) -> ResourceEvent {
        ResourceEvent::new(
            resource_id.clone(),
            Arc::clone(&self.resource),
            self.snapshot.clone(),
        )
    }
}

/// In-process notification channel that keeps the latest snapshot of every
/// resource and fans updates out to watchers over a broadcast channel.
///
/// Updates are applied and broadcast while the snapshot table is write
/// locked, and watchers subscribe while holding the read lock, so a new
/// watcher sees every update exactly once: either in its replay or on the
/// live stream.
///
/// A watcher that falls more than `capacity` events behind is resynced: it
/// receives the current snapshot of every resource, followed by whatever
/// the channel still retains.
pub struct InProcResourceNotifications {
    resources: Arc<RwLock<ResourceTable>>,
    sender: broadcast::Sender<ResourceEvent>,
    capacity: usize,
}

impl fmt::Debug for InProcResourceNotifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource_count = self
            .resources
            .try_read()
            .map(|guard| guard.len())
            .unwrap_or_default();
        f.debug_struct("InProcResourceNotifications")
            .field("capacity", &self.capacity)
            .field("resource_count", &resource_count)
            .field("watchers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for InProcResourceNotifications {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl InProcResourceNotifications {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            resources: Arc::new(RwLock::new(BTreeMap::new())),
            sender,
            capacity,
        }
    }

    /// Adds a resource with its initial snapshot and announces it to
    /// watchers. Names must be unique within the channel.
    pub fn register(
        &self,
        resource: Resource,
        initial: ResourceSnapshot,
    ) -> Result<ResourceId> {
        let mut guard = self.resources.write();
        if guard.values().any(|entry| entry.resource.name() == resource.name()) {
            return Err(HarborError::DuplicateResource(resource.name().to_string()));
        }

        let resource_id = ResourceId::for_name(resource.name());
        let entry = ResourceEntry {
            resource: Arc::new(resource),
            snapshot: initial,
        };
        let event = entry.to_event(&resource_id);
        guard.insert(resource_id.clone(), entry);
        let _ = self.sender.send(event);

        debug!(target: "harbor::notifications", resource = %resource_id, "resource registered");
        Ok(resource_id)
    }

    pub fn snapshot(&self, resource_id: &ResourceId) -> Option<ResourceSnapshot> {
        let guard = self.resources.read();
        guard.get(resource_id).map(|entry| entry.snapshot.clone())
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        let guard = self.resources.read();
        guard
            .iter()
            .find(|(_, entry)| entry.resource.name() == name)
            .map(|(id, _)| id.clone())
    }

    /// Current event for every registered resource, ordered by id.
    pub fn current(&self) -> Vec<ResourceEvent> {
        current_events(&self.resources.read())
    }

    fn apply_update(
        &self,
        resource_id: &ResourceId,
        transform: SnapshotTransform,
    ) -> Result<()> {
        let mut guard = self.resources.write();
        let entry = guard
            .get_mut(resource_id)
            .ok_or_else(|| HarborError::UnknownResource(resource_id.to_string()))?;

        entry.snapshot = transform(&entry.snapshot);
        let event = entry.to_event(resource_id);
        debug!(
            target: "harbor::notifications",
            resource = %resource_id,
            state = event.snapshot.state().unwrap_or_default(),
            urls = event.snapshot.urls().len(),
            "resource snapshot updated"
        );
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[async_trait]
impl ResourceNotifications for InProcResourceNotifications {
    fn watch(
        &self,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ResourceEvent> {
        let (replay, receiver) = {
            let guard = self.resources.read();
            (current_events(&guard), self.sender.subscribe())
        };

        let table = Arc::clone(&self.resources);
        let live = BroadcastStream::new(receiver).flat_map(move |item| {
            let events = match item {
                Ok(event) => vec![event],
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    let resync = current_events(&table.read());
                    warn!(
                        target: "harbor::notifications",
                        skipped,
                        resources = resync.len(),
                        "resource watcher lagged; replaying current snapshots"
                    );
                    resync
                }
            };
            stream::iter(events)
        });

        stream::iter(replay)
            .chain(live)
            .take_until(cancel.cancelled_owned())
            .boxed()
    }

    async fn publish_update(
        &self,
        resource_id: &ResourceId,
        transform: SnapshotTransform,
    ) -> Result<()> {
        self.apply_update(resource_id, transform)
    }
}

fn current_events(table: &ResourceTable) -> Vec<ResourceEvent> {
    table.iter().map(|(id, entry)| entry.to_event(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::snapshot_transform;
    use harbor_model::ResourceKind;

    fn container(name: &str) -> Resource {
        Resource::new(name, ResourceKind::Container).unwrap()
    }

    #[tokio::test]
    async fn watch_replays_current_state_then_streams_updates() {
        let notifications = InProcResourceNotifications::default();
        let id = notifications
            .register(container("pg"), ResourceSnapshot::new("Container"))
            .unwrap();

        let cancel = CancellationToken::new();
        let mut events = notifications.watch(cancel.clone());

        let replayed = events.next().await.unwrap();
        assert_eq!(replayed.resource_id, id);
        assert_eq!(replayed.snapshot.state(), None);

        notifications
            .publish_update(&id, snapshot_transform(|s| s.with_state("Running")))
            .await
            .unwrap();

        let updated = events.next().await.unwrap();
        assert_eq!(updated.snapshot.state(), Some("Running"));
        assert_eq!(updated.resource.name(), "pg");

        cancel.cancel();
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn lagging_watcher_receives_current_snapshots() {
        let notifications = InProcResourceNotifications::new(2);
        let ids: Vec<ResourceId> = ["apiservice", "pg", "webfrontend"]
            .into_iter()
            .map(|name| {
                notifications
                    .register(container(name), ResourceSnapshot::new("Container"))
                    .unwrap()
            })
            .collect();

        let cancel = CancellationToken::new();
        let mut events = notifications.watch(cancel.clone());
        for _ in 0..ids.len() {
            events.next().await.unwrap();
        }

        for id in &ids {
            for state in ["Starting", "Running"] {
                notifications
                    .publish_update(id, snapshot_transform(move |s| s.with_state(state)))
                    .await
                    .unwrap();
            }
        }

        let mut resynced = Vec::new();
        for _ in 0..ids.len() {
            resynced.push(events.next().await.unwrap());
        }
        let mut resynced_ids: Vec<ResourceId> =
            resynced.iter().map(|event| event.resource_id.clone()).collect();
        resynced_ids.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(resynced_ids, expected);
        assert!(resynced.iter().all(|event| event.snapshot.state() == Some("Running")));

        cancel.cancel();
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn publish_to_unknown_resource_fails() {
        let notifications = InProcResourceNotifications::default();
        let other = InProcResourceNotifications::default();
        let foreign = other
            .register(container("pg"), ResourceSnapshot::new("Container"))
            .unwrap();

        let err = notifications
            .publish_update(&foreign, snapshot_transform(|s| s.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, HarborError::UnknownResource(_)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let notifications = InProcResourceNotifications::default();
        notifications
            .register(container("pg"), ResourceSnapshot::new("Container"))
            .unwrap();
        let err = notifications
            .register(container("pg"), ResourceSnapshot::new("Container"))
            .unwrap_err();
        assert!(matches!(err, HarborError::DuplicateResource(name) if name == "pg"));
    }

    #[tokio::test]
    async fn transform_sees_latest_snapshot() {
        let notifications = InProcResourceNotifications::default();
        let id = notifications
            .register(container("pgadmin"), ResourceSnapshot::new("Container"))
            .unwrap();

        notifications
            .publish_update(&id, snapshot_transform(|s| s.with_state("Starting")))
            .await
            .unwrap();
        notifications
            .publish_update(&id, snapshot_transform(|s| s.with_property("image", "dpage/pgadmin4")))
            .await
            .unwrap();

        let snapshot = notifications.snapshot(&id).unwrap();
        assert_eq!(snapshot.state(), Some("Starting"));
        assert_eq!(snapshot.properties()[0].value, "dpage/pgadmin4");
        assert_eq!(notifications.resource_id("pgadmin"), Some(id));
    }
}
