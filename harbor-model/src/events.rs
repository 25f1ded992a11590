use std::sync::Arc;

use crate::{ids::ResourceId, resource::Resource, snapshot::ResourceSnapshot};

/// Change notification for a single resource.
#[derive(Debug, Clone)]
pub struct ResourceEvent {
    pub resource_id: ResourceId,
    pub resource: Arc<Resource>,
    pub snapshot: ResourceSnapshot,
}

impl ResourceEvent {
    pub fn new(
        resource_id: ResourceId,
        resource: Arc<Resource>,
        snapshot: ResourceSnapshot,
    ) -> Self {
        Self {
            resource_id,
            resource,
            snapshot,
        }
    }
}
