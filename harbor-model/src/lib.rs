//! Core data model definitions shared across Harbor crates.
#![allow(missing_docs)]

pub mod endpoint;
pub mod error;
pub mod events;
pub mod ids;
pub mod resource;
pub mod snapshot;
pub mod state;

pub use endpoint::EndpointSpec;
pub use error::{ModelError, Result as ModelResult};
pub use events::ResourceEvent;
pub use ids::ResourceId;
pub use resource::{Resource, ResourceKind, validate_resource_name};
pub use snapshot::{ResourcePropertySnapshot, ResourceSnapshot, UrlSnapshot};
pub use state::{ProvisioningState, STATE_NOT_STARTED, STATE_RUNNING};
