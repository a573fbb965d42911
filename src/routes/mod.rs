mod health;
mod metadata;

pub use health::health_routes;
pub use metadata::{metadata_routes, MetadataState};
