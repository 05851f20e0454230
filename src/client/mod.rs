//! Metadata lookup client module.

pub mod api;
pub mod models;

pub use api::{lookup, ItunesClient, MetadataLookup};
pub use models::{LookupOutcome, TrackMetadata};
