// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod job_store;
pub mod target_collection;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use job_store::{ClaimRequest, JobStore};
pub use target_collection::TargetCollection;
pub use time_provider::TimeProvider;
