//! Shared test utilities for gcp-nuke
//!
//! ## Modules
//!
//! - [`fake`]: in-memory fake cloud with adapters of two distinct concrete kinds

pub mod fake;

// Re-export commonly used items
pub use fake::{
    Bucket, FakeClient, FakeCloud, FakeResource, FakeSpec, Instance, Protection, RemoveBehavior,
    all_capabilities, test_project,
};
