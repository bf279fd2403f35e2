//! gcp-nuke-common - Shared value types
//!
//! Types shared between the nuke engine and resource adapters, kept free of
//! any provider SDK or async runtime dependency.
//!
//! ## Modules
//!
//! - [`collection`]: Set of resource-type names used for target/exclude lists
//! - [`defaults`]: Default run parameters and engine constants
//! - [`properties`]: Key/value description of a discovered resource

pub mod collection;
pub mod defaults;
pub mod properties;

pub use collection::Collection;
pub use properties::Properties;
