//! gcp-nuke: removes every deletable resource from a cloud project
//!
//! Resource adapters register a lister and a client provider per resource
//! type. A run resolves the types in scope, lists and filters their
//! instances into a queue, and then retries removal pass after pass until
//! everything is gone, filtered out, or the run gives up.

pub mod cli;
pub mod config;
pub mod error;
pub mod nuke;
pub mod prompt;
pub mod resource;

pub use config::NukeConfig;
pub use error::{FailedItem, NukeError};
pub use nuke::{Nuke, NukeParameters};
pub use resource::{Project, ResourceRegistry};
