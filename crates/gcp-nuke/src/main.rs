//! gcp-nuke binary without any bundled adapters
//!
//! Adapter crates provide their own binary that registers them and calls
//! [`gcp_nuke::cli::main`].

use gcp_nuke::ResourceRegistry;

#[tokio::main]
async fn main() {
    gcp_nuke::cli::main(ResourceRegistry::default()).await;
}
