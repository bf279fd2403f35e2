//! Operator-facing report lines
//!
//! Every item is printed as `<project> - <type> - <identity> - <properties> - <status>`;
//! missing identity or properties are left out. Diagnostics go through
//! `tracing`, this module only writes the streaming report to stdout.

use super::queue::{Item, ItemState, Queue};
use std::io::IsTerminal;

const RESET: &str = "\x1b[0m";

/// Status text for the item's current state
pub fn status(item: &Item) -> String {
    match item.state() {
        ItemState::New => "would remove".to_string(),
        ItemState::Pending => "triggered remove".to_string(),
        ItemState::Waiting => "waiting".to_string(),
        ItemState::Failed => format!("failed - ERROR: {}", item.reason()),
        ItemState::Filtered => item.reason().to_string(),
        ItemState::Finished => "removed".to_string(),
    }
}

fn color(state: ItemState) -> &'static str {
    match state {
        ItemState::New => "\x1b[1m",
        ItemState::Pending | ItemState::Waiting => "\x1b[34m",
        ItemState::Failed => "\x1b[31m",
        ItemState::Filtered => "\x1b[33m",
        ItemState::Finished => "\x1b[32m",
    }
}

/// The report line for `item`
pub fn item_line(item: &Item, colored: bool) -> String {
    let mut parts = vec![item.project().name().to_string(), item.resource_type().to_string()];
    let identity = item.identity();
    if !identity.is_empty() {
        parts.push(identity);
    }
    if let Some(properties) = item.properties().filter(|p| !p.is_empty()) {
        parts.push(properties.to_string());
    }

    let status = status(item);
    if colored {
        parts.push(format!("{}{status}{RESET}", color(item.state())));
    } else {
        parts.push(status);
    }
    parts.join(" - ")
}

pub fn scan_summary(queue: &Queue) -> String {
    format!(
        "Scan complete: {} total, {} nukeable, {} filtered.",
        queue.count_total(),
        queue.count(&[ItemState::New]),
        queue.count(&[ItemState::Filtered]),
    )
}

pub fn pass_summary(queue: &Queue) -> String {
    format!(
        "Removal requested: {} waiting, {} failed, {} skipped, {} finished",
        queue.count(&[ItemState::Waiting, ItemState::Pending]),
        queue.count(&[ItemState::Failed]),
        queue.count(&[ItemState::Filtered]),
        queue.count(&[ItemState::Finished]),
    )
}

pub fn final_summary(queue: &Queue) -> String {
    format!(
        "Nuke complete: {} failed, {} skipped, {} finished.",
        queue.count(&[ItemState::Failed]),
        queue.count(&[ItemState::Filtered]),
        queue.count(&[ItemState::Finished]),
    )
}

/// Prints the streaming report
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    quiet: bool,
    colored: bool,
}

impl Reporter {
    /// Colours are used when stdout is a terminal
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            colored: std::io::stdout().is_terminal(),
        }
    }

    pub fn plain(quiet: bool) -> Self {
        Self {
            quiet,
            colored: false,
        }
    }

    /// Print one item unless it is Filtered and the reporter is quiet
    pub fn item(&self, item: &Item) {
        if self.quiet && item.state() == ItemState::Filtered {
            return;
        }
        println!("{}", item_line(item, self.colored));
    }

    pub fn line(&self, line: &str) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        Capabilities, ClientHandle, Credentials, MockClientProvider, MockLister, Project,
        Resource, ResourceType,
    };
    use anyhow::Result;
    use async_trait::async_trait;
    use gcp_nuke_common::Properties;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Network;

    #[async_trait]
    impl Resource for Network {
        async fn remove(&mut self, _: &Project, _: Option<&ClientHandle>) -> Result<()> {
            Ok(())
        }

        fn legacy_identity(&self) -> String {
            "default".to_string()
        }

        fn properties(&self) -> Properties {
            Properties::new().set("Name", "default").set_tag("env", "dev")
        }
    }

    fn item(caps: Capabilities) -> Item {
        let resource_type =
            ResourceType::new("Network", MockClientProvider::new(), MockLister::new())
                .with_capabilities(caps);
        Item::new(
            Box::new(Network),
            Arc::new(resource_type),
            Arc::new(Project::new(Credentials {
                keyfile: None,
                project: "dev".to_string(),
            })),
        )
    }

    #[test]
    fn test_item_line() {
        let mut item = item(Capabilities::none().with_legacy_identity().with_properties());
        assert_eq!(
            item_line(&item, false),
            r#"dev - Network - default - [Name: "default", tag:env: "dev"] - would remove"#
        );

        item.fail("resource in use");
        assert_eq!(
            item_line(&item, false),
            r#"dev - Network - default - [Name: "default", tag:env: "dev"] - failed - ERROR: resource in use"#
        );
    }

    #[test]
    fn test_item_line_without_identity() {
        let mut item = item(Capabilities::none());
        item.filter("filtered by config");
        assert_eq!(item_line(&item, false), "dev - Network - filtered by config");
        assert!(item_line(&item, true).contains("\x1b[33mfiltered by config\x1b[0m"));
    }

    #[test]
    fn test_summaries() {
        let mut queue = Queue::new();
        for _ in 0..4 {
            queue.push(item(Capabilities::none()));
        }
        let mut items = queue.iter_mut();
        items.next().unwrap().filter("protected");
        items.next().unwrap().set_state(ItemState::Waiting);
        items.next().unwrap().set_state(ItemState::Finished);

        assert_eq!(
            scan_summary(&queue),
            "Scan complete: 4 total, 1 nukeable, 1 filtered."
        );
        assert_eq!(
            pass_summary(&queue),
            "Removal requested: 1 waiting, 0 failed, 1 skipped, 1 finished"
        );
        assert_eq!(
            final_summary(&queue),
            "Nuke complete: 0 failed, 1 skipped, 1 finished."
        );
    }
}
