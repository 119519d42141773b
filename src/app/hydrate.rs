//! Stand-in for the hydration collaborator: loads a container's members on a
//! background thread and reports them back through a channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use repo_atlas::expansion::ExpansionPhase;
use repo_atlas::graph::{GraphData, Node};

const FETCH_LATENCY: Duration = Duration::from_millis(220);

pub(super) struct HydrationResult {
    pub(super) container: String,
    pub(super) heading: ExpansionPhase,
    /// Member records with their content loaded; empty when collapsing.
    pub(super) members: Vec<Node>,
}

pub(super) struct HydrationWorker {
    tx: Sender<HydrationResult>,
    rx: Receiver<HydrationResult>,
    in_flight: usize,
}

impl HydrationWorker {
    pub(super) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub(super) fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub(super) fn request(&mut self, graph: &GraphData, container: &str, heading: ExpansionPhase) {
        let members: Vec<Node> = if heading == ExpansionPhase::Expanded {
            graph
                .nodes()
                .iter()
                .filter(|node| {
                    node.container.as_deref().or(node.parent_file.as_deref()) == Some(container)
                })
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        debug!(container, ?heading, members = members.len(), "hydration requested");
        let tx = self.tx.clone();
        let container = container.to_owned();
        self.in_flight += 1;
        thread::spawn(move || {
            thread::sleep(FETCH_LATENCY);
            let members = members
                .into_iter()
                .map(|mut node| {
                    node.hydrated = true;
                    node
                })
                .collect();
            let _ = tx.send(HydrationResult {
                container,
                heading,
                members,
            });
        });
    }

    /// Results that arrived since the last poll.
    pub(super) fn poll(&mut self) -> Vec<HydrationResult> {
        let results: Vec<HydrationResult> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(results.len());
        for result in &results {
            info!(
                container = %result.container,
                heading = ?result.heading,
                members = result.members.len(),
                "hydration finished"
            );
        }
        results
    }
}
