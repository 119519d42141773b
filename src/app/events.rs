use tracing::{info, warn};

use repo_atlas::graph::normalize_parts;
use repo_atlas::highlight::{HighlightState, HoverEmphasis, PathTrace};
use repo_atlas::scene::SceneEvents;

use super::ViewModel;
use super::hydrate::HydrationResult;
use super::trace::shortest_path;

impl SceneEvents for ViewModel {
    fn select_node(&mut self, id: &str, navigate: bool) {
        self.set_selected(Some(id.to_owned()));
        if navigate {
            self.center_on(id);
        }
    }

    fn hover_node(&mut self, id: Option<&str>) {
        if self.hover.hovered() == id {
            return;
        }
        self.hover = match id {
            Some(id) => HoverEmphasis::for_node(&self.graph, id),
            None => HoverEmphasis::none(),
        };
        self.render_dirty = true;
    }

    fn toggle_expansion(&mut self, id: &str) {
        match self.expansion.begin_toggle(&self.graph, id) {
            Ok(heading) => {
                self.hydration.request(&self.graph, id, heading);
                self.render_dirty = true;
            }
            Err(error) => warn!(%error, "expansion toggle rejected"),
        }
    }

    fn select_file(&mut self, path: &str) {
        info!(path, "drill into file");
        self.drilled_path = Some(path.to_owned());
        if self.graph.contains(path) {
            self.set_selected(Some(path.to_owned()));
        }
    }
}

impl ViewModel {
    pub(super) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        self.render_dirty = true;
    }

    pub(super) fn set_trace(&mut self, trace: Option<PathTrace>) {
        self.highlight = HighlightState::from_trace(trace.as_ref());
        self.trace = trace;
        self.render_dirty = true;
    }

    /// Traces from the current selection to `target`.
    pub(super) fn trace_to(&mut self, target: &str) {
        let Some(source) = self.selected.clone() else {
            return;
        };
        let trace = shortest_path(&self.graph, &source, target);
        if trace.is_none() {
            info!(%source, to = target, "no path between nodes");
        }
        self.set_trace(trace);
    }

    pub(super) fn toggle_focus(&mut self, id: &str) {
        if !self.focus.remove(id) {
            self.focus.insert(id);
        }
        self.render_dirty = true;
    }

    /// Merges finished hydration results into the graph and completes the
    /// matching expansion transitions.
    pub(super) fn apply_hydration(&mut self) {
        let results = self.hydration.poll();
        if results.is_empty() {
            return;
        }

        for HydrationResult {
            container,
            heading,
            members,
        } in results
        {
            if self.expansion.complete(&container).is_none() {
                info!(%container, ?heading, "stale hydration result ignored");
                continue;
            }
            if members.is_empty() {
                continue;
            }

            let mut nodes = self.graph.nodes().to_vec();
            for member in members {
                if let Some(existing) = nodes.iter_mut().find(|node| node.id == member.id) {
                    *existing = member;
                }
            }
            self.graph = normalize_parts(nodes, self.graph.edges().to_vec());
            self.graph_revision += 1;
        }
        self.expansion.retain_valid(&self.graph);
        self.render_dirty = true;
    }
}
