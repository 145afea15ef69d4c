//! Declared dependency graph and cycle-tolerant loading order

use std::collections::{HashMap, HashSet};

/// Directed graph from an asset id to the ids it depends on
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    edges: HashMap<String, Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dependencies of `id` (duplicates and self-edges dropped)
    pub fn set(&mut self, id: &str, deps: &[String]) {
        let mut seen = HashSet::new();
        let deps: Vec<String> = deps
            .iter()
            .filter(|d| d.as_str() != id && seen.insert(d.as_str()))
            .cloned()
            .collect();

        if deps.is_empty() {
            self.edges.remove(id);
        } else {
            self.edges.insert(id.to_string(), deps);
        }
    }

    pub fn get(&self, id: &str) -> Vec<String> {
        self.edges.get(id).cloned().unwrap_or_default()
    }

    pub fn remove(&mut self, id: &str) {
        self.edges.remove(id);
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Order `ids` so dependencies come before their dependents.
    ///
    /// Depth-first with visiting/visited marks. A back-edge (an edge into a
    /// node still being visited) is a cycle: it is logged and skipped, so the
    /// node is emitted as soon as its other dependencies are. Dependencies
    /// outside `ids` are walked for ordering but not emitted. The result is
    /// a permutation of the de-duplicated input.
    pub fn optimize_loading_order(&self, ids: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(wanted.len());

        for root in ids {
            if marks.contains_key(root.as_str()) {
                continue;
            }

            // (node, index of the next dependency to visit)
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            marks.insert(root.as_str(), Mark::Visiting);

            while let Some((node, next)) = stack.last_mut() {
                let deps = self.edges.get(*node).map(Vec::as_slice).unwrap_or(&[]);
                if let Some(dep) = deps.get(*next) {
                    *next += 1;
                    match marks.get(dep.as_str()) {
                        None => {
                            marks.insert(dep.as_str(), Mark::Visiting);
                            stack.push((dep.as_str(), 0));
                        }
                        Some(Mark::Visiting) => {
                            log::warn!("Dependency cycle detected: {node} -> {dep}, edge ignored");
                        }
                        Some(Mark::Visited) => {}
                    }
                } else {
                    let done = *node;
                    stack.pop();
                    marks.insert(done, Mark::Visited);
                    if wanted.contains(done) {
                        order.push(done.to_string());
                    }
                }
            }
        }

        order
    }

    /// Dependencies of `id`, transitively, in loading order, `id` excluded
    pub fn loading_order_for(&self, id: &str) -> Vec<String> {
        let mut closure = Vec::new();
        let mut seen = HashSet::from([id.to_string()]);
        let mut frontier = self.get(id);
        while let Some(dep) = frontier.pop() {
            if seen.insert(dep.clone()) {
                frontier.extend(self.get(&dep));
                closure.push(dep);
            }
        }

        // Ordering over the closure plus the root, then drop the root
        closure.push(id.to_string());
        let mut order = self.optimize_loading_order(&closure);
        order.retain(|d| d != id);
        order
    }

    /// Dependencies of `ids` reachable within `depth` levels, `ids` excluded
    pub fn expand(&self, ids: &[String], depth: usize) -> Vec<String> {
        let mut seen: HashSet<String> = ids.iter().cloned().collect();
        let mut level: Vec<String> = ids.to_vec();
        let mut out = Vec::new();
        for _ in 0..depth {
            let mut next = Vec::new();
            for id in &level {
                for dep in self.get(id) {
                    if seen.insert(dep.clone()) {
                        out.push(dep.clone());
                        next.push(dep);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            level = next;
        }
        out
    }
}
