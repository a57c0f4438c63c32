//! # devsim-engine::graph
//!
//! The hierarchical coupled-model structure and the connection table used for
//! routing. Models are nodes of a stable directed graph; each edge is one
//! coupling, labelled with its source and destination port. Stable indices
//! matter: the executive deletes models mid-run and the survivors must keep
//! their identity.
//!
//! Couplings only ever link members of one coupled scope: two siblings, a
//! coupled model to one of its children (input boundary), or a child to its
//! coupled parent (output boundary). Routing from an atomic output port
//! follows matching edges, descending or ascending through coupled
//! boundaries until it lands on atomic input ports.

use devsim_types::{
    errors::KernelError,
    id::{ModelId, SimulatorId},
};
use fxhash::{FxHashMap, FxHashSet};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelKind {
    Atomic { dynamics: String },
    Coupled,
}

#[derive(Debug)]
pub struct ModelNode {
    pub id: ModelId,
    pub name: String,
    /// Full dotted path from the root, e.g. `root.sub.gen`.
    pub path: String,
    pub kind: ModelKind,
    pub parent: Option<ModelId>,
    pub children: Vec<ModelId>,
    pub input_ports: Vec<String>,
    pub output_ports: Vec<String>,
}

impl ModelNode {
    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, ModelKind::Atomic { .. })
    }
}

/// One coupling: `src_port` on the edge's source feeds `dst_port` on its
/// target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupling {
    pub src_port: String,
    pub dst_port: String,
}

pub struct ModelGraph {
    graph: StableDiGraph<ModelNode, Coupling>,
    index: FxHashMap<ModelId, NodeIndex>,
    by_path: FxHashMap<String, ModelId>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            index: FxHashMap::default(),
            by_path: FxHashMap::default(),
        }
    }

    fn node_index(&self, id: ModelId) -> Result<NodeIndex, KernelError> {
        self.index.get(&id).copied().ok_or(KernelError::UnknownModel {
            model: format!("#{}", id),
        })
    }

    pub fn node(&self, id: ModelId) -> Result<&ModelNode, KernelError> {
        let idx = self.node_index(id)?;
        Ok(&self.graph[idx])
    }

    fn node_mut(&mut self, id: ModelId) -> Result<&mut ModelNode, KernelError> {
        let idx = self.node_index(id)?;
        Ok(&mut self.graph[idx])
    }

    pub fn resolve(&self, path: &str) -> Result<ModelId, KernelError> {
        self.by_path
            .get(path)
            .copied()
            .ok_or_else(|| KernelError::UnknownModel {
                model: path.to_string(),
            })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn path(&self, id: ModelId) -> Result<&str, KernelError> {
        Ok(&self.node(id)?.path)
    }

    /// All atomic model ids, in ascending id order.
    pub fn atomics(&self) -> Vec<SimulatorId> {
        let mut ids: Vec<SimulatorId> = self
            .graph
            .node_weights()
            .filter(|n| n.is_atomic())
            .map(|n| n.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn insert_node(&mut self, mut node: ModelNode) -> Result<(), KernelError> {
        node.path = match node.parent {
            Some(parent) => format!("{}.{}", self.node(parent)?.path, node.name),
            None => node.name.clone(),
        };
        if self.by_path.contains_key(&node.path) {
            return Err(KernelError::DuplicateModel {
                name: node.path.clone(),
            });
        }
        if let Some(parent) = node.parent {
            let parent_node = self.node(parent)?;
            if parent_node.is_atomic() {
                return Err(KernelError::ScopeMismatch {
                    src: parent_node.path.clone(),
                    dst: node.path.clone(),
                });
            }
        }
        let id = node.id;
        let path = node.path.clone();
        let parent = node.parent;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        self.by_path.insert(path, id);
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(id);
        }
        Ok(())
    }

    pub fn insert_coupled(
        &mut self,
        id: ModelId,
        parent: Option<ModelId>,
        name: &str,
    ) -> Result<(), KernelError> {
        self.insert_node(ModelNode {
            id,
            name: name.to_string(),
            path: String::new(),
            kind: ModelKind::Coupled,
            parent,
            children: Vec::new(),
            input_ports: Vec::new(),
            output_ports: Vec::new(),
        })
    }

    pub fn insert_atomic(
        &mut self,
        id: ModelId,
        parent: ModelId,
        name: &str,
        dynamics: &str,
        input_ports: Vec<String>,
        output_ports: Vec<String>,
    ) -> Result<(), KernelError> {
        self.insert_node(ModelNode {
            id,
            name: name.to_string(),
            path: String::new(),
            kind: ModelKind::Atomic {
                dynamics: dynamics.to_string(),
            },
            parent: Some(parent),
            children: Vec::new(),
            input_ports,
            output_ports,
        })
    }

    pub fn add_port(&mut self, id: ModelId, port: &str, input: bool) -> Result<(), KernelError> {
        let node = self.node_mut(id)?;
        let ports = if input {
            &mut node.input_ports
        } else {
            &mut node.output_ports
        };
        if ports.iter().any(|p| p == port) {
            return Err(KernelError::DuplicatePort {
                model: node.path.clone(),
                port: port.to_string(),
            });
        }
        ports.push(port.to_string());
        Ok(())
    }

    /// Removes a port and every coupling attached to it.
    pub fn remove_port(&mut self, id: ModelId, port: &str, input: bool) -> Result<(), KernelError> {
        let idx = self.node_index(id)?;
        {
            let node = &mut self.graph[idx];
            let ports = if input {
                &mut node.input_ports
            } else {
                &mut node.output_ports
            };
            let position = ports.iter().position(|p| p == port).ok_or_else(|| {
                KernelError::UnknownPort {
                    model: node.path.clone(),
                    port: port.to_string(),
                }
            })?;
            ports.remove(position);
        }
        // An input port receives on incoming edges and feeds children on
        // outgoing ones (coupled boundary); symmetrically for output ports.
        let stale: Vec<_> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().src_port == port)
            .map(|e| e.id())
            .chain(
                self.graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .filter(|e| e.weight().dst_port == port)
                    .map(|e| e.id()),
            )
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
        Ok(())
    }

    fn has_port(node: &ModelNode, port: &str, input: bool) -> bool {
        let ports = if input {
            &node.input_ports
        } else {
            &node.output_ports
        };
        ports.iter().any(|p| p == port)
    }

    /// Validates a coupling against its scope: the endpoints must be
    /// siblings, or parent and child across the matching boundary, and the
    /// named ports must exist on the correct side.
    fn check_coupling(
        &self,
        src: ModelId,
        src_port: &str,
        dst: ModelId,
        dst_port: &str,
    ) -> Result<(), KernelError> {
        let src_node = self.node(src)?;
        let dst_node = self.node(dst)?;
        if src == dst {
            return Err(KernelError::SelfLoop {
                model: src_node.path.clone(),
                port: src_port.to_string(),
            });
        }
        let (src_is_input, dst_is_output) = if src_node.parent == dst_node.parent {
            (false, false)
        } else if Some(src) == dst_node.parent {
            (true, false)
        } else if Some(dst) == src_node.parent {
            (false, true)
        } else {
            return Err(KernelError::ScopeMismatch {
                src: src_node.path.clone(),
                dst: dst_node.path.clone(),
            });
        };
        if !Self::has_port(src_node, src_port, src_is_input) {
            return Err(KernelError::UnknownPort {
                model: src_node.path.clone(),
                port: src_port.to_string(),
            });
        }
        if !Self::has_port(dst_node, dst_port, !dst_is_output) {
            return Err(KernelError::UnknownPort {
                model: dst_node.path.clone(),
                port: dst_port.to_string(),
            });
        }
        Ok(())
    }

    pub fn has_connection(
        &self,
        src: ModelId,
        src_port: &str,
        dst: ModelId,
        dst_port: &str,
    ) -> bool {
        let (Ok(src_idx), Ok(dst_idx)) = (self.node_index(src), self.node_index(dst)) else {
            return false;
        };
        self.graph.edges_connecting(src_idx, dst_idx).any(|e| {
            let w = e.weight();
            w.src_port == src_port && w.dst_port == dst_port
        })
    }

    pub fn connect(
        &mut self,
        src: ModelId,
        src_port: &str,
        dst: ModelId,
        dst_port: &str,
    ) -> Result<(), KernelError> {
        self.check_coupling(src, src_port, dst, dst_port)?;
        if self.has_connection(src, src_port, dst, dst_port) {
            return Err(KernelError::DuplicateConnection {
                src: self.node(src)?.path.clone(),
                src_port: src_port.to_string(),
                dst: self.node(dst)?.path.clone(),
                dst_port: dst_port.to_string(),
            });
        }
        let src_idx = self.node_index(src)?;
        let dst_idx = self.node_index(dst)?;
        self.graph.add_edge(
            src_idx,
            dst_idx,
            Coupling {
                src_port: src_port.to_string(),
                dst_port: dst_port.to_string(),
            },
        );
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        src: ModelId,
        src_port: &str,
        dst: ModelId,
        dst_port: &str,
    ) -> Result<(), KernelError> {
        let src_idx = self.node_index(src)?;
        let dst_idx = self.node_index(dst)?;
        let edge = self
            .graph
            .edges_connecting(src_idx, dst_idx)
            .find(|e| {
                let w = e.weight();
                w.src_port == src_port && w.dst_port == dst_port
            })
            .map(|e| e.id());
        match edge {
            Some(edge) => {
                self.graph.remove_edge(edge);
                Ok(())
            }
            None => Err(KernelError::UnknownConnection {
                src: self.node(src)?.path.clone(),
                src_port: src_port.to_string(),
                dst: self.node(dst)?.path.clone(),
                dst_port: dst_port.to_string(),
            }),
        }
    }

    /// Resolves the atomic destinations of an output event on
    /// `(source, port)`. Walks the coupling edges, passing through coupled
    /// boundaries; a visited set guards against boundary cycles. Routing back
    /// to the source is a model error.
    pub fn route(
        &self,
        source: SimulatorId,
        port: &str,
    ) -> Result<Vec<(SimulatorId, String)>, KernelError> {
        let source_node = self.node(source)?;
        if !Self::has_port(source_node, port, false) {
            return Err(KernelError::UnknownPort {
                model: source_node.path.clone(),
                port: port.to_string(),
            });
        }

        let mut targets = Vec::new();
        let mut visited: FxHashSet<(ModelId, String)> = FxHashSet::default();
        let mut pending: Vec<(ModelId, String)> = vec![(source, port.to_string())];
        visited.insert((source, port.to_string()));

        while let Some((id, port)) = pending.pop() {
            let idx = self.node_index(id)?;
            for edge in self.graph.edges(idx) {
                let coupling = edge.weight();
                if coupling.src_port != port {
                    continue;
                }
                let next = &self.graph[edge.target()];
                if next.is_atomic() {
                    if next.id == source {
                        return Err(KernelError::SelfLoop {
                            model: next.path.clone(),
                            port: coupling.dst_port.clone(),
                        });
                    }
                    targets.push((next.id, coupling.dst_port.clone()));
                } else if visited.insert((next.id, coupling.dst_port.clone())) {
                    pending.push((next.id, coupling.dst_port.clone()));
                }
            }
        }
        // Depth-first discovery order depends on the stack; normalise so a
        // rerun and an equivalent rebuild deliver in the same order.
        targets.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(targets)
    }

    /// Removes a model and its whole subtree. Adjacent couplings disappear
    /// with the nodes. Returns the ids of every removed atomic, so the caller
    /// can purge simulators, pending events and subscriptions.
    pub fn remove_model(&mut self, id: ModelId) -> Result<Vec<SimulatorId>, KernelError> {
        let node = self.node(id)?;
        let parent = node.parent;
        let mut subtree = vec![id];
        let mut cursor = 0;
        while cursor < subtree.len() {
            let current = subtree[cursor];
            subtree.extend(self.node(current)?.children.iter().copied());
            cursor += 1;
        }

        let mut removed_atomics = Vec::new();
        for &member in &subtree {
            let idx = self.node_index(member)?;
            let node = self
                .graph
                .remove_node(idx)
                .expect("indexed node missing from graph");
            if node.is_atomic() {
                removed_atomics.push(node.id);
            }
            self.index.remove(&member);
            self.by_path.remove(&node.path);
        }
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|&c| c != id);
        }
        removed_atomics.sort_unstable();
        Ok(removed_atomics)
    }
}

impl Default for ModelGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root { gen -> sub { relay } -> sink }, with sub passing its input
    /// straight to its output through the relay.
    fn hierarchy() -> (ModelGraph, ModelId, ModelId, ModelId) {
        let mut g = ModelGraph::new();
        g.insert_coupled(0, None, "root").unwrap();
        g.insert_atomic(1, 0, "gen", "generator", vec![], vec!["out".into()])
            .unwrap();
        g.insert_coupled(2, Some(0), "sub").unwrap();
        g.add_port(2, "in", true).unwrap();
        g.add_port(2, "out", false).unwrap();
        g.insert_atomic(
            3,
            2,
            "relay",
            "relay",
            vec!["in".into()],
            vec!["out".into()],
        )
        .unwrap();
        g.insert_atomic(4, 0, "sink", "counter", vec!["in".into()], vec![])
            .unwrap();

        g.connect(1, "out", 2, "in").unwrap();
        g.connect(2, "in", 3, "in").unwrap();
        g.connect(3, "out", 2, "out").unwrap();
        g.connect(2, "out", 4, "in").unwrap();
        (g, 1, 3, 4)
    }

    #[test]
    fn routes_into_and_out_of_coupled_scopes() {
        let (g, gen, relay, sink) = hierarchy();
        assert_eq!(g.route(gen, "out").unwrap(), vec![(relay, "in".to_string())]);
        assert_eq!(
            g.route(relay, "out").unwrap(),
            vec![(sink, "in".to_string())]
        );
    }

    #[test]
    fn rejects_connection_across_scopes() {
        let (mut g, gen, _, _) = hierarchy();
        // gen (child of root) cannot couple directly to relay (child of sub).
        assert!(matches!(
            g.connect(gen, "out", 3, "in"),
            Err(KernelError::ScopeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_missing_port_and_self_loop() {
        let (mut g, gen, _, sink) = hierarchy();
        assert!(matches!(
            g.connect(gen, "nope", sink, "in"),
            Err(KernelError::UnknownPort { .. })
        ));
        assert!(matches!(
            g.connect(gen, "out", gen, "out"),
            Err(KernelError::SelfLoop { .. })
        ));
    }

    #[test]
    fn connect_then_disconnect_restores_graph() {
        let (mut g, _, relay, sink) = hierarchy();
        g.disconnect(2, "out", sink, "in").unwrap();
        assert!(g.route(relay, "out").unwrap().is_empty());
        assert!(!g.has_connection(2, "out", sink, "in"));
        g.connect(2, "out", sink, "in").unwrap();
        assert_eq!(
            g.route(relay, "out").unwrap(),
            vec![(sink, "in".to_string())]
        );
    }

    #[test]
    fn remove_model_drops_subtree_and_connections() {
        let (mut g, gen, _, _) = hierarchy();
        let removed = g.remove_model(2).unwrap();
        assert_eq!(removed, vec![3]);
        assert!(!g.contains("root.sub"));
        assert!(!g.contains("root.sub.relay"));
        assert!(g.route(gen, "out").unwrap().is_empty());
    }

    #[test]
    fn remove_port_drops_attached_couplings() {
        let (mut g, gen, _, _) = hierarchy();
        g.remove_port(gen, "out", false).unwrap();
        assert!(matches!(
            g.route(gen, "out"),
            Err(KernelError::UnknownPort { .. })
        ));
        assert!(!g.has_connection(gen, "out", 2, "in"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let (mut g, _, _, _) = hierarchy();
        assert!(matches!(
            g.insert_atomic(9, 0, "gen", "generator", vec![], vec![]),
            Err(KernelError::DuplicateModel { .. })
        ));
    }
}
