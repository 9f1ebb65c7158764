//! Intermediate representation for modules.
//!
//! A module is a tree of operations:
//! - **Operations** (`Operation`) carry a kind, attributes, and ordered regions
//! - **Regions** (`Region`) hold an ordered list of nested operation ids
//!
//! Operations live in a `StableGraph` arena. A petgraph edge runs from each
//! operation to every operation nested directly inside it, so ids stay valid
//! while passes mutate the module and parent lookups are a single edge hop.

use crate::types::{AttributeValue, OpKind};
use crate::{Error, Result};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{Dfs, EdgeRef, IntoEdgeReferences};
use petgraph::Direction;

use std::collections::{HashMap, HashSet};

/// Type alias for operation identifiers (backed by petgraph NodeIndex).
pub type OpId = NodeIndex;

/// Control value returned by `Module::walk_mut` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkResult {
    /// Continue with the next operation.
    Advance,

    /// Stop the walk; no further operations are visited.
    Interrupt,
}

// ──────────────────────────────── Module ─────────────────────────────────

/// A module: the root `builtin.module` operation and everything nested in it.
pub struct Module {
    /// Operation arena. Edge weight is the index of the parent region that
    /// holds the child.
    graph: StableGraph<Operation, usize>,

    /// The `builtin.module` operation.
    root: OpId,
}

impl Module {
    /// Create an empty module with a single-region root operation.
    pub fn new() -> Self {
        let mut graph = StableGraph::new();
        let mut root_op = Operation::new(OpKind::Module);
        root_op.regions.push(Region::default());
        let root = graph.add_node(root_op);
        Self { graph, root }
    }

    /// The root `builtin.module` operation.
    pub fn root(&self) -> OpId {
        self.root
    }

    // ── Operation access ──

    /// Get an immutable reference to an operation.
    pub fn op(&self, id: OpId) -> Result<&Operation> {
        self.graph
            .node_weight(id)
            .ok_or_else(|| Error::InvalidModule(format!("Operation {:?} not found", id)))
    }

    /// Get a mutable reference to an operation.
    pub fn op_mut(&mut self, id: OpId) -> Result<&mut Operation> {
        self.graph
            .node_weight_mut(id)
            .ok_or_else(|| Error::InvalidModule(format!("Operation {:?} not found", id)))
    }

    /// Get the operation that directly contains `id`, or `None` for the root.
    pub fn parent(&self, id: OpId) -> Option<OpId> {
        self.graph.neighbors_directed(id, Direction::Incoming).next()
    }

    /// Get the operations in region `region` of `parent`, in order.
    pub fn ops_in(&self, parent: OpId, region: usize) -> Result<&[OpId]> {
        let op = self.op(parent)?;
        op.regions
            .get(region)
            .map(|r| r.ops.as_slice())
            .ok_or_else(|| {
                Error::InvalidModule(format!(
                    "Operation '{}' has no region {}",
                    op.kind, region
                ))
            })
    }

    /// Get the operations at the top level of the module body.
    pub fn body(&self) -> &[OpId] {
        self.graph
            .node_weight(self.root)
            .and_then(|op| op.regions.first())
            .map(|r| r.ops.as_slice())
            .unwrap_or(&[])
    }

    /// Get the number of operations, including the root.
    pub fn op_count(&self) -> usize {
        self.graph.node_count()
    }

    // ── Module mutation ──

    /// Append a new empty region to an operation and return its index.
    pub fn add_region(&mut self, id: OpId) -> Result<usize> {
        let op = self.op_mut(id)?;
        op.regions.push(Region::default());
        Ok(op.regions.len() - 1)
    }

    /// Append `op` to the end of region `region` of `parent`.
    ///
    /// `op` must not carry regions of its own; nested structure is built with
    /// `add_region` and further `add_op` calls.
    pub fn add_op(&mut self, parent: OpId, region: usize, op: Operation) -> Result<OpId> {
        if !op.regions.is_empty() {
            return Err(Error::InvalidModule(format!(
                "Operation '{}' already has {} region(s); add regions through the module",
                op.kind,
                op.regions.len()
            )));
        }

        let parent_op = self.op(parent)?;
        if region >= parent_op.regions.len() {
            return Err(Error::InvalidModule(format!(
                "Operation '{}' has no region {}",
                parent_op.kind, region
            )));
        }

        let id = self.graph.add_node(op);
        self.graph.add_edge(parent, id, region);
        self.op_mut(parent)?.regions[region].ops.push(id);
        Ok(id)
    }

    /// Append `op` to the top level of the module body.
    pub fn push(&mut self, op: Operation) -> Result<OpId> {
        self.add_op(self.root, 0, op)
    }

    // ── Traversal ──

    /// Get every operation in post-order.
    ///
    /// Nested operations come before the operation that contains them;
    /// regions and the operations inside them are visited in order. The root
    /// is last. Each operation is visited at most once.
    pub fn walk(&self) -> Vec<OpId> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut seen = HashSet::with_capacity(self.graph.node_count());
        // (op, children already expanded)
        let mut stack = vec![(self.root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }

            let Some(op) = self.graph.node_weight(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }

            stack.push((id, true));
            for region in op.regions.iter().rev() {
                for &child in region.ops.iter().rev() {
                    stack.push((child, false));
                }
            }
        }

        order
    }

    /// Visit every operation mutably, in `walk()` order.
    ///
    /// The callback may edit the operation it is handed but cannot restructure
    /// the module. Returns `WalkResult::Interrupt` if the walk was stopped
    /// early, `WalkResult::Advance` otherwise.
    pub fn walk_mut<F>(&mut self, mut f: F) -> Result<WalkResult>
    where
        F: FnMut(OpId, &mut Operation) -> Result<WalkResult>,
    {
        for id in self.walk() {
            let op = self.op_mut(id)?;
            if f(id, op)? == WalkResult::Interrupt {
                return Ok(WalkResult::Interrupt);
            }
        }
        Ok(WalkResult::Advance)
    }

    // ── Validation ──

    /// Check the structural invariants of the module.
    ///
    /// Every operation listed in a region must exist and have exactly one
    /// containing edge that matches the listing, and every operation must be
    /// reachable from the root.
    pub fn verify(&self) -> Result<()> {
        let mut listed: HashMap<OpId, (OpId, usize)> = HashMap::new();

        for parent in self.graph.node_indices() {
            let op = &self.graph[parent];
            for (region_index, region) in op.regions.iter().enumerate() {
                for &child in &region.ops {
                    if self.graph.node_weight(child).is_none() {
                        return Err(Error::Verification(format!(
                            "Region {} of '{}' references missing operation {:?}",
                            region_index, op.kind, child
                        )));
                    }
                    if listed.insert(child, (parent, region_index)).is_some() {
                        return Err(Error::Verification(format!(
                            "Operation {:?} is listed in more than one region",
                            child
                        )));
                    }
                }
            }
        }

        let mut incoming: HashMap<OpId, Vec<(OpId, usize)>> = HashMap::new();
        for edge in self.graph.edge_references() {
            incoming
                .entry(edge.target())
                .or_default()
                .push((edge.source(), *edge.weight()));
        }

        for id in self.graph.node_indices() {
            let edges = incoming.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            let expected = listed.get(&id).copied();
            match (edges, expected) {
                ([], None) if id == self.root => {}
                ([edge], Some(listing)) if *edge == listing => {}
                _ => {
                    return Err(Error::Verification(format!(
                        "Operation {:?} ('{}') has inconsistent nesting",
                        id, self.graph[id].kind
                    )));
                }
            }
        }

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, self.root);
        while let Some(id) = dfs.next(&self.graph) {
            reachable.insert(id);
        }
        if reachable.len() != self.graph.node_count() {
            return Err(Error::Verification(format!(
                "{} operation(s) are unreachable from the module root",
                self.graph.node_count() - reachable.len()
            )));
        }

        Ok(())
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────────────────── Region ─────────────────────────────────

/// An ordered list of operations nested inside a parent operation.
#[derive(Debug, Clone, Default)]
pub struct Region {
    /// Nested operation ids, in program order.
    ops: Vec<OpId>,
}

impl Region {
    /// Get the nested operation ids, in program order.
    pub fn ops(&self) -> &[OpId] {
        &self.ops
    }
}

// ─────────────────────────────── Operation ───────────────────────────────

/// A single operation in the module.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Operation kind.
    pub kind: OpKind,

    /// Debug name (may be empty).
    pub name: String,

    /// Discardable attributes (e.g. `_replication_info`, `device`).
    pub attributes: HashMap<String, AttributeValue>,

    /// Nested regions. Only `Module` edits these, so region listings always
    /// agree with the arena's containment edges.
    regions: Vec<Region>,
}

impl Operation {
    /// Create a new operation with no attributes and no regions.
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            name: String::new(),
            attributes: HashMap::new(),
            regions: Vec::new(),
        }
    }

    /// Create a new operation with a debug name.
    pub fn named(kind: OpKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(kind)
        }
    }

    /// Builder-style attribute setter for constructing operations.
    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Get the nested regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Get the operation kind.
    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    /// Whether this operation declares replication metadata.
    pub fn is_metadata_declaration(&self) -> bool {
        self.kind.is_metadata_declaration()
    }

    /// Set an attribute, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is empty.
    pub fn set_attribute(&mut self, key: &str, value: AttributeValue) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Attribute(format!(
                "Empty attribute name on '{}'",
                self.kind
            )));
        }
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    /// Get an attribute.
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Check if an attribute exists.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> Operation {
        Operation::named(OpKind::from_name("tf.Identity"), name)
    }

    #[test]
    fn test_create_empty_module() {
        let module = Module::new();
        assert_eq!(module.op_count(), 1);
        assert!(module.body().is_empty());
        assert_eq!(module.op(module.root()).unwrap().kind, OpKind::Module);
        assert_eq!(module.walk(), vec![module.root()]);
        module.verify().unwrap();
    }

    #[test]
    fn test_add_op_and_parent() {
        let mut module = Module::new();
        let func = module.push(Operation::new(OpKind::Func)).unwrap();
        let region = module.add_region(func).unwrap();
        let inner = module.add_op(func, region, identity("x")).unwrap();

        assert_eq!(module.op_count(), 3);
        assert_eq!(module.body(), &[func]);
        assert_eq!(module.ops_in(func, 0).unwrap(), &[inner]);
        assert_eq!(module.parent(inner), Some(func));
        assert_eq!(module.parent(func), Some(module.root()));
        assert_eq!(module.parent(module.root()), None);
        module.verify().unwrap();
    }

    #[test]
    fn test_add_op_to_missing_region_fails() {
        let mut module = Module::new();
        let func = module.push(Operation::new(OpKind::Func)).unwrap();

        let err = module.add_op(func, 0, identity("x")).unwrap_err();
        assert!(matches!(err, Error::InvalidModule(_)));
        assert_eq!(module.op_count(), 2);
    }

    #[test]
    fn test_walk_is_post_order() {
        let mut module = Module::new();
        let a = module.push(identity("a")).unwrap();
        let cluster = module.push(Operation::new(OpKind::Cluster)).unwrap();
        module.add_region(cluster).unwrap();
        let b = module.add_op(cluster, 0, identity("b")).unwrap();
        let c = module.add_op(cluster, 0, identity("c")).unwrap();
        let d = module.push(identity("d")).unwrap();

        assert_eq!(module.walk(), vec![a, b, c, cluster, d, module.root()]);
    }

    #[test]
    fn test_walk_visits_multiple_regions_in_order() {
        let mut module = Module::new();
        let replicate = module.push(Operation::new(OpKind::Replicate)).unwrap();
        let first = module.add_region(replicate).unwrap();
        let second = module.add_region(replicate).unwrap();
        let y = module.add_op(replicate, second, identity("y")).unwrap();
        let x = module.add_op(replicate, first, identity("x")).unwrap();

        assert_eq!(module.walk(), vec![x, y, replicate, module.root()]);
    }

    #[test]
    fn test_walk_mut_interrupt() {
        let mut module = Module::new();
        module.push(identity("a")).unwrap();
        module.push(identity("b")).unwrap();

        let mut visited = Vec::new();
        let result = module
            .walk_mut(|_, op| {
                visited.push(op.name.clone());
                Ok(WalkResult::Interrupt)
            })
            .unwrap();

        assert_eq!(result, WalkResult::Interrupt);
        assert_eq!(visited, vec!["a".to_string()]);
    }

    #[test]
    fn test_walk_mut_propagates_errors() {
        let mut module = Module::new();
        let a = module.push(identity("a")).unwrap();
        let b = module.push(identity("b")).unwrap();

        let err = module
            .walk_mut(|id, op| {
                if id == b {
                    op.set_attribute("", AttributeValue::Unit)?;
                }
                op.set_attribute("seen", AttributeValue::Bool(true))?;
                Ok(WalkResult::Advance)
            })
            .unwrap_err();

        assert!(matches!(err, Error::Attribute(_)));
        // Earlier edits are not rolled back.
        assert!(module.op(a).unwrap().has_attribute("seen"));
        assert!(!module.op(b).unwrap().has_attribute("seen"));
    }

    #[test]
    fn test_attribute_access() {
        let mut op = identity("x").with_attribute("device", "/job:worker");
        assert!(op.has_attribute("device"));

        op.set_attribute("device", AttributeValue::from("/job:tpu"))
            .unwrap();
        assert_eq!(
            op.get_attribute("device").and_then(AttributeValue::as_str),
            Some("/job:tpu")
        );

        assert_eq!(
            op.remove_attribute("device"),
            Some(AttributeValue::from("/job:tpu"))
        );
        assert_eq!(op.remove_attribute("device"), None);
        assert!(op.set_attribute("", AttributeValue::Unit).is_err());
    }

    #[test]
    fn test_verify_detects_dangling_region_entry() {
        let mut module = Module::new();
        let cluster = module.push(Operation::new(OpKind::Cluster)).unwrap();
        module.add_region(cluster).unwrap();
        module.op_mut(cluster).unwrap().regions[0].ops.push(NodeIndex::new(42));

        assert!(matches!(module.verify(), Err(Error::Verification(_))));
    }

    #[test]
    fn test_verify_detects_duplicate_listing() {
        let mut module = Module::new();
        let a = module.push(identity("a")).unwrap();
        let root = module.root();
        module.op_mut(root).unwrap().regions[0].ops.push(a);

        assert!(matches!(module.verify(), Err(Error::Verification(_))));
    }

    #[test]
    fn test_stable_ids_across_edits() {
        let mut module = Module::new();
        let a = module.push(identity("a")).unwrap();
        let b = module.push(identity("b")).unwrap();

        module
            .op_mut(a)
            .unwrap()
            .set_attribute("k", AttributeValue::Int(1))
            .unwrap();

        assert_eq!(module.op(b).unwrap().name, "b");
        assert_eq!(
            module.op(a).unwrap().get_attribute("k"),
            Some(&AttributeValue::Int(1))
        );
    }

    #[test]
    fn test_walk_terminates_on_region_listing_an_ancestor() {
        let mut module = Module::new();
        let cluster = module.push(Operation::new(OpKind::Cluster)).unwrap();
        module.add_region(cluster).unwrap();
        let inner = module.add_op(cluster, 0, identity("inner")).unwrap();
        let root = module.root();
        module.op_mut(cluster).unwrap().regions[0].ops.push(root);

        assert_eq!(module.walk(), vec![inner, cluster, root]);

        let mut visits = 0;
        module
            .walk_mut(|_, _| {
                visits += 1;
                Ok(WalkResult::Advance)
            })
            .unwrap();
        assert_eq!(visits, 3);
        assert!(matches!(module.verify(), Err(Error::Verification(_))));
    }

    #[test]
    fn test_add_op_rejects_operation_with_regions() {
        let mut module = Module::new();
        let cluster = module.push(Operation::new(OpKind::Cluster)).unwrap();
        module.add_region(cluster).unwrap();
        let inner = module.add_op(cluster, 0, identity("inner")).unwrap();

        // A copy of the cluster still lists `inner`; nesting it under `inner`
        // would make the cluster its own ancestor.
        let copy = module.op(cluster).unwrap().clone();
        let err = module.add_op(inner, 0, copy).unwrap_err();

        assert!(matches!(err, Error::InvalidModule(_)));
        assert_eq!(module.op_count(), 3);
        module.verify().unwrap();
    }
}
