//! Partial-order index over registered signatures.
//!
//! The index stores every registered [`Signature`] as a node of the Hasse
//! diagram of the signature order: an edge `p -> c` exists exactly when
//! `c < p` and no registered signature lies strictly between them. The root
//! is always [`Signature::Any`], which carries the optional fallback entry.
//!
//! # Tree vs. lattice
//!
//! A signature can have several incomparable direct supersignatures, e.g.
//! `(A, A)` sits below both `(A, int)` and `(int, A)` when `A <: int`. The
//! index is therefore a DAG: nodes live in an arena and edges are
//! [`NodeId`]s, so a shared node is owned once and referenced from each of
//! its parents. Registration never fails because of multiple parents; this
//! is what lets a more specific method resolve an ambiguity between two
//! incomparable ones.
//!
//! # Algorithm Overview
//!
//! - **Resolve**: walk down from the root, following every child that is
//!   still applicable (`sig <= child`). Nodes with no applicable child are
//!   the maximally specific candidates. One candidate wins; several are an
//!   ambiguity.
//! - **Insert**: the new node's parents are the candidates a resolve of the
//!   new signature would return; its children are the maximal registered
//!   signatures strictly below it. Edges from those parents to those
//!   children become transitive and are dropped.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::signature::{Signature, TypeOrder};
use crate::types::TypeUniverse;

/// Identifier of a node in an [`OrderedIndex`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The `Any` root.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Failures of index operations. Callers attach the function name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("signature {0} is already registered")]
    DuplicateSignature(Signature),

    #[error("signature {0} is not registered")]
    NotFound(Signature),

    #[error("ambiguous signatures {}: none is more specific", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Ambiguous(Vec<Signature>),

    #[error("no implementation matches and no fallback is registered")]
    NoImplementation,
}

#[derive(Debug, Clone)]
struct Node<E> {
    signature: Signature,
    entry: Option<E>,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

/// The partial-order index. `E` is whatever is attached to a signature.
#[derive(Debug, Clone)]
pub struct OrderedIndex<E> {
    nodes: Vec<Node<E>>,
    by_signature: FxHashMap<Signature, NodeId>,
}

impl<E> Default for OrderedIndex<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> OrderedIndex<E> {
    /// An index holding only the `Any` root, without a fallback entry.
    pub fn new() -> Self {
        let mut by_signature = FxHashMap::default();
        by_signature.insert(Signature::Any, NodeId::ROOT);
        Self {
            nodes: vec![Node {
                signature: Signature::Any,
                entry: None,
                parents: Vec::new(),
                children: Vec::new(),
            }],
            by_signature,
        }
    }

    /// Insert a signature with its entry.
    ///
    /// Inserting `Any` sets the fallback entry on the root; it can be set
    /// only once.
    pub fn insert<O>(&mut self, signature: Signature, entry: E, order: &O) -> Result<NodeId, IndexError>
    where
        O: TypeOrder + ?Sized,
    {
        if signature.is_any() {
            let root = &mut self.nodes[NodeId::ROOT.index()];
            if root.entry.is_some() {
                return Err(IndexError::DuplicateSignature(signature));
            }
            root.entry = Some(entry);
            return Ok(NodeId::ROOT);
        }
        if self.by_signature.contains_key(&signature) {
            return Err(IndexError::DuplicateSignature(signature));
        }

        let parents = self.frontier(&signature, order);

        let below: Vec<NodeId> = self
            .node_ids()
            .skip(1)
            .filter(|&id| order.is_subsignature(&self.nodes[id.index()].signature, &signature))
            .collect();
        let children: Vec<NodeId> = below
            .iter()
            .copied()
            .filter(|&c| {
                !below.iter().any(|&d| {
                    d != c
                        && order.is_subsignature(
                            &self.nodes[c.index()].signature,
                            &self.nodes[d.index()].signature,
                        )
                })
            })
            .collect();

        let id = NodeId(self.nodes.len() as u32);
        for &p in &parents {
            let node = &mut self.nodes[p.index()];
            node.children.retain(|c| !children.contains(c));
            node.children.push(id);
        }
        for &c in &children {
            let node = &mut self.nodes[c.index()];
            node.parents.retain(|p| !parents.contains(p));
            node.parents.push(id);
        }

        self.by_signature.insert(signature.clone(), id);
        self.nodes.push(Node {
            signature,
            entry: Some(entry),
            parents,
            children,
        });
        Ok(id)
    }

    /// Exact lookup.
    pub fn lookup(&self, signature: &Signature) -> Result<&E, IndexError> {
        self.get(signature)
            .ok_or_else(|| IndexError::NotFound(signature.clone()))
    }

    /// Exact lookup returning `None` when absent.
    pub fn get(&self, signature: &Signature) -> Option<&E> {
        let id = self.by_signature.get(signature)?;
        self.nodes[id.index()].entry.as_ref()
    }

    /// Whether `signature` has an entry (for `Any`: whether a fallback is set).
    pub fn contains(&self, signature: &Signature) -> bool {
        self.get(signature).is_some()
    }

    /// Best matching registered signature for `signature`.
    pub fn resolve<O>(&self, signature: &Signature, order: &O) -> Result<(&Signature, &E), IndexError>
    where
        O: TypeOrder + ?Sized,
    {
        let candidates = self.frontier(signature, order);
        match candidates.as_slice() {
            [id] => {
                let node = &self.nodes[id.index()];
                match &node.entry {
                    Some(entry) => Ok((&node.signature, entry)),
                    None => Err(IndexError::NoImplementation),
                }
            }
            _ => Err(IndexError::Ambiguous(
                candidates
                    .iter()
                    .map(|id| self.nodes[id.index()].signature.clone())
                    .collect(),
            )),
        }
    }

    /// All registered signatures `<= signature`, in insertion order.
    pub fn descendants_of<O>(&self, signature: &Signature, order: &O) -> Vec<&Signature>
    where
        O: TypeOrder + ?Sized,
    {
        self.nodes
            .iter()
            .filter(|node| node.entry.is_some())
            .map(|node| &node.signature)
            .filter(|sig| order.is_subsignature(sig, signature))
            .collect()
    }

    /// Direct supersignatures of a registered signature.
    pub fn parents_of(&self, signature: &Signature) -> Option<Vec<&Signature>> {
        let id = self.by_signature.get(signature)?;
        Some(self.signatures_at(&self.nodes[id.index()].parents))
    }

    /// Direct subsignatures of a registered signature (or of the root).
    pub fn children_of(&self, signature: &Signature) -> Option<Vec<&Signature>> {
        let id = self.by_signature.get(signature)?;
        Some(self.signatures_at(&self.nodes[id.index()].children))
    }

    /// Registered signatures with their entries, in insertion order. The
    /// root appears first when a fallback is set.
    pub fn iter(&self) -> impl Iterator<Item = (&Signature, &E)> {
        self.nodes
            .iter()
            .filter_map(|node| node.entry.as_ref().map(|entry| (&node.signature, entry)))
    }

    /// Registered signatures, in insertion order.
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.iter().map(|(sig, _)| sig)
    }

    /// Number of registered signatures, the fallback included.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the root carries a fallback entry.
    pub fn has_fallback(&self) -> bool {
        self.nodes[NodeId::ROOT.index()].entry.is_some()
    }

    /// Render the index as an indented outline. Nodes reachable through
    /// more than one parent are expanded once and marked `(shared)` after.
    pub fn pretty(&self, name: &str, universe: &TypeUniverse) -> String {
        let mut out = String::new();
        let mut seen = FxHashSet::default();
        self.pretty_node(NodeId::ROOT, 0, name, universe, &mut seen, &mut out);
        out
    }

    fn pretty_node(
        &self,
        id: NodeId,
        depth: usize,
        name: &str,
        universe: &TypeUniverse,
        seen: &mut FxHashSet<NodeId>,
        out: &mut String,
    ) {
        let node = &self.nodes[id.index()];
        let _ = write!(out, "{:indent$}{}", "", node.signature.display(name, universe), indent = depth * 4);
        if id == NodeId::ROOT && node.entry.is_none() {
            out.push_str(" [no fallback]");
        }
        if !seen.insert(id) {
            out.push_str(" (shared)\n");
            return;
        }
        out.push('\n');
        for &child in &node.children {
            self.pretty_node(child, depth + 1, name, universe, seen, out);
        }
    }

    /// Minimal nodes `>= signature` (all strictly above it when it is not
    /// registered), ordered by insertion.
    fn frontier<O>(&self, signature: &Signature, order: &O) -> Vec<NodeId>
    where
        O: TypeOrder + ?Sized,
    {
        let mut visited = FxHashSet::default();
        visited.insert(NodeId::ROOT);
        let mut stack = vec![NodeId::ROOT];
        let mut minimal = Vec::new();

        while let Some(id) = stack.pop() {
            let mut descended = false;
            for &child in &self.nodes[id.index()].children {
                if order.is_subsignature(signature, &self.nodes[child.index()].signature) {
                    descended = true;
                    if visited.insert(child) {
                        stack.push(child);
                    }
                }
            }
            if !descended {
                minimal.push(id);
            }
        }

        minimal.sort();
        minimal
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    fn signatures_at(&self, ids: &[NodeId]) -> Vec<&Signature> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.iter().map(|id| &self.nodes[id.index()].signature).collect()
    }
}
