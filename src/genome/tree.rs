//! Rooted ordered trees.
//!
//! Children are owned by their parent node. Parent links are never stored
//! in the nodes; they live in a flattened pre-order index of [`NodeRecord`]s
//! computed by [`TreeGenome::process_nodes`]. The index is not kept in sync
//! automatically: after any structural edit call `process_nodes` again
//! before using node indices.

use super::{Genome, GenomeBase};
use crate::error::{EvolveError, Result};
use crate::random::{self, EvoRng};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A node owning its ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<T> {
    pub data: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    pub fn leaf(data: T) -> Self {
        Self {
            data,
            children: Vec::new(),
        }
    }

    pub fn with_children(data: T, children: Vec<TreeNode<T>>) -> Self {
        Self { data, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Height of the subtree rooted here (a leaf has height 0).
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in the subtree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Pre-order iterator over the subtree.
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder { stack: vec![self] }
    }
}

/// Pre-order traversal.
pub struct PreOrder<'a, T> {
    stack: Vec<&'a TreeNode<T>>,
}

impl<'a, T> Iterator for PreOrder<'a, T> {
    type Item = &'a TreeNode<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Pre-order traversal over mutable node data. Shapes cannot change
/// through it, so the node index stays valid.
pub struct DataMut<'a, T> {
    stack: Vec<&'a mut TreeNode<T>>,
}

impl<'a, T> Iterator for DataMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let TreeNode { data, children } = node;
        self.stack.extend(children.iter_mut().rev());
        Some(data)
    }
}

/// Position of a node in the flattened pre-order index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    /// Index of the parent node; `None` for the root.
    pub parent: Option<usize>,
    /// Position among the parent's children.
    pub slot: usize,
    /// Distance from the root.
    pub depth: usize,
    /// Height of the subtree rooted at this node.
    pub height: usize,
}

/// Tree construction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeMethod {
    /// Child counts drawn from `[0, |max_siblings|]`: irregular shapes.
    #[default]
    Grow,
    /// Every internal node below the depth limit has children: all leaves
    /// sit exactly at the depth limit.
    Full,
    /// Ramped half-and-half: random depth in `[min(2, max_depth), max_depth]`
    /// and a fair coin between Grow and Full.
    Ramped,
}

impl TreeMethod {
    /// Reads the `method` genome parameter (default Grow).
    pub fn from_params(params: &super::Params) -> Result<Self> {
        match params.text(super::params::METHOD)? {
            Some(s) => s.parse(),
            None => Ok(TreeMethod::Grow),
        }
    }

    /// Resolves Ramped into a concrete method and depth limit.
    pub fn resolve(self, max_depth: usize, rng: &mut EvoRng) -> (TreeMethod, usize) {
        match self {
            TreeMethod::Ramped => {
                let depth = rng.random_range(max_depth.min(2)..=max_depth);
                let method = if random::flip_coin(rng, 0.5) {
                    TreeMethod::Grow
                } else {
                    TreeMethod::Full
                };
                (method, depth)
            }
            other => (other, max_depth),
        }
    }
}

impl FromStr for TreeMethod {
    type Err = EvolveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "grow" => Ok(TreeMethod::Grow),
            "full" => Ok(TreeMethod::Full),
            "ramped" => Ok(TreeMethod::Ramped),
            other => Err(EvolveError::config(format!("unknown tree method '{other}'"))),
        }
    }
}

impl fmt::Display for TreeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TreeMethod::Grow => "grow",
            TreeMethod::Full => "full",
            TreeMethod::Ramped => "ramped",
        };
        f.write_str(s)
    }
}

/// Builds a random tree rooted at `depth`.
///
/// `value` produces the data of each node. A node at `max_depth` is always
/// a leaf. Below that, Grow draws the child count from
/// `[0, |max_siblings|]` and Full from `[1, max_siblings]` (or exactly
/// `|max_siblings|` when it is negative). Ramped is resolved first.
///
/// # Errors
/// Returns [`EvolveError::Configuration`] for Full with `max_siblings == 0`.
pub fn build_tree<T, F>(
    depth: usize,
    value: &mut F,
    max_siblings: i64,
    max_depth: usize,
    method: TreeMethod,
    rng: &mut EvoRng,
) -> Result<TreeNode<T>>
where
    F: FnMut(&mut EvoRng) -> T,
{
    let (method, max_depth) = method.resolve(max_depth, rng);
    if method == TreeMethod::Full && max_siblings == 0 {
        return Err(EvolveError::config(
            "full tree construction needs a non-zero max_siblings",
        ));
    }
    Ok(grow_node(depth, value, max_siblings, max_depth, method, rng))
}

fn grow_node<T, F>(
    depth: usize,
    value: &mut F,
    max_siblings: i64,
    max_depth: usize,
    method: TreeMethod,
    rng: &mut EvoRng,
) -> TreeNode<T>
where
    F: FnMut(&mut EvoRng) -> T,
{
    let data = value(rng);
    if depth >= max_depth {
        return TreeNode::leaf(data);
    }

    let limit = max_siblings.unsigned_abs() as usize;
    let n_children = match method {
        TreeMethod::Full if max_siblings < 0 => limit,
        TreeMethod::Full => rng.random_range(1..=limit),
        _ => rng.random_range(0..=limit),
    };

    let children = (0..n_children)
        .map(|_| grow_node(depth + 1, value, max_siblings, max_depth, method, rng))
        .collect();
    TreeNode::with_children(data, children)
}

/// A genome holding one rooted tree and its flattened node index.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: serde::de::DeserializeOwned"
))]
pub struct TreeGenome<T> {
    base: GenomeBase<TreeGenome<T>>,
    root: Option<TreeNode<T>>,
    #[serde(skip)]
    nodes: Vec<NodeRecord>,
    #[serde(skip)]
    processed: bool,
}

impl<T> Default for TreeGenome<T> {
    fn default() -> Self {
        Self {
            base: GenomeBase::default(),
            root: None,
            nodes: Vec::new(),
            processed: false,
        }
    }
}

impl<T> TreeGenome<T> {
    /// An empty tree with no operators.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_root(root: TreeNode<T>) -> Self {
        let mut t = Self::new();
        t.set_root(root);
        t
    }

    pub fn root(&self) -> Option<&TreeNode<T>> {
        self.root.as_ref()
    }

    /// Mutable access to the root. Invalidates the node index.
    pub fn root_mut(&mut self) -> Option<&mut TreeNode<T>> {
        self.processed = false;
        self.root.as_mut()
    }

    /// Replaces the whole tree and reprocesses the index.
    pub fn set_root(&mut self, root: TreeNode<T>) {
        self.root = Some(root);
        self.process_nodes();
    }

    pub fn take_root(&mut self) -> Option<TreeNode<T>> {
        self.nodes.clear();
        self.processed = false;
        self.root.take()
    }

    /// Recomputes the flattened pre-order index (parents, depths, heights).
    pub fn process_nodes(&mut self) {
        self.nodes.clear();
        if let Some(root) = &self.root {
            let mut stack: Vec<(&TreeNode<T>, Option<usize>, usize, usize)> =
                vec![(root, None, 0, 0)];
            while let Some((node, parent, slot, depth)) = stack.pop() {
                let idx = self.nodes.len();
                self.nodes.push(NodeRecord {
                    parent,
                    slot,
                    depth,
                    height: 0,
                });
                for (i, child) in node.children.iter().enumerate().rev() {
                    stack.push((child, Some(idx), i, depth + 1));
                }
            }
            // children always follow their parent in pre-order
            for i in (1..self.nodes.len()).rev() {
                if let Some(p) = self.nodes[i].parent {
                    let h = self.nodes[i].height + 1;
                    if h > self.nodes[p].height {
                        self.nodes[p].height = h;
                    }
                }
            }
        }
        self.processed = true;
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Processes the index only if it is stale.
    pub fn ensure_processed(&mut self) {
        if !self.processed {
            self.process_nodes();
        }
    }

    /// The flattened index as of the last [`process_nodes`](Self::process_nodes).
    pub fn records(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn record(&self, index: usize) -> Option<&NodeRecord> {
        self.nodes.get(index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Height of the whole tree (0 for a single node or an empty tree).
    pub fn height(&self) -> usize {
        self.nodes.first().map_or(0, |r| r.height)
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|r| r.parent)
    }

    pub fn depth_of(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).map(|r| r.depth)
    }

    pub fn height_of(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).map(|r| r.height)
    }

    /// Child slots leading from the root to `index`.
    fn path_to(&self, index: usize) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut cur = self.nodes.get(index)?;
        while let Some(p) = cur.parent {
            path.push(cur.slot);
            cur = &self.nodes[p];
        }
        path.reverse();
        Some(path)
    }

    pub fn node(&self, index: usize) -> Option<&TreeNode<T>> {
        let path = self.path_to(index)?;
        let mut node = self.root.as_ref()?;
        for slot in path {
            node = node.children.get(slot)?;
        }
        Some(node)
    }

    /// Mutable access by index. Structural edits through the returned node
    /// leave the index stale until the next `process_nodes`.
    pub fn node_mut(&mut self, index: usize) -> Option<&mut TreeNode<T>> {
        let path = self.path_to(index)?;
        let mut node = self.root.as_mut()?;
        for slot in path {
            node = node.children.get_mut(slot)?;
        }
        Some(node)
    }

    /// A uniformly random node index, optionally excluding the root.
    pub fn random_node(&self, rng: &mut EvoRng, include_root: bool) -> Option<usize> {
        let start = usize::from(!include_root);
        if self.nodes.len() <= start {
            return None;
        }
        Some(rng.random_range(start..self.nodes.len()))
    }

    /// Replaces the subtree at `index` and returns the old one.
    ///
    /// Index 0 replaces the root. The node index is not reprocessed, so
    /// several edits can be batched before one `process_nodes`.
    ///
    /// # Errors
    /// Returns [`EvolveError::InvalidOperation`] for an unknown index.
    pub fn replace_subtree(&mut self, index: usize, subtree: TreeNode<T>) -> Result<TreeNode<T>> {
        let node = self
            .node_mut(index)
            .ok_or_else(|| EvolveError::invalid(format!("no tree node at index {index}")))?;
        let old = std::mem::replace(node, subtree);
        self.processed = false;
        Ok(old)
    }

    /// Pre-order iterator over all nodes.
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder {
            stack: self.root.iter().collect(),
        }
    }

    /// Pre-order iterator over mutable node data.
    pub fn data_mut(&mut self) -> DataMut<'_, T> {
        DataMut {
            stack: self.root.iter_mut().collect(),
        }
    }
}

impl<T: Clone> TreeNode<T> {
    pub fn add_child(&mut self, child: TreeNode<T>) {
        self.children.push(child);
    }
}

impl<T: Clone> TreeGenome<T> {
    /// Exchanges the data of two nodes, keeping both shapes.
    ///
    /// # Errors
    /// Returns [`EvolveError::InvalidOperation`] for an unknown index.
    pub fn swap_node_data(&mut self, a: usize, b: usize) -> Result<()> {
        let missing = || EvolveError::invalid("no tree node at the given index");
        let da = self.node(a).ok_or_else(missing)?.data.clone();
        let db = self.node(b).ok_or_else(missing)?.data.clone();
        self.node_mut(a).ok_or_else(missing)?.data = db;
        self.node_mut(b).ok_or_else(missing)?.data = da;
        Ok(())
    }
}

impl<T: PartialEq> PartialEq for TreeGenome<T> {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl<T> Genome for TreeGenome<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn base(&self) -> &GenomeBase<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GenomeBase<Self> {
        &mut self.base
    }

    fn rebuild(&mut self) {
        self.process_nodes();
    }
}

impl TreeGenome<i64> {
    /// Integer tree with grow initialization (`max_depth` must be set as a
    /// parameter before initializing), swap mutation and strict crossover.
    pub fn integer() -> Self {
        use crate::operators::{IntegerInitializator, SwapMutator, TreeStrictCrossover};
        let mut t = Self::new();
        t.set_initializator(IntegerInitializator);
        t.set_mutator(SwapMutator);
        t.set_crossover(TreeStrictCrossover::default());
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use proptest::prelude::*;

    fn sample() -> TreeGenome<i64> {
        //      1
        //    /   \
        //   2     5
        //  / \
        // 3   4
        TreeGenome::from_root(TreeNode::with_children(
            1,
            vec![
                TreeNode::with_children(2, vec![TreeNode::leaf(3), TreeNode::leaf(4)]),
                TreeNode::leaf(5),
            ],
        ))
    }

    fn leaf_depths<T>(node: &TreeNode<T>, depth: usize, out: &mut Vec<usize>) {
        if node.is_leaf() {
            out.push(depth);
        }
        for c in &node.children {
            leaf_depths(c, depth + 1, out);
        }
    }

    // ---- Node index ----

    #[test]
    fn test_process_nodes_preorder() {
        let t = sample();
        assert!(t.is_processed());
        assert_eq!(t.node_count(), 5);
        assert_eq!(t.height(), 2);
        let data: Vec<i64> = t.iter().map(|n| n.data).collect();
        assert_eq!(data, vec![1, 2, 3, 4, 5]);
        for (i, d) in data.iter().enumerate() {
            assert_eq!(t.node(i).unwrap().data, *d);
        }
        assert_eq!(t.parent_of(0), None);
        assert_eq!(t.parent_of(3), Some(1));
        assert_eq!(t.parent_of(4), Some(0));
        assert_eq!(t.depth_of(2), Some(2));
        assert_eq!(t.height_of(1), Some(1));
        assert_eq!(t.height_of(4), Some(0));
    }

    #[test]
    fn test_parent_lists_child_exactly_once() {
        let t = sample();
        for (i, rec) in t.records().iter().enumerate().skip(1) {
            let parent = t.node(rec.parent.unwrap()).unwrap();
            let hits = parent
                .children
                .iter()
                .filter(|c| std::ptr::eq(*c, t.node(i).unwrap()))
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn test_empty_tree() {
        let mut t: TreeGenome<i64> = TreeGenome::new();
        t.process_nodes();
        assert_eq!(t.node_count(), 0);
        assert_eq!(t.height(), 0);
        assert!(t.node(0).is_none());
        let mut rng = create_rng(42);
        assert!(t.random_node(&mut rng, true).is_none());
    }

    #[test]
    fn test_random_node_excludes_root() {
        let t = sample();
        let mut rng = create_rng(42);
        for _ in 0..200 {
            let i = t.random_node(&mut rng, false).unwrap();
            assert!((1..5).contains(&i));
        }
        let single = TreeGenome::from_root(TreeNode::leaf(7));
        assert!(single.random_node(&mut rng, false).is_none());
        assert_eq!(single.random_node(&mut rng, true), Some(0));
    }

    // ---- Structural edits ----

    #[test]
    fn test_replace_subtree() {
        let mut t = sample();
        let old = t.replace_subtree(1, TreeNode::leaf(9)).unwrap();
        assert_eq!(old.node_count(), 3);
        assert!(!t.is_processed());
        t.process_nodes();
        assert_eq!(t.node_count(), 3);
        assert_eq!(t.height(), 1);
        let data: Vec<i64> = t.iter().map(|n| n.data).collect();
        assert_eq!(data, vec![1, 9, 5]);
    }

    #[test]
    fn test_replace_root() {
        let mut t = sample();
        t.replace_subtree(0, TreeNode::leaf(0)).unwrap();
        t.process_nodes();
        assert_eq!(t.node_count(), 1);
        assert!(t.replace_subtree(3, TreeNode::leaf(1)).is_err());
    }

    #[test]
    fn test_swap_node_data() {
        let mut t = sample();
        t.swap_node_data(0, 4).unwrap();
        assert_eq!(t.node(0).unwrap().data, 5);
        assert_eq!(t.node(4).unwrap().data, 1);
        assert_eq!(t.node_count(), 5);
    }

    #[test]
    fn test_data_mut_keeps_index() {
        let mut t = sample();
        for v in t.data_mut() {
            *v *= 10;
        }
        assert!(t.is_processed());
        let data: Vec<i64> = t.iter().map(|n| n.data).collect();
        assert_eq!(data, vec![10, 20, 30, 40, 50]);
    }

    // ---- Construction ----

    #[test]
    fn test_method_parse() {
        assert_eq!("Full".parse::<TreeMethod>().unwrap(), TreeMethod::Full);
        assert_eq!("ramped".parse::<TreeMethod>().unwrap(), TreeMethod::Ramped);
        assert!("bushy".parse::<TreeMethod>().is_err());
    }

    #[test]
    fn test_full_with_zero_siblings_is_config_error() {
        let mut rng = create_rng(42);
        let res = build_tree(0, &mut |_: &mut EvoRng| 0i64, 0, 3, TreeMethod::Full, &mut rng);
        assert!(matches!(res, Err(EvolveError::Configuration(_))));
    }

    #[test]
    fn test_full_negative_siblings_is_exact() {
        let mut rng = create_rng(42);
        let root = build_tree(0, &mut |_: &mut EvoRng| 0i64, -3, 2, TreeMethod::Full, &mut rng).unwrap();
        assert_eq!(root.node_count(), 1 + 3 + 9);
    }

    #[test]
    fn test_ramped_depth_range() {
        let mut rng = create_rng(42);
        for _ in 0..100 {
            let (method, depth) = TreeMethod::Ramped.resolve(5, &mut rng);
            assert!(method != TreeMethod::Ramped);
            assert!((2..=5).contains(&depth));
        }
        let (_, depth) = TreeMethod::Ramped.resolve(1, &mut rng);
        assert_eq!(depth, 1);
    }

    #[test]
    fn test_serde_then_rebuild() {
        let mut t = sample();
        t.set_score(2.5);
        let json = serde_json::to_string(&t).unwrap();
        let mut back: TreeGenome<i64> = serde_json::from_str(&json).unwrap();
        assert!(!back.is_processed());
        back.rebuild();
        assert_eq!(back, t);
        assert_eq!(back.records(), t.records());
        assert_eq!(back.score(), 2.5);
    }

    proptest! {
        #[test]
        fn prop_full_leaves_at_exact_depth(seed in 0u64..500, depth in 0usize..5, sib in 1i64..4) {
            let mut rng = create_rng(seed);
            let root = build_tree(0, &mut |_: &mut EvoRng| 0u8, sib, depth, TreeMethod::Full, &mut rng).unwrap();
            let mut depths = Vec::new();
            leaf_depths(&root, 0, &mut depths);
            prop_assert!(depths.iter().all(|&d| d == depth));
        }

        #[test]
        fn prop_grow_leaves_within_depth(seed in 0u64..500, depth in 0usize..6, sib in 0i64..4) {
            let mut rng = create_rng(seed);
            let root = build_tree(0, &mut |_: &mut EvoRng| 0u8, sib, depth, TreeMethod::Grow, &mut rng).unwrap();
            let mut depths = Vec::new();
            leaf_depths(&root, 0, &mut depths);
            prop_assert!(depths.iter().all(|&d| d <= depth));
            prop_assert!(root.height() <= depth);
        }
    }
}
