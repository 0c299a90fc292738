//! Dominator tree computation using the Lengauer-Tarjan algorithm.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n` must pass
//! through `d`. The **immediate dominator** of `n` is the unique strict dominator of `n`
//! that does not strictly dominate any other dominator of `n`.
//!
//! Structural analysis uses dominance to recognise back edges (an edge whose target
//! dominates its source) and to bound the node sets of loops and intervals.
//!
//! # Algorithm
//!
//! Lengauer-Tarjan with path compression, O(V α(V)). Nodes unreachable from the entry get
//! no immediate dominator and are dominated by nothing.

use crate::utils::graph::{NodeId, Successors};

const UNDEFINED: usize = usize::MAX;

/// Result of dominator tree computation.
///
/// # Examples
///
/// ```rust
/// use structflow::utils::graph::{algorithms::compute_dominators, AdjacencyGraph, NodeId};
///
/// // entry -> a -> b
/// let mut graph = AdjacencyGraph::new(3);
/// graph.add_edge(NodeId::new(0), NodeId::new(1));
/// graph.add_edge(NodeId::new(1), NodeId::new(2));
///
/// let dom_tree = compute_dominators(&graph, NodeId::new(0));
/// assert!(dom_tree.dominates(NodeId::new(0), NodeId::new(2)));
/// assert_eq!(dom_tree.immediate_dominator(NodeId::new(2)), Some(NodeId::new(1)));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) node of the dominator tree
    entry: NodeId,
    /// Immediate dominator index per node, `UNDEFINED` for unreachable nodes
    idom: Vec<usize>,
}

impl DominatorTree {
    /// Returns `true` if `node` is reachable from the entry.
    pub fn is_reachable(&self, node: NodeId) -> bool {
        node == self.entry || self.idom.get(node.index()).is_some_and(|&i| i != UNDEFINED)
    }

    /// Returns the immediate dominator of a node, or `None` for the entry node and for
    /// unreachable nodes.
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            return None;
        }
        match self.idom.get(node.index()) {
            Some(&idom) if idom != UNDEFINED => Some(NodeId::new(idom)),
            _ => None,
        }
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A reachable node dominates itself. Nothing dominates an unreachable node.
    ///
    /// # Complexity
    ///
    /// O(depth) where depth is the depth of `b` in the dominator tree.
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(b) {
            return false;
        }
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.immediate_dominator(current) {
                Some(idom) => current = idom,
                None => return false,
            }
        }
    }
}

/// Computes the dominator tree for the graph rooted at `entry`.
///
/// # Complexity
///
/// - Time: O(V α(V)) where α is the inverse Ackermann function
/// - Space: O(V + E)
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors,
{
    let node_count = graph.node_count();
    if node_count == 0 || entry.index() >= node_count {
        return DominatorTree {
            entry,
            idom: Vec::new(),
        };
    }

    let mut lt = LengauerTarjan::new(node_count);
    lt.compute(graph, entry.index());

    DominatorTree {
        entry,
        idom: lt.idom,
    }
}

/// Internal state for the Lengauer-Tarjan algorithm. All vectors are indexed by node
/// index; `semi` holds DFS numbers.
struct LengauerTarjan {
    dfnum: Vec<usize>,
    vertex: Vec<usize>,
    parent: Vec<usize>,
    semi: Vec<usize>,
    idom: Vec<usize>,
    ancestor: Vec<usize>,
    best: Vec<usize>,
    bucket: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
}

impl LengauerTarjan {
    fn new(n: usize) -> Self {
        Self {
            dfnum: vec![UNDEFINED; n],
            vertex: Vec::with_capacity(n),
            parent: vec![UNDEFINED; n],
            semi: vec![UNDEFINED; n],
            idom: vec![UNDEFINED; n],
            ancestor: vec![UNDEFINED; n],
            best: (0..n).collect(),
            bucket: vec![Vec::new(); n],
            preds: vec![Vec::new(); n],
        }
    }

    fn compute<G: Successors>(&mut self, graph: &G, entry: usize) {
        self.dfs(graph, entry);

        for i in (1..self.vertex.len()).rev() {
            let w = self.vertex[i];
            let parent_w = self.parent[w];

            let preds = std::mem::take(&mut self.preds[w]);
            for &v in &preds {
                if self.dfnum[v] == UNDEFINED {
                    continue;
                }
                let u = self.eval(v);
                if self.semi[u] < self.semi[w] {
                    self.semi[w] = self.semi[u];
                }
            }
            self.preds[w] = preds;

            let semi_vertex = self.vertex[self.semi[w]];
            self.bucket[semi_vertex].push(w);
            self.ancestor[w] = parent_w;

            for v in std::mem::take(&mut self.bucket[parent_w]) {
                let u = self.eval(v);
                self.idom[v] = if self.semi[u] == self.semi[v] {
                    parent_w
                } else {
                    u
                };
            }
        }

        for i in 1..self.vertex.len() {
            let w = self.vertex[i];
            if self.idom[w] != self.vertex[self.semi[w]] {
                self.idom[w] = self.idom[self.idom[w]];
            }
        }

        self.idom[entry] = UNDEFINED;
    }

    /// Iterative preorder numbering. Also records predecessor lists restricted to
    /// reachable sources.
    fn dfs<G: Successors>(&mut self, graph: &G, start: usize) {
        let mut stack = vec![(start, UNDEFINED)];
        while let Some((node, parent)) = stack.pop() {
            if self.dfnum[node] != UNDEFINED {
                continue;
            }
            self.dfnum[node] = self.vertex.len();
            self.semi[node] = self.vertex.len();
            self.vertex.push(node);
            self.parent[node] = parent;

            let succs: Vec<NodeId> = graph.successors(NodeId::new(node)).collect();
            for succ in succs.iter().rev() {
                let s = succ.index();
                self.preds[s].push(node);
                if self.dfnum[s] == UNDEFINED {
                    stack.push((s, node));
                }
            }
        }
    }

    /// Returns the vertex with the minimum semidominator on the forest path to `v`.
    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == UNDEFINED {
            return v;
        }
        self.compress(v);
        self.best[v]
    }

    /// Iterative path compression.
    fn compress(&mut self, v: usize) {
        let mut path = Vec::new();
        let mut current = v;
        while self.ancestor[current] != UNDEFINED && self.ancestor[self.ancestor[current]] != UNDEFINED {
            path.push(current);
            current = self.ancestor[current];
        }
        while let Some(node) = path.pop() {
            let anc = self.ancestor[node];
            if self.semi[self.best[anc]] < self.semi[self.best[node]] {
                self.best[node] = self.best[anc];
            }
            self.ancestor[node] = self.ancestor[anc];
        }
    }
}
