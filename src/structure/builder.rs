//! Bottom-up construction of the structure tree from a CFG.
//!
//! Blocks are numbered in depth-first preorder and their dominators are computed.
//! Two passes then walk the preorder numbers from the highest down, so inner headers
//! are always handled before the headers that dominate them:
//!
//! 1. every header of back edges becomes a loop region holding the nodes that reach a
//!    back-edge tail without passing the header;
//! 2. every remaining node gathers the successors it dominates; the set becomes a
//!    region when it contains a cycle, when it reaches the configured size threshold,
//!    or when it is the method entry.
//!
//! A new region replaces its entry node in the working graph, and the exits of its
//! members are re-sourced to that node, which is what keeps the parent's edges in
//! one-to-one correspondence with the region's exit edges.

use std::collections::{BTreeSet, HashMap};

use crate::{
    cfg::{EdgeKind, FlowGraph},
    config::AnalysisConfig,
    structure::{Region, Structure, StructureId, StructureTree, SubNode},
    utils::graph::{
        algorithms::{compute_dominators, preorder, DominatorTree},
        AdjacencyGraph, NodeId,
    },
    Result,
};

/// A node of the working graph: a block, or the region that replaced it.
struct WorkNode {
    id: StructureId,
    alive: bool,
    succs: Vec<(usize, EdgeKind)>,
    preds: Vec<(usize, EdgeKind)>,
}

struct Builder<'a> {
    tree: &'a mut StructureTree,
    /// Block number of every preorder index
    numbers: Vec<usize>,
    dominators: DominatorTree,
    work: Vec<WorkNode>,
}

impl StructureTree {
    /// Builds the structure tree of `cfg`.
    ///
    /// Blocks not reachable from the entry get no structure; the tree records that
    /// they exist through [`StructureTree::has_unreachable_blocks`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ResourceExhausted`] if the tree would exceed
    /// `config.max_structures`, and [`crate::Error::InvalidStructure`] if the built tree
    /// fails the audit while `config.check_structure_after_edits` is set.
    pub fn build<G: FlowGraph>(cfg: &G, config: &AnalysisConfig) -> Result<Self> {
        let mut tree = StructureTree::empty(config);
        if !cfg.has_block(cfg.entry_block()) {
            return Ok(tree);
        }

        let bound = cfg.number_bound();
        let mut graph = AdjacencyGraph::new(bound);
        for block in cfg.block_numbers() {
            for kind in [EdgeKind::Normal, EdgeKind::Exception] {
                for succ in cfg.successors(block, kind) {
                    graph.add_edge(NodeId::new(block), NodeId::new(succ));
                }
            }
        }
        let entry = NodeId::new(cfg.entry_block());

        let numbers: Vec<usize> = preorder(&graph, entry).into_iter().map(NodeId::index).collect();
        let index: HashMap<usize, usize> = numbers.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        tree.has_unreachable_blocks = cfg.block_numbers().any(|b| !index.contains_key(&b));

        let mut work = Vec::with_capacity(numbers.len());
        for &number in &numbers {
            let id = tree.alloc(Structure::block(number))?;
            work.push(WorkNode {
                id,
                alive: true,
                succs: Vec::new(),
                preds: Vec::new(),
            });
        }
        for (i, &number) in numbers.iter().enumerate() {
            for kind in [EdgeKind::Normal, EdgeKind::Exception] {
                for succ in cfg.successors(number, kind) {
                    let Some(&j) = index.get(&succ) else { continue };
                    if !work[i].succs.contains(&(j, kind)) {
                        work[i].succs.push((j, kind));
                        work[j].preds.push((i, kind));
                    }
                }
            }
        }

        let dominators = compute_dominators(&graph, entry);
        let mut builder = Builder {
            tree: &mut tree,
            numbers,
            dominators,
            work,
        };
        builder.find_natural_loops()?;
        builder.find_acyclic_regions()?;
        let root = builder.finish_root()?;

        tree.root = Some(root);
        tree.set_nesting_depths()?;
        tree.mark_improper_regions()?;
        log::debug!(
            "built structure tree: {} structures, max nesting depth {}",
            tree.len(),
            tree.max_nesting_depth()?
        );
        if config.trace_structure {
            tree.trace_dump();
        }
        if config.check_structure_after_edits {
            tree.check_structure()?;
        }
        Ok(tree)
    }
}

impl Builder<'_> {
    fn dominates(&self, a: usize, b: usize) -> bool {
        self.dominators
            .dominates(NodeId::new(self.numbers[a]), NodeId::new(self.numbers[b]))
    }

    /// Returns `true` if no member other than `header` has a predecessor outside `set`.
    fn is_single_entry(&self, header: usize, set: &BTreeSet<usize>) -> bool {
        set.iter()
            .filter(|&&m| m != header)
            .all(|&m| self.work[m].preds.iter().all(|(p, _)| set.contains(p)))
    }

    fn find_natural_loops(&mut self) -> Result<()> {
        for header in (0..self.work.len()).rev() {
            if !self.work[header].alive {
                continue;
            }
            let tails: Vec<usize> = self.work[header]
                .preds
                .iter()
                .map(|&(p, _)| p)
                .filter(|&p| self.dominates(header, p))
                .collect();
            if tails.is_empty() {
                continue;
            }

            let mut set = BTreeSet::from([header]);
            let mut stack = tails;
            let mut proper = true;
            while let Some(node) = stack.pop() {
                if set.contains(&node) {
                    continue;
                }
                if !self.dominates(header, node) {
                    proper = false;
                    break;
                }
                set.insert(node);
                stack.extend(self.work[node].preds.iter().map(|&(p, _)| p));
            }

            if proper && self.is_single_entry(header, &set) {
                self.form_region(header, &set)?;
            }
        }
        Ok(())
    }

    fn find_acyclic_regions(&mut self) -> Result<()> {
        let threshold = self.tree.config.acyclic_region_threshold;
        for header in (0..self.work.len()).rev() {
            if !self.work[header].alive {
                continue;
            }
            let mut set = BTreeSet::from([header]);
            let mut stack: Vec<usize> = self.work[header].succs.iter().map(|&(s, _)| s).collect();
            while let Some(node) = stack.pop() {
                if set.contains(&node) || !self.dominates(header, node) {
                    continue;
                }
                set.insert(node);
                stack.extend(self.work[node].succs.iter().map(|&(s, _)| s));
            }
            if set.len() < 2 {
                continue;
            }
            let needed = header == 0 || set.len() >= threshold || self.has_cycle(&set);
            if needed && self.is_single_entry(header, &set) {
                self.form_region(header, &set)?;
            }
        }
        Ok(())
    }

    /// Detects any cycle in the working graph restricted to `set`.
    fn has_cycle(&self, set: &BTreeSet<usize>) -> bool {
        let mut region = Region::new(0);
        for &m in set {
            region.sub_nodes.push(SubNode {
                number: m,
                structure: self.work[m].id,
            });
        }
        for &m in set {
            for &(s, kind) in &self.work[m].succs {
                if set.contains(&s) {
                    region.add_edge(m, s, kind);
                }
            }
        }
        // No edge targets this entry, so back edges to the header count as cycles too.
        region.entry = usize::MAX;
        region.compute_internal_cycles()
    }

    /// Wraps the members of `set` into a region entered at `header`, which then stands
    /// in for all of them in the working graph.
    fn form_region(&mut self, header: usize, set: &BTreeSet<usize>) -> Result<StructureId> {
        let mut region = Region::new(self.numbers[header]);
        for &m in set {
            let number = self.tree.get(self.work[m].id)?.number;
            region.sub_nodes.push(SubNode {
                number,
                structure: self.work[m].id,
            });
            for &(s, kind) in &self.work[m].succs {
                region.add_edge(self.numbers[m], self.numbers[s], kind);
            }
        }
        region.update_cycle_flag();

        let id = self.tree.alloc(Structure::region(region))?;
        for &m in set {
            let child = self.work[m].id;
            self.tree.get_mut(child)?.parent = Some(id);
        }

        let mut exits: Vec<(usize, EdgeKind)> = Vec::new();
        for &m in set {
            let succs = std::mem::take(&mut self.work[m].succs);
            for (s, kind) in succs {
                self.work[s].preds.retain(|&(p, k)| !(p == m && k == kind));
                if !set.contains(&s) && !exits.contains(&(s, kind)) {
                    exits.push((s, kind));
                }
            }
            if m != header {
                self.work[m].alive = false;
                self.work[m].preds.clear();
            }
        }
        for &(s, kind) in &exits {
            self.work[s].preds.push((header, kind));
        }
        let node = &mut self.work[header];
        node.id = id;
        node.succs = exits;
        node.preds.retain(|(p, _)| !set.contains(p));
        Ok(id)
    }

    /// Ensures the root is a region that is not itself a loop.
    fn finish_root(&mut self) -> Result<StructureId> {
        let current = self.work[0].id;
        let needs_wrapper = self
            .tree
            .get(current)?
            .as_region()
            .map_or(true, |r| !r.is_acyclic());
        if needs_wrapper {
            self.form_region(0, &BTreeSet::from([0]))
        } else {
            Ok(current)
        }
    }
}
