//! The structure arena and its read-only traversals.

use std::{
    collections::{HashMap, HashSet},
    fmt::Write,
};

use crate::{
    cfg::FlowGraph,
    config::AnalysisConfig,
    structure::{Region, Structure, StructureId, StructureKind, SubNode},
    Error, Result,
};

/// Weight applied per enclosing cyclic region by
/// [`StructureTree::frequency_of_execution`].
const LOOP_WEIGHT: u32 = 10;

/// The region hierarchy of one method.
///
/// Structures live in an arena and refer to each other through [`StructureId`]
/// handles. Freed slots stay empty, so a stale handle is reported as an error rather
/// than aliasing a newer structure. Once [`StructureTree::invalidate`] has been called
/// every query fails with [`Error::StructureInvalidated`].
#[derive(Debug, Clone)]
pub struct StructureTree {
    pub(crate) nodes: Vec<Option<Structure>>,
    pub(crate) root: Option<StructureId>,
    pub(crate) blocks: HashMap<usize, StructureId>,
    pub(crate) live: usize,
    pub(crate) invalidated: bool,
    pub(crate) has_unreachable_blocks: bool,
    pub(crate) config: AnalysisConfig,
}

impl StructureTree {
    pub(crate) fn empty(config: &AnalysisConfig) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            blocks: HashMap::new(),
            live: 0,
            invalidated: false,
            has_unreachable_blocks: false,
            config: *config,
        }
    }

    /// Returns the configuration the tree was built with.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the number of live structures.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the tree holds no structure.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns `false` once the tree has been invalidated.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.invalidated
    }

    /// Returns `true` if blocks without predecessors were left in the tree, or were
    /// unreachable when it was built.
    #[must_use]
    pub const fn has_unreachable_blocks(&self) -> bool {
        self.has_unreachable_blocks
    }

    /// Discards every structure. Later queries fail with [`Error::StructureInvalidated`].
    pub fn invalidate(&mut self) {
        log::debug!("invalidating structure tree with {} structures", self.live);
        self.nodes.clear();
        self.blocks.clear();
        self.root = None;
        self.live = 0;
        self.invalidated = true;
    }

    pub(crate) fn ensure_valid(&self) -> Result<()> {
        if self.invalidated {
            Err(Error::StructureInvalidated)
        } else {
            Ok(())
        }
    }

    pub(crate) fn alloc(&mut self, structure: Structure) -> Result<StructureId> {
        if self.live >= self.config.max_structures {
            return Err(Error::ResourceExhausted(self.config.max_structures));
        }
        let id = StructureId(self.nodes.len());
        if structure.is_block() {
            self.blocks.insert(structure.number, id);
        }
        self.nodes.push(Some(structure));
        self.live += 1;
        Ok(id)
    }

    pub(crate) fn release(&mut self, id: StructureId) -> Option<Structure> {
        let structure = self.nodes.get_mut(id.0).and_then(Option::take)?;
        if structure.is_block() && self.blocks.get(&structure.number) == Some(&id) {
            self.blocks.remove(&structure.number);
        }
        self.live -= 1;
        Some(structure)
    }

    /// Releases `id` and everything nested inside it.
    pub(crate) fn release_recursive(&mut self, id: StructureId) {
        if let Some(structure) = self.release(id) {
            if let StructureKind::Region(region) = structure.kind {
                for sub in region.sub_nodes {
                    self.release_recursive(sub.structure);
                }
            }
        }
    }

    /// Returns the root region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructureInvalidated`] for an invalidated tree.
    pub fn root(&self) -> Result<StructureId> {
        self.ensure_valid()?;
        self.root.ok_or_else(|| structure_error!("tree has no root"))
    }

    /// Returns the structure behind `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructureInvalidated`] for an invalidated tree and
    /// [`Error::InvalidStructure`] for a stale handle.
    pub fn get(&self, id: StructureId) -> Result<&Structure> {
        self.ensure_valid()?;
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| structure_error!("stale structure handle {}", id))
    }

    pub(crate) fn get_mut(&mut self, id: StructureId) -> Result<&mut Structure> {
        self.ensure_valid()?;
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| structure_error!("stale structure handle {}", id))
    }

    /// Returns the region part of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotARegion`] if `id` is a block structure.
    pub fn region(&self, id: StructureId) -> Result<&Region> {
        let structure = self.get(id)?;
        structure
            .as_region()
            .ok_or(Error::NotARegion(structure.number))
    }

    pub(crate) fn region_mut(&mut self, id: StructureId) -> Result<&mut Region> {
        let structure = self.get_mut(id)?;
        let number = structure.number;
        structure.as_region_mut().ok_or(Error::NotARegion(number))
    }

    /// Returns the number of `id`.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn number(&self, id: StructureId) -> Result<usize> {
        Ok(self.get(id)?.number)
    }

    /// Returns the parent region of `id`.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn parent(&self, id: StructureId) -> Result<Option<StructureId>> {
        Ok(self.get(id)?.parent)
    }

    /// Returns the block structure representing block `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if the block has no structure.
    pub fn block_structure(&self, number: usize) -> Result<StructureId> {
        self.ensure_valid()?;
        self.blocks
            .get(&number)
            .copied()
            .ok_or(Error::UnknownBlock(number))
    }

    /// Returns `true` if block `number` has a structure.
    #[must_use]
    pub fn has_block(&self, number: usize) -> bool {
        !self.invalidated && self.blocks.contains_key(&number)
    }

    /// Iterates the live structures.
    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &Structure)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (StructureId(i), s)))
    }

    /// Returns the direct children of a region in insertion order; blocks have none.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn children(&self, id: StructureId) -> Result<Vec<StructureId>> {
        Ok(match &self.get(id)?.kind {
            StructureKind::Block => Vec::new(),
            StructureKind::Region(region) => region.sub_nodes.iter().map(|s| s.structure).collect(),
        })
    }

    /// Returns the numbers of every block under `id`, depth first in insertion order.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn blocks_in(&self, id: StructureId) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let structure = self.get(current)?;
            match &structure.kind {
                StructureKind::Block => out.push(structure.number),
                StructureKind::Region(region) => {
                    stack.extend(region.sub_nodes.iter().rev().map(|s| s.structure));
                }
            }
        }
        Ok(out)
    }

    /// Returns the numbers of every block under `id`.
    ///
    /// A block is immediately followed by its layout successor when both share the same
    /// parent region, which keeps the original block order where the structure allows
    /// it. Each block is emitted once.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn get_blocks<G: FlowGraph>(&self, id: StructureId, cfg: &G) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_blocks(id, cfg, &mut visited, &mut out)?;
        Ok(out)
    }

    fn collect_blocks<G: FlowGraph>(
        &self,
        id: StructureId,
        cfg: &G,
        visited: &mut HashSet<usize>,
        out: &mut Vec<usize>,
    ) -> Result<()> {
        let structure = self.get(id)?;
        let region = match &structure.kind {
            StructureKind::Block => {
                if visited.insert(structure.number) {
                    out.push(structure.number);
                }
                return Ok(());
            }
            StructureKind::Region(region) => region,
        };

        for sub in &region.sub_nodes {
            if !self.get(sub.structure)?.is_block() {
                self.collect_blocks(sub.structure, cfg, visited, out)?;
                continue;
            }
            if !visited.insert(sub.number) {
                continue;
            }
            out.push(sub.number);
            let mut current = sub.number;
            while let Some(next) = cfg.next_block(current) {
                let same_parent = self
                    .blocks
                    .get(&next)
                    .and_then(|&sid| self.nodes.get(sid.0).and_then(Option::as_ref))
                    .is_some_and(|s| s.parent == Some(id));
                if !same_parent || !visited.insert(next) {
                    break;
                }
                out.push(next);
                current = next;
            }
        }
        Ok(())
    }

    /// Returns `true` if `ancestor` is `descendant` or encloses it.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn contains(&self, ancestor: StructureId, descendant: StructureId) -> Result<bool> {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.get(id)?.parent;
        }
        Ok(false)
    }

    /// Returns the nearest enclosing natural loop of `id`.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn containing_loop(&self, id: StructureId) -> Result<Option<StructureId>> {
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            if self.region(parent)?.is_natural_loop() {
                return Ok(Some(parent));
            }
            current = self.get(parent)?.parent;
        }
        Ok(None)
    }

    /// Returns the closest region enclosing both `a` and `b`. A region counts as
    /// enclosing itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCommonParent`] if the two structures share no region.
    pub fn find_common_parent(&self, a: StructureId, b: StructureId) -> Result<StructureId> {
        let mut ancestors = HashSet::new();
        let mut current = Some(self.enclosing_region(a)?);
        while let Some(id) = current {
            ancestors.insert(id);
            current = self.get(id)?.parent;
        }
        let mut current = Some(self.enclosing_region(b)?);
        while let Some(id) = current {
            if ancestors.contains(&id) {
                return Ok(id);
            }
            current = self.get(id)?.parent;
        }
        Err(Error::NoCommonParent)
    }

    fn enclosing_region(&self, id: StructureId) -> Result<StructureId> {
        let structure = self.get(id)?;
        if structure.is_block() {
            structure.parent.ok_or(Error::NoCommonParent)
        } else {
            Ok(id)
        }
    }

    /// Walks up from `region` and returns the first region holding a subnode numbered
    /// `number`, together with that subnode.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::region`].
    pub fn find_node_in_hierarchy(
        &self,
        region: StructureId,
        number: usize,
    ) -> Result<Option<(StructureId, SubNode)>> {
        let mut current = Some(region);
        while let Some(id) = current {
            if let Some(sub) = self.region(id)?.sub_node(number) {
                return Ok(Some((id, *sub)));
            }
            current = self.get(id)?.parent;
        }
        Ok(None)
    }

    /// Returns `true` if block `number` is the entry of its parent region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if the block has no structure.
    pub fn is_entry_of_region(&self, number: usize) -> Result<bool> {
        let id = self.block_structure(number)?;
        match self.get(id)?.parent {
            Some(parent) => Ok(self.region(parent)?.entry == number),
            None => Ok(false),
        }
    }

    /// Returns the static execution weight of `id`: 10 for every enclosing region that
    /// is not acyclic, saturating at `u32::MAX`.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::get`].
    pub fn frequency_of_execution(&self, id: StructureId) -> Result<u32> {
        let mut weight = 1u32;
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            if !self.region(parent)?.is_acyclic() {
                weight = weight.saturating_mul(LOOP_WEIGHT);
            }
            current = self.get(parent)?.parent;
        }
        Ok(weight)
    }

    /// Recomputes `nesting_depth` and `max_nesting_depth` for every structure.
    ///
    /// # Errors
    ///
    /// Fails if the tree is invalidated or inconsistent.
    pub fn set_nesting_depths(&mut self) -> Result<()> {
        let root = self.root()?;
        self.assign_depth(root, 0)?;
        Ok(())
    }

    fn assign_depth(&mut self, id: StructureId, depth: usize) -> Result<usize> {
        let (children, is_loop) = {
            let structure = self.get(id)?;
            match &structure.kind {
                StructureKind::Block => (Vec::new(), false),
                StructureKind::Region(region) => (
                    region.sub_nodes.iter().map(|s| s.structure).collect(),
                    !region.is_acyclic(),
                ),
            }
        };
        let inner = if is_loop { depth + 1 } else { depth };
        let mut max = 0;
        for child in children {
            max = max.max(self.assign_depth(child, inner)?);
        }
        let max = if is_loop { max + 1 } else { max };
        let structure = self.get_mut(id)?;
        structure.nesting_depth = depth;
        structure.max_nesting_depth = max;
        Ok(max)
    }

    /// Returns the deepest loop nesting of the method, as last computed by
    /// [`StructureTree::set_nesting_depths`].
    ///
    /// # Errors
    ///
    /// Fails if the tree is invalidated.
    pub fn max_nesting_depth(&self) -> Result<usize> {
        Ok(self.get(self.root()?)?.max_nesting_depth)
    }

    /// Sets `contains_improper_region` on every improper region and all its ancestors,
    /// and clears it everywhere else.
    ///
    /// # Errors
    ///
    /// Fails if the tree is invalidated or inconsistent.
    pub fn mark_improper_regions(&mut self) -> Result<()> {
        self.ensure_valid()?;
        let mut improper = Vec::new();
        for slot in self.nodes.iter_mut().flatten() {
            slot.contains_improper_region = false;
        }
        for (id, structure) in self.iter() {
            if structure.as_region().is_some_and(Region::contains_internal_cycles) {
                improper.push(id);
            }
        }
        for id in improper {
            let mut current = Some(id);
            while let Some(s) = current {
                let structure = self.get_mut(s)?;
                if structure.contains_improper_region && s != id {
                    break;
                }
                structure.contains_improper_region = true;
                current = structure.parent;
            }
        }
        Ok(())
    }

    /// Refreshes the derived per-structure annotations after an edit.
    pub(crate) fn refresh(&mut self) -> Result<()> {
        if self.invalidated {
            return Ok(());
        }
        self.set_nesting_depths()?;
        self.mark_improper_regions()?;
        if self.config.check_structure_after_edits {
            self.check_structure()?;
        }
        Ok(())
    }

    /// Renders the tree as indented text.
    ///
    /// # Errors
    ///
    /// Fails if the tree is invalidated or inconsistent.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        self.dump_into(self.root()?, 0, &mut out)?;
        Ok(out)
    }

    fn dump_into(&self, id: StructureId, indent: usize, out: &mut String) -> Result<()> {
        let structure = self.get(id)?;
        let pad = "  ".repeat(indent);
        match &structure.kind {
            StructureKind::Block => {
                let _ = writeln!(out, "{pad}block {}", structure.number);
            }
            StructureKind::Region(region) => {
                let shape = if region.contains_internal_cycles() {
                    "improper"
                } else if region.is_natural_loop() {
                    "natural loop"
                } else {
                    "acyclic"
                };
                let _ = writeln!(
                    out,
                    "{pad}region {} ({shape}, depth {}) entry {}",
                    structure.number, structure.nesting_depth, region.entry
                );
                for edge in &region.edges {
                    let arrow = if region.has_sub_node(edge.to) { "->" } else { "=>" };
                    let _ = writeln!(out, "{pad}  {} {arrow} {} [{}]", edge.from, edge.to, edge.kind);
                }
                for sub in &region.sub_nodes {
                    self.dump_into(sub.structure, indent + 1, out)?;
                }
            }
        }
        Ok(())
    }

    /// Writes [`StructureTree::dump`] to the log at trace level.
    pub fn trace_dump(&self) {
        if log::log_enabled!(log::Level::Trace) {
            match self.dump() {
                Ok(text) => log::trace!("structure tree:\n{text}"),
                Err(e) => log::trace!("structure tree unavailable: {e}"),
            }
        }
    }
}
