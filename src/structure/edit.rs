//! Edge insertion and removal.
//!
//! Both operations locate the owning region of the edge: the innermost region whose
//! subgraph holds both endpoints. Below the owning region the edge is represented by
//! one exit edge per nesting level of the source; at the owning region it is an
//! internal edge.

use crate::{
    cfg::EdgeKind,
    structure::{Structure, StructureId, StructureTree, SubNode},
    Error, Result,
};

impl StructureTree {
    /// Returns the subnode of `region` whose subtree contains `id`.
    pub(crate) fn child_containing(&self, region: StructureId, id: StructureId) -> Result<SubNode> {
        let mut current = id;
        loop {
            let structure = self.get(current)?;
            match structure.parent {
                Some(parent) if parent == region => {
                    return self
                        .region(region)?
                        .sub_node(structure.number)
                        .copied()
                        .ok_or_else(|| {
                            structure_error!("region {} lost its subnode {}", region, structure.number)
                        });
                }
                Some(parent) => current = parent,
                None => {
                    return Err(structure_error!("{} is not nested in {}", id, region));
                }
            }
        }
    }

    /// Returns the block-level successors of block `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if the block has no structure.
    pub fn block_successors(&self, number: usize) -> Result<Vec<(usize, EdgeKind)>> {
        let id = self.block_structure(number)?;
        let Some(parent) = self.get(id)?.parent else {
            return Ok(Vec::new());
        };
        Ok(self
            .region(parent)?
            .edges
            .iter()
            .filter(|e| e.from == number)
            .map(|e| (e.to, e.kind))
            .collect())
    }

    /// Removes the block edge `from -> to`, preferring the normal edge when both kinds
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEdge`] if no such edge exists.
    pub fn remove_edge(&mut self, from: usize, to: usize) -> Result<()> {
        let kind = if self
            .block_successors(from)?
            .contains(&(to, EdgeKind::Normal))
        {
            EdgeKind::Normal
        } else {
            EdgeKind::Exception
        };
        self.remove_edge_of_kind(from, to, kind)
    }

    /// Removes the block edge `from -> to` of the given kind.
    ///
    /// Exit edges are removed level by level until another exit to the same target
    /// survives. At the owning region, a non-entry target left without predecessors is
    /// deleted when it has no successors either, and a region reduced to a single
    /// acyclic subnode is replaced by that subnode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEdge`] if no such edge exists.
    pub fn remove_edge_of_kind(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<()> {
        let from_id = self.block_structure(from)?;
        let mut current = from_id;
        let mut source = from;
        loop {
            let region_id = self.get(current)?.parent.ok_or(Error::UnknownEdge { from, to })?;
            let region = self.region(region_id)?;
            if !region.has_edge(source, to, kind) {
                return Err(Error::UnknownEdge { from, to });
            }
            let internal = region.has_sub_node(to);
            let region_number = self.get(region_id)?.number;

            let region = self.region_mut(region_id)?;
            region.remove_edge(source, to, kind);
            let exit_survives = region.exit_edges().any(|e| e.to == to && e.kind == kind);
            if internal {
                log::debug!("removed edge {from} -> {to} [{kind}] owned by region {region_number}");
                self.cleanup_region(region_id, &[source, to])?;
                break;
            }
            if exit_survives {
                break;
            }
            source = region_number;
            current = region_id;
        }
        self.refresh()
    }

    /// Adds the block edge `from -> to` of the given kind.
    ///
    /// A target without a structure becomes a new block subnode of the owning region.
    /// A target nested inside a region that it does not head forces that region to be
    /// collapsed into the owning region first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `from` has no structure and
    /// [`Error::ResourceExhausted`] if a new block structure cannot be allocated.
    pub fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<()> {
        let from_id = self.block_structure(from)?;
        let to_id = self.blocks.get(&to).copied();

        let mut owner = self.root()?;
        loop {
            let from_child = self.child_containing(owner, from_id)?;
            let same_child = match to_id {
                Some(to_id) => self.child_containing(owner, to_id)?.structure == from_child.structure,
                None => false,
            };
            if same_child && !self.get(from_child.structure)?.is_block() {
                owner = from_child.structure;
            } else {
                break;
            }
        }

        match to_id {
            None => {
                let block = self.alloc(Structure::block(to))?;
                self.get_mut(block)?.parent = Some(owner);
                self.region_mut(owner)?.sub_nodes.push(SubNode {
                    number: to,
                    structure: block,
                });
            }
            Some(to_id) => loop {
                let to_child = self.child_containing(owner, to_id)?;
                if to_child.number == to {
                    break;
                }
                self.collapse_region(to_child.structure)?;
            },
        }

        let mut source = from;
        let mut current = self.get(from_id)?.parent;
        while let Some(level) = current {
            if level == owner {
                break;
            }
            self.region_mut(level)?.add_edge(source, to, kind);
            let structure = self.get(level)?;
            source = structure.number;
            current = structure.parent;
        }

        let region = self.region_mut(owner)?;
        if region.add_edge(source, to, kind) {
            region.update_cycle_flag();
            log::debug!("added edge {from} -> {to} [{kind}]");
        }
        self.refresh()
    }

    /// Deletes orphaned subnodes among `candidates`, refreshes the cycle flag and
    /// dissolves the region if a single acyclic subnode is left.
    pub(crate) fn cleanup_region(&mut self, region_id: StructureId, candidates: &[usize]) -> Result<()> {
        for &number in candidates {
            let region = self.region(region_id)?;
            if number == region.entry || !region.has_sub_node(number) {
                continue;
            }
            if region.predecessors(number).next().is_some() {
                continue;
            }
            if region.edges.iter().any(|e| e.from == number) {
                self.has_unreachable_blocks = true;
                continue;
            }
            if let Some(sub) = self.region_mut(region_id)?.remove_sub_node(number) {
                log::debug!("removed unreachable subnode {number}");
                self.release_recursive(sub.structure);
            }
        }

        let region = self.region_mut(region_id)?;
        if region.contains_internal_cycles() {
            region.update_cycle_flag();
        }
        let dissolve = region.sub_nodes.len() == 1
            && !region.contains_internal_cycles()
            && !region.is_natural_loop()
            && !region.has_entry_self_edge();
        if dissolve && self.get(region_id)?.parent.is_some() {
            self.replace_part(region_id)?;
        }
        Ok(())
    }

    /// Replaces a single-subnode region by its only child in the parent's subgraph.
    pub(crate) fn replace_part(&mut self, region_id: StructureId) -> Result<()> {
        let structure = self.get(region_id)?;
        let parent = structure
            .parent
            .ok_or_else(|| structure_error!("cannot replace root region {}", region_id))?;
        let number = structure.number;
        let child = match self.region(region_id)?.sub_nodes.as_slice() {
            [only] => *only,
            _ => return Err(structure_error!("region {} has more than one subnode", number)),
        };

        let slot = self
            .region_mut(parent)?
            .sub_nodes
            .iter_mut()
            .find(|s| s.structure == region_id)
            .ok_or_else(|| structure_error!("parent of {} does not hold it", number))?;
        slot.structure = child.structure;
        self.get_mut(child.structure)?.parent = Some(parent);
        self.release(region_id);
        log::debug!("dissolved single-node region {number}");
        Ok(())
    }
}
