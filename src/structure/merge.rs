//! Merging two blocks.

use crate::{
    cfg::EdgeKind,
    structure::{StructureId, StructureTree},
    Error, Result,
};

impl StructureTree {
    /// Folds block `survivor` into block `merged`, mirroring
    /// [`crate::cfg::Cfg::merge_blocks`].
    ///
    /// The structure of `merged` disappears and the structure of `survivor` takes over
    /// its number, so the combined block sits where `survivor` was. The successors of
    /// `merged` other than `survivor` are re-attached to the combined block. Regions
    /// that only separated the two blocks are collapsed or dissolved along the way.
    ///
    /// When `merged` heads a region that does not contain `survivor` but only flows
    /// into `survivor`, the rest of that region is dead code left behind by earlier
    /// edits. The tree is invalidated instead of merged in that case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMerge`] when both numbers are equal or when `merged`
    /// heads a region that it leaves through other edges than the one to `survivor`,
    /// and [`Error::UnknownBlock`] when either block has no structure. The tree is
    /// unchanged on error.
    pub fn merge_blocks(&mut self, merged: usize, survivor: usize) -> Result<()> {
        if merged == survivor {
            return Err(Error::InvalidMerge { merged, survivor });
        }
        let merged_id = self.block_structure(merged)?;
        let survivor_id = self.block_structure(survivor)?;
        let owner = self.find_common_parent(merged_id, survivor_id)?;

        if self.heads_region_below(merged_id, owner)? {
            let successors = self.block_successors(merged)?;
            if successors.is_empty() || successors.iter().any(|&(to, _)| to != survivor) {
                return Err(Error::InvalidMerge { merged, survivor });
            }
            log::debug!("block {merged} heads a stale region apart from {survivor}, invalidating");
            self.invalidate();
            return Ok(());
        }

        loop {
            let child = self.child_containing(owner, merged_id)?;
            if child.structure == merged_id {
                break;
            }
            self.collapse_region(child.structure)?;
        }
        loop {
            let child = self.child_containing(owner, survivor_id)?;
            if child.number == survivor {
                break;
            }
            self.collapse_region(child.structure)?;
        }

        let region = self.region_mut(owner)?;
        let successors: Vec<(usize, EdgeKind)> = region
            .edges
            .iter()
            .filter(|e| e.from == merged && e.to != survivor)
            .map(|e| (e.to, e.kind))
            .collect();
        region.edges.retain(|e| e.from != merged);
        region.remove_sub_node(merged);
        if region.entry == merged {
            region.entry = survivor;
        }
        self.release(merged_id);

        self.renumber_all(survivor, merged);
        if let Some(parent) = self.get(survivor_id)?.parent {
            self.repair_exits_upward(parent)?;
        }

        for (to, kind) in successors {
            self.add_edge(merged, to, kind)?;
        }
        if self.get(owner).is_ok() {
            self.cleanup_region(owner, &[])?;
        }
        log::debug!("merged block {survivor} into block {merged}");
        self.refresh()
    }

    /// Returns `true` if a region strictly between `owner` and block `id` is entered
    /// through that block.
    fn heads_region_below(&self, id: StructureId, owner: StructureId) -> Result<bool> {
        let number = self.get(id)?.number;
        let mut current = self.get(id)?.parent;
        while let Some(region) = current {
            if region == owner {
                break;
            }
            let structure = self.get(region)?;
            if structure.number == number {
                return Ok(true);
            }
            current = structure.parent;
        }
        Ok(false)
    }

    /// Walks from `region` to the root, refreshing cycle flags and making every
    /// parent's edges from a region match that region's exit edges.
    fn repair_exits_upward(&mut self, region: StructureId) -> Result<()> {
        let mut current = Some(region);
        while let Some(id) = current {
            let region = self.region_mut(id)?;
            region.update_cycle_flag();
            let mut exits: Vec<(usize, EdgeKind)> = Vec::new();
            for edge in region.exit_edges() {
                if !exits.contains(&(edge.to, edge.kind)) {
                    exits.push((edge.to, edge.kind));
                }
            }
            let structure = self.get(id)?;
            let number = structure.number;
            current = structure.parent;
            if let Some(parent) = current {
                let parent = self.region_mut(parent)?;
                parent
                    .edges
                    .retain(|e| e.from != number || exits.contains(&(e.to, e.kind)));
                for (to, kind) in exits {
                    parent.add_edge(number, to, kind);
                }
            }
        }
        Ok(())
    }
}
