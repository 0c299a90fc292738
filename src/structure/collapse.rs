//! Dissolving a region into its parent.

use crate::{
    cfg::EdgeKind,
    structure::{RegionEdge, RegionFlags, StructureId, StructureTree},
    Error, Result,
};

impl StructureTree {
    /// Inlines every subnode of `region` into its parent region.
    ///
    /// Internal edges stay internal. Exit edges to nodes of the parent become internal
    /// edges of the parent and replace the parent's edges from the dissolved region;
    /// the remaining exits become exits of the parent. Edges of the parent into the
    /// dissolved region keep their target number, which now names the former entry.
    /// The parent becomes improper if the region was, or if it was a natural loop that
    /// did not head the parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotARegion`] for a block and [`Error::Error`] for the root.
    pub fn collapse_into_parent(&mut self, region: StructureId) -> Result<()> {
        self.collapse_region(region)?;
        self.refresh()
    }

    pub(crate) fn collapse_region(&mut self, region_id: StructureId) -> Result<()> {
        let structure = self.get(region_id)?;
        let number = structure.number;
        let parent_id = structure
            .parent
            .ok_or_else(|| Error::Error(format!("cannot collapse root region {number}")))?;
        let child = self.region(region_id)?;
        let sub_nodes = child.sub_nodes.clone();
        let edges: Vec<RegionEdge> = child.edges.clone();
        let child_cycles = child.contains_internal_cycles();
        let child_loop = child.is_natural_loop();

        let parent = self.region_mut(parent_id)?;
        let inherit = child_cycles || (child_loop && parent.entry != number);
        parent
            .remove_sub_node(number)
            .ok_or_else(|| structure_error!("parent of region {} does not hold it", number))?;
        parent.edges.retain(|e| e.from != number);
        parent.sub_nodes.extend(sub_nodes.iter().copied());
        for edge in edges {
            parent.add_edge(edge.from, edge.to, edge.kind);
        }
        if inherit {
            parent.flags.insert(RegionFlags::CONTAINS_INTERNAL_CYCLES);
        }

        for sub in &sub_nodes {
            self.get_mut(sub.structure)?.parent = Some(parent_id);
        }
        self.release(region_id);
        log::debug!(
            "collapsed region {number} ({} subnodes) into its parent",
            sub_nodes.len()
        );
        Ok(())
    }

    /// Returns `true` if the edge `from -> to` exists in `region`'s subgraph.
    ///
    /// # Errors
    ///
    /// Fails like [`StructureTree::region`].
    pub fn region_has_edge(
        &self,
        region: StructureId,
        from: usize,
        to: usize,
        kind: EdgeKind,
    ) -> Result<bool> {
        Ok(self.region(region)?.has_edge(from, to, kind))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cfg::EdgeKind,
        config::AnalysisConfig,
        structure::StructureTree,
        test::factories::{cfg_from_edges, nested_loops},
    };

    #[test]
    fn test_collapse_inner_loop() {
        let cfg = nested_loops();
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::strict()).unwrap();
        let inner = tree.parent(tree.block_structure(2).unwrap()).unwrap().unwrap();
        let outer = tree.parent(inner).unwrap().unwrap();
        assert!(tree.region(inner).unwrap().is_natural_loop());

        tree.collapse_into_parent(inner).unwrap();
        tree.check_structure().unwrap();

        let outer_region = tree.region(outer).unwrap();
        assert!(outer_region.contains_internal_cycles());
        assert!(outer_region.has_sub_node(2));
        assert!(outer_region.has_sub_node(3));
        assert!(tree.region_has_edge(outer, 3, 2, EdgeKind::Normal).unwrap());
    }

    #[test]
    fn test_collapse_root_fails() {
        let cfg = cfg_from_edges(2, &[(0, 1)]);
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default()).unwrap();
        let root = tree.root().unwrap();
        assert!(tree.collapse_into_parent(root).is_err());
        let block = tree.block_structure(0).unwrap();
        assert!(matches!(
            tree.collapse_into_parent(block),
            Err(crate::Error::NotARegion(0))
        ));
    }
}
