//! Propagating a block renumbering through the tree.

use crate::{structure::StructureTree, Error, Result};

impl StructureTree {
    /// Gives block `old` the number `new`.
    ///
    /// The new number reaches the block structure, every region entered at the block,
    /// every subnode carrying the old number and every edge endpoint naming it. Edges
    /// that become duplicates are merged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `old` has no structure and [`Error::Error`] if
    /// `new` is already taken by another block.
    pub fn renumber(&mut self, old: usize, new: usize) -> Result<()> {
        self.block_structure(old)?;
        if old == new {
            return Ok(());
        }
        if self.has_block(new) {
            return Err(Error::Error(format!("block number {new} is already in use")));
        }
        self.renumber_all(old, new);
        self.refresh()
    }

    pub(crate) fn renumber_all(&mut self, old: usize, new: usize) {
        let rename = |n: &mut usize| {
            if *n == old {
                *n = new;
            }
        };
        for structure in self.nodes.iter_mut().flatten() {
            rename(&mut structure.number);
            if let Some(region) = structure.as_region_mut() {
                rename(&mut region.entry);
                for sub in &mut region.sub_nodes {
                    rename(&mut sub.number);
                }
                let mut edges = Vec::with_capacity(region.edges.len());
                for mut edge in region.edges.drain(..) {
                    rename(&mut edge.from);
                    rename(&mut edge.to);
                    if !edges.contains(&edge) {
                        edges.push(edge);
                    }
                }
                region.edges = edges;
            }
        }
        if let Some(id) = self.blocks.remove(&old) {
            self.blocks.insert(new, id);
        }
        log::debug!("renumbered block {old} to {new}");
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
    fn test_renumber_loop_header() {
        let cfg = nested_loops();
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::strict()).unwrap();
        let inner = tree.parent(tree.block_structure(2).unwrap()).unwrap().unwrap();

        tree.renumber(2, 20).unwrap();

        assert!(!tree.has_block(2));
        assert_eq!(tree.number(inner).unwrap(), 20);
        let region = tree.region(inner).unwrap();
        assert_eq!(region.entry(), 20);
        assert!(region.has_edge(3, 20, EdgeKind::Normal));
        let mut succs = tree.block_successors(1).unwrap();
        succs.sort();
        assert_eq!(succs, vec![(5, EdgeKind::Normal), (20, EdgeKind::Normal)]);
        tree.check_structure().unwrap();
    }

    #[test]
    fn test_renumber_conflict() {
        let cfg = cfg_from_edges(3, &[(0, 1), (1, 2)]);
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default()).unwrap();
        assert!(tree.renumber(1, 2).is_err());
        assert!(matches!(tree.renumber(7, 8), Err(crate::Error::UnknownBlock(7))));
    }
}
