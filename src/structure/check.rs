//! Full invariant audit of a structure tree.

use std::collections::HashSet;

use crate::{
    cfg::EdgeKind,
    structure::{StructureId, StructureKind, StructureTree},
    Result,
};

impl StructureTree {
    /// Verifies every invariant of the tree and reports the first violation.
    ///
    /// Checked invariants:
    /// - parent links agree with the subnode lists of the parents;
    /// - every region's entry is one of its subnodes and gives the region its number;
    /// - subnode numbers are unique within a region and match their structures;
    /// - every edge starts at a subnode and no edge is duplicated;
    /// - the exit edges of a region correspond one-to-one, by target and kind, to its
    ///   parent's edges from the region;
    /// - block numbers are unique across the tree;
    /// - the improper-region flag matches a recomputation;
    /// - below the root, no region wraps a single subnode without a cycle through it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidStructure`] describing the violation, or
    /// [`crate::Error::StructureInvalidated`] for an invalidated tree.
    pub fn check_structure(&self) -> Result<()> {
        let root = self.root()?;
        if self.get(root)?.parent.is_some() {
            return Err(structure_error!("root {} has a parent", root));
        }

        let mut seen_blocks = HashSet::new();
        let mut reached = 0usize;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached += 1;
            let structure = self.get(id)?;
            let region = match &structure.kind {
                StructureKind::Block => {
                    if !seen_blocks.insert(structure.number) {
                        return Err(structure_error!("block {} appears twice", structure.number));
                    }
                    if self.blocks.get(&structure.number) != Some(&id) {
                        return Err(structure_error!(
                            "block {} is missing from the block index",
                            structure.number
                        ));
                    }
                    continue;
                }
                StructureKind::Region(region) => region,
            };

            let number = structure.number;
            if !region.has_sub_node(region.entry) {
                return Err(structure_error!(
                    "region {} has entry {} outside its subnodes",
                    number,
                    region.entry
                ));
            }
            if region.entry != number {
                return Err(structure_error!(
                    "region {} is numbered differently from its entry {}",
                    number,
                    region.entry
                ));
            }

            let mut numbers = HashSet::new();
            for sub in &region.sub_nodes {
                if !numbers.insert(sub.number) {
                    return Err(structure_error!(
                        "region {} holds subnode {} twice",
                        number,
                        sub.number
                    ));
                }
                let child = self.get(sub.structure)?;
                if child.number != sub.number {
                    return Err(structure_error!(
                        "subnode {} of region {} wraps structure numbered {}",
                        sub.number,
                        number,
                        child.number
                    ));
                }
                if child.parent != Some(id) {
                    return Err(structure_error!(
                        "structure {} does not point back at region {}",
                        sub.number,
                        number
                    ));
                }
                stack.push(sub.structure);
            }

            let mut edges = HashSet::new();
            for edge in &region.edges {
                if !numbers.contains(&edge.from) {
                    return Err(structure_error!(
                        "region {} has edge {} -> {} from a non-subnode",
                        number,
                        edge.from,
                        edge.to
                    ));
                }
                if !edges.insert(*edge) {
                    return Err(structure_error!(
                        "region {} duplicates edge {} -> {}",
                        number,
                        edge.from,
                        edge.to
                    ));
                }
            }

            if let Some(parent) = structure.parent {
                self.check_exit_bijection(id, parent)?;
            }

            if region.contains_internal_cycles() != region.compute_internal_cycles() {
                return Err(structure_error!(
                    "region {} has a stale internal-cycle flag",
                    number
                ));
            }
            if structure.parent.is_some()
                && region.sub_nodes.len() == 1
                && !region.contains_internal_cycles()
                && !region.is_natural_loop()
                && !region.has_entry_self_edge()
            {
                return Err(structure_error!(
                    "region {} wraps its single acyclic subnode",
                    number
                ));
            }
        }

        if reached != self.live {
            return Err(structure_error!(
                "{} structures are live but only {} are reachable from the root",
                self.live,
                reached
            ));
        }
        Ok(())
    }

    fn check_exit_bijection(&self, region_id: StructureId, parent_id: StructureId) -> Result<()> {
        let number = self.get(region_id)?.number;
        let region = self.region(region_id)?;
        let parent = self.region(parent_id)?;

        let exits: HashSet<(usize, EdgeKind)> =
            region.exit_edges().map(|e| (e.to, e.kind)).collect();
        let outgoing: HashSet<(usize, EdgeKind)> = parent
            .edges
            .iter()
            .filter(|e| e.from == number)
            .map(|e| (e.to, e.kind))
            .collect();

        if let Some((to, kind)) = exits.difference(&outgoing).next() {
            return Err(structure_error!(
                "exit {} -> {} [{}] of region {} has no edge in the parent",
                number,
                to,
                kind,
                number
            ));
        }
        if let Some((to, kind)) = outgoing.difference(&exits).next() {
            return Err(structure_error!(
                "parent edge {} -> {} [{}] has no exit in region {}",
                number,
                to,
                kind,
                number
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cfg::EdgeKind,
        config::AnalysisConfig,
        structure::StructureTree,
        test::factories::{cfg_from_edges, nested_loops},
        Error,
    };

    #[test]
    fn test_check_built_tree() {
        let tree = StructureTree::build(&nested_loops(), &AnalysisConfig::default()).unwrap();
        tree.check_structure().unwrap();
    }

    #[test]
    fn test_check_detects_broken_bijection() {
        let mut tree = StructureTree::build(&nested_loops(), &AnalysisConfig::default()).unwrap();
        let inner = tree.parent(tree.block_structure(2).unwrap()).unwrap().unwrap();
        tree.region_mut(inner).unwrap().add_edge(3, 5, EdgeKind::Normal);
        assert!(matches!(
            tree.check_structure(),
            Err(Error::InvalidStructure { .. })
        ));
    }

    #[test]
    fn test_check_detects_redundant_region() {
        let cfg = cfg_from_edges(3, &[(0, 1), (1, 1), (1, 2)]);
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default()).unwrap();
        tree.check_structure().unwrap();
        let single = tree.parent(tree.block_structure(1).unwrap()).unwrap().unwrap();
        assert_ne!(single, tree.root().unwrap());

        tree.region_mut(single).unwrap().remove_edge(1, 1, EdgeKind::Normal);
        assert!(matches!(
            tree.check_structure(),
            Err(Error::InvalidStructure { .. })
        ));
    }

    #[test]
    fn test_removing_self_loop_dissolves_region() {
        let cfg = cfg_from_edges(3, &[(0, 1), (1, 1), (1, 2)]);
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default()).unwrap();
        tree.remove_edge_of_kind(1, 1, EdgeKind::Normal).unwrap();
        tree.check_structure().unwrap();
        assert_eq!(
            tree.parent(tree.block_structure(1).unwrap()).unwrap(),
            Some(tree.root().unwrap())
        );
    }

    #[test]
    fn test_check_invalidated() {
        let mut tree = StructureTree::build(&nested_loops(), &AnalysisConfig::default()).unwrap();
        tree.invalidate();
        assert_eq!(tree.check_structure(), Err(Error::StructureInvalidated));
        assert!(tree.is_empty());
    }
}
