//! Promoting nodes that only leave their loop.
//!
//! After an edit removes the last path from a loop body node back to the header, the
//! node still sits inside the loop region although it no longer belongs to the loop.
//! [`StructureTree::extract_unconditional_exits`] moves such nodes outward, one level
//! at a time, as long as every edge leaving them also leaves the innermost loop.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    cfg::EdgeKind,
    config::ExitExtractionPolicy,
    structure::{StructureId, StructureTree, SubNode},
    Result,
};

/// Result of [`StructureTree::extract_unconditional_exits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// No node qualified
    Unchanged,
    /// The listed subnode numbers were promoted, in promotion order
    Extracted(Vec<usize>),
    /// The tree was discarded and must be rebuilt
    Invalidated,
}

/// Block contents of regions, filled on demand.
#[derive(Default)]
struct ContentsCache {
    contents: HashMap<StructureId, HashSet<usize>>,
}

impl ContentsCache {
    fn get(&mut self, tree: &StructureTree, region: StructureId) -> Result<&HashSet<usize>> {
        if !self.contents.contains_key(&region) {
            let blocks = tree.blocks_in(region)?.into_iter().collect();
            self.contents.insert(region, blocks);
        }
        Ok(&self.contents[&region])
    }

    fn remove_blocks(&mut self, region: StructureId, blocks: &[usize]) {
        if let Some(set) = self.contents.get_mut(&region) {
            for block in blocks {
                set.remove(block);
            }
        }
    }

    fn forget(&mut self, region: StructureId) {
        self.contents.remove(&region);
    }
}

impl StructureTree {
    /// Promotes subnodes whose edges all leave the innermost enclosing loop.
    ///
    /// `edited` lists the blocks whose outgoing edges changed. A subnode qualifies when
    /// it is not the entry of its region, has no successor inside the region, and every
    /// edge leaving it targets a block outside the innermost natural loop among the
    /// region and its ancestors. Qualifying subnodes move to the parent region; their
    /// predecessors are re-examined and the promoted node is examined again at its new
    /// level. The configured [`ExitExtractionPolicy`] decides whether the tree is
    /// repaired or invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StructureInvalidated`] if the tree is already invalid, and
    /// structure errors if it is inconsistent.
    pub fn extract_unconditional_exits(&mut self, edited: &[usize]) -> Result<ExtractionOutcome> {
        self.ensure_valid()?;
        let policy = self.config.exit_extraction_policy;
        let mut cache = ContentsCache::default();
        let mut worklist = VecDeque::new();
        for &block in edited {
            if let Some(&id) = self.blocks.get(&block) {
                if let Some(parent) = self.get(id)?.parent {
                    worklist.push_back((parent, block));
                }
            }
        }

        let mut extracted = Vec::new();
        while let Some((region_id, number)) = worklist.pop_front() {
            if self.get(region_id).is_err() || !self.region(region_id)?.has_sub_node(number) {
                continue;
            }
            if !self.qualifies_for_extraction(region_id, number, &mut cache)? {
                continue;
            }

            let improper = self.region(region_id)?.contains_internal_cycles();
            match policy {
                ExitExtractionPolicy::Invalidate => {
                    log::debug!("exit extraction needed for {number}, invalidating");
                    self.invalidate();
                    return Ok(ExtractionOutcome::Invalidated);
                }
                ExitExtractionPolicy::RepairOrInvalidate if improper => {
                    log::debug!("exit candidate {number} sits in an improper region, invalidating");
                    self.invalidate();
                    return Ok(ExtractionOutcome::Invalidated);
                }
                ExitExtractionPolicy::Repair if improper => continue,
                _ => {}
            }

            let preds: Vec<usize> = self
                .region(region_id)?
                .predecessors(number)
                .map(|(p, _)| p)
                .collect();
            let parent = self.promote(region_id, number, &mut cache)?;
            extracted.push(number);
            for pred in preds {
                if self.get(region_id).is_ok() {
                    worklist.push_back((region_id, pred));
                } else {
                    worklist.push_back((parent, pred));
                }
            }
            worklist.push_back((parent, number));
        }

        self.refresh()?;
        if extracted.is_empty() {
            Ok(ExtractionOutcome::Unchanged)
        } else {
            log::debug!("extracted unconditional exits {extracted:?}");
            Ok(ExtractionOutcome::Extracted(extracted))
        }
    }

    fn qualifies_for_extraction(
        &self,
        region_id: StructureId,
        number: usize,
        cache: &mut ContentsCache,
    ) -> Result<bool> {
        let structure = self.get(region_id)?;
        if structure.parent.is_none() {
            return Ok(false);
        }
        let region = self.region(region_id)?;
        if region.entry == number || region.successors(number).next().is_some() {
            return Ok(false);
        }

        let innermost_loop = if region.is_natural_loop() {
            Some(region_id)
        } else {
            self.containing_loop(region_id)?
        };
        let Some(lp) = innermost_loop else {
            return Ok(false);
        };
        let targets: Vec<usize> = region.exits_from(number).map(|e| e.to).collect();
        let contents = cache.get(self, lp)?;
        Ok(targets.iter().all(|t| !contents.contains(t)))
    }

    /// Moves subnode `number` of `region_id` into the parent region and returns the
    /// parent.
    fn promote(
        &mut self,
        region_id: StructureId,
        number: usize,
        cache: &mut ContentsCache,
    ) -> Result<StructureId> {
        let parent_id = self
            .get(region_id)?
            .parent
            .ok_or_else(|| structure_error!("cannot promote out of the root"))?;
        let region_number = self.get(region_id)?.number;

        let region = self.region_mut(region_id)?;
        let exits: Vec<(usize, EdgeKind)> = region
            .edges
            .iter()
            .filter(|e| e.from == number)
            .map(|e| (e.to, e.kind))
            .collect();
        region.edges.retain(|e| e.from != number);
        let sub: SubNode = region
            .remove_sub_node(number)
            .ok_or_else(|| structure_error!("region {} lost subnode {}", region_number, number))?;
        region.update_cycle_flag();
        let mut region_exits: Vec<(usize, EdgeKind)> = Vec::new();
        for edge in region.exit_edges() {
            if !region_exits.contains(&(edge.to, edge.kind)) {
                region_exits.push((edge.to, edge.kind));
            }
        }

        let parent = self.region_mut(parent_id)?;
        parent.sub_nodes.push(sub);
        for (to, kind) in exits {
            parent.add_edge(number, to, kind);
        }
        parent
            .edges
            .retain(|e| e.from != region_number || region_exits.contains(&(e.to, e.kind)));
        for (to, kind) in region_exits {
            parent.add_edge(region_number, to, kind);
        }
        parent.update_cycle_flag();
        self.get_mut(sub.structure)?.parent = Some(parent_id);

        let moved = self.blocks_in(sub.structure)?;
        cache.remove_blocks(region_id, &moved);
        log::debug!("promoted {number} out of region {region_number}");

        self.cleanup_region(region_id, &[])?;
        if self.get(region_id).is_err() {
            cache.forget(region_id);
        }
        Ok(parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig,
        test::factories::{cfg_from_edges, scenario_c_cfg},
        Error,
    };

    fn loop_blocks(tree: &StructureTree, header: usize) -> Vec<usize> {
        let block = tree.block_structure(header).unwrap();
        let lp = tree.parent(block).unwrap().unwrap();
        let mut blocks = tree.blocks_in(lp).unwrap();
        blocks.sort_unstable();
        blocks
    }

    #[test]
    fn test_extract_bubbles_latch_chain() {
        let mut tree = StructureTree::build(&scenario_c_cfg(), &AnalysisConfig::strict()).unwrap();
        assert_eq!(loop_blocks(&tree, 4), vec![4, 5, 6, 7]);

        tree.remove_edge(7, 4).unwrap();
        let outcome = tree.extract_unconditional_exits(&[7]).unwrap();

        assert_eq!(outcome, ExtractionOutcome::Extracted(vec![7, 6]));
        assert_eq!(loop_blocks(&tree, 4), vec![4, 5]);
        tree.check_structure().unwrap();
    }

    #[test]
    fn test_extract_unchanged_outside_loops() {
        let cfg = cfg_from_edges(3, &[(0, 1), (1, 2)]);
        let mut tree = StructureTree::build(&cfg, &AnalysisConfig::default()).unwrap();
        assert_eq!(
            tree.extract_unconditional_exits(&[1]).unwrap(),
            ExtractionOutcome::Unchanged
        );
    }

    #[test]
    fn test_extract_invalidate_policy() {
        let config = AnalysisConfig {
            exit_extraction_policy: ExitExtractionPolicy::Invalidate,
            ..AnalysisConfig::default()
        };
        let mut tree = StructureTree::build(&scenario_c_cfg(), &config).unwrap();
        tree.remove_edge(7, 4).unwrap();

        assert_eq!(
            tree.extract_unconditional_exits(&[7]).unwrap(),
            ExtractionOutcome::Invalidated
        );
        assert!(!tree.is_valid());
        assert_eq!(tree.root(), Err(Error::StructureInvalidated));
    }
}
