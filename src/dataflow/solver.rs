//! Structural fixed-point solver for bit-vector dataflow analyses.
//!
//! The solver walks the [`StructureTree`] instead of the flat block list. Every region
//! is solved on its own subgraph, with child regions treated as single nodes.
//!
//! # Algorithm
//!
//! 1. Order the subnodes of a region topologically, ignoring edges into the entry.
//!    Backward analyses use the reversed order.
//! 2. Solve the region according to its shape:
//!    - acyclic region: one sweep in that order;
//!    - natural loop: sweeps until no subnode changes;
//!    - region with internal cycles: worklist iteration, re-enqueueing the dependents
//!      of every subnode whose value changed.
//! 3. A child region contributes through its summary, a function of the sets at its
//!    input ports (gen/kill path), or by solving it again with the current inputs
//!    (statement path).
//! 4. Once the root has converged, the gen/kill path descends into every child region
//!    with its final inputs to produce per-block sets.
//!
//! # Complexity
//!
//! - Time: O(r × s × h) set operations on the statement path, where `s` is the number of
//!   sweeps per loop and `h` the loop nesting depth. The gen/kill path summarizes every
//!   region once and then visits it once more.
//! - Space: O(b × w) for the per-block results, where `b` is the block count and `w` the
//!   set width.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::{
    cfg::{EdgeKind, FlowGraph},
    dataflow::{
        summary::Summary, BitVectorAnalysis, CancellationToken, DataflowResults, Direction,
        GenKill,
    },
    structure::{Region, RegionEdge, StructureId, StructureTree},
    utils::OrderedBitSet,
    Error, Result,
};

/// Whether a region solve works on concrete sets or on functions of the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Concrete,
    Symbolic,
}

/// Outgoing sets of a forward region, keyed by exit target and edge kind.
type ForwardExits<S> = BTreeMap<(usize, EdgeKind), Summary<S>>;

/// Sets arriving at the exit targets of a backward region.
type BackwardInputs<S> = BTreeMap<usize, Summary<S>>;

#[derive(Debug, Clone)]
enum RegionSummary<S> {
    Forward(ForwardExits<S>),
    Backward(Summary<S>),
}

/// Regular and exceptional transfer of one block, in gen/kill form.
struct BlockFunctions<S> {
    regular: GenKill<S>,
    exceptional: GenKill<S>,
}

/// Hook that reorders the initial worklist of a region with internal cycles.
type WorklistHook<'a> = Box<dyn FnMut(&mut Vec<usize>) + 'a>;

/// Solves a [`BitVectorAnalysis`] over a CFG and its structure tree.
///
/// # Example
///
/// ```rust,ignore
/// let liveness = Liveness::new(&cfg, &symbols);
/// let results = DataflowSolver::new(&liveness, &cfg, &tree)
///     .with_cancellation(token.clone())
///     .solve()?;
/// let live_in = results.in_state(3);
/// ```
pub struct DataflowSolver<'a, A: BitVectorAnalysis, G: FlowGraph> {
    analysis: &'a A,
    cfg: &'a G,
    tree: &'a StructureTree,
    token: Option<CancellationToken>,
    use_gen_kill: bool,
    initial_worklist: Option<WorklistHook<'a>>,
    width: usize,
    block_functions: HashMap<usize, BlockFunctions<A::Set>>,
    summaries: HashMap<StructureId, RegionSummary<A::Set>>,
    results: DataflowResults<A::Set>,
}

impl<'a, A: BitVectorAnalysis, G: FlowGraph> DataflowSolver<'a, A, G> {
    /// Creates a solver.
    ///
    /// # Arguments
    ///
    /// * `analysis` - The analysis to solve
    /// * `cfg` - The control flow graph supplying statements and frequencies
    /// * `tree` - The structure tree built for `cfg`
    #[must_use]
    pub fn new(analysis: &'a A, cfg: &'a G, tree: &'a StructureTree) -> Self {
        Self {
            analysis,
            cfg,
            tree,
            token: None,
            use_gen_kill: analysis.supports_gen_and_kill(),
            initial_worklist: None,
            width: analysis.bit_count(),
            block_functions: HashMap::new(),
            summaries: HashMap::new(),
            results: DataflowResults::new(),
        }
    }

    /// Polls `token` at every worklist pop and every loop sweep.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Lets `hook` reorder the initial worklist of every region with internal cycles.
    #[must_use]
    pub fn with_initial_worklist(mut self, hook: impl FnMut(&mut Vec<usize>) + 'a) -> Self {
        self.initial_worklist = Some(Box::new(hook));
        self
    }

    /// Selects between gen/kill summaries and statement-level transfer.
    ///
    /// Enabling has no effect unless the analysis supports gen/kill.
    #[must_use]
    pub fn with_gen_kill(mut self, enabled: bool) -> Self {
        self.use_gen_kill = enabled && self.analysis.supports_gen_and_kill();
        self
    }

    /// Runs the analysis to its fixed point.
    ///
    /// # Errors
    ///
    /// - [`Error::Interrupted`] if the cancellation token fires
    /// - [`Error::StructureInvalidated`] if the tree was discarded
    /// - [`Error::WidthMismatch`] if the analysis produces sets of the wrong width
    pub fn solve(mut self) -> Result<DataflowResults<A::Set>> {
        self.check_cancelled()?;
        let root = self.tree.root()?;
        let boundary = self.analysis.boundary();
        self.check_width(&boundary)?;
        if self.use_gen_kill {
            self.compute_block_functions()?;
        }

        match A::DIRECTION {
            Direction::Forward => {
                self.solve_forward(root, &Summary::constant(boundary), Mode::Concrete)?;
            }
            Direction::Backward => {
                self.solve_backward(root, &BackwardInputs::new(), Mode::Concrete)?;
            }
        }

        let stats = self.results.stats;
        log::debug!(
            "{} solved over {} blocks ({}): {} region solves, {} loop sweeps, {} worklist pops, {} re-enqueues",
            self.analysis.kind(),
            self.results.block_count(),
            if self.use_gen_kill { "gen/kill" } else { "per statement" },
            stats.regions_solved,
            stats.loop_sweeps,
            stats.worklist_pops,
            stats.re_enqueues
        );
        if self.tree.config().trace_dataflow {
            for block in self.results.blocks() {
                log::trace!(
                    "{} block {}: in {:?} out {:?}",
                    self.analysis.kind(),
                    block,
                    self.results.in_states.get(&block),
                    self.results.out_states.get(&block)
                );
            }
        }
        Ok(self.results)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.token {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    fn check_width(&self, set: &A::Set) -> Result<()> {
        if set.width() == self.width {
            Ok(())
        } else {
            Err(Error::WidthMismatch {
                expected: self.width,
                found: set.width(),
            })
        }
    }

    fn compute_block_functions(&mut self) -> Result<()> {
        let tree = self.tree;
        for (_, structure) in tree.iter() {
            if !structure.is_block() {
                continue;
            }
            let number = structure.number();
            let regular = self
                .analysis
                .block_gen_kill(number, self.cfg.statements(number));
            self.check_width(&regular.gen)?;
            self.check_width(&regular.kill)?;
            let exceptional = regular.exceptional(A::CONFLUENCE);
            self.block_functions.insert(
                number,
                BlockFunctions {
                    regular,
                    exceptional,
                },
            );
        }
        Ok(())
    }

    fn functions(&self, block: usize) -> Result<&BlockFunctions<A::Set>> {
        self.block_functions
            .get(&block)
            .ok_or(Error::UnknownBlock(block))
    }

    /// Transfer through the whole of `block`.
    fn block_transfer(&self, block: usize, input: &Summary<A::Set>) -> Result<Summary<A::Set>> {
        if self.use_gen_kill {
            return Ok(input.through(&self.functions(block)?.regular, A::CONFLUENCE));
        }
        let mut set = input.materialize(A::CONFLUENCE, self.width);
        self.analysis
            .transfer_block(block, self.cfg.statements(block), &mut set);
        Ok(Summary::constant(set))
    }

    /// Transfer onto the exceptional out-edges of `block`.
    fn block_exceptional(&self, block: usize, input: &Summary<A::Set>) -> Result<Summary<A::Set>> {
        if self.use_gen_kill {
            return Ok(input.through(&self.functions(block)?.exceptional, A::CONFLUENCE));
        }
        let unchanged = input.materialize(A::CONFLUENCE, self.width);
        let mut set = unchanged.clone();
        self.analysis
            .transfer_block(block, self.cfg.statements(block), &mut set);
        A::CONFLUENCE.join(&mut set, &unchanged);
        Ok(Summary::constant(set))
    }

    fn along_edge(&self, from: usize, to: usize, kind: EdgeKind, value: Summary<A::Set>) -> Summary<A::Set> {
        match self.analysis.edge_transfer(from, to, kind) {
            Some(adjustment) => value.through(&adjustment, A::CONFLUENCE),
            None => value,
        }
    }

    fn record_block(&mut self, block: usize, in_state: &Summary<A::Set>, out_state: &Summary<A::Set>) {
        let in_set = in_state.materialize(A::CONFLUENCE, self.width);
        let out_set = out_state.materialize(A::CONFLUENCE, self.width);
        self.results.in_states.insert(block, in_set);
        self.results.out_states.insert(block, out_set);
    }

    /// Runs the fixed-point driver matching the shape of `region`.
    fn drive(
        &mut self,
        region: &Region,
        update: &mut dyn FnMut(&mut Self, usize) -> Result<bool>,
    ) -> Result<()> {
        let mut order = structural_order(region);
        if A::DIRECTION == Direction::Backward {
            order.reverse();
        }

        if region.contains_internal_cycles() {
            if let Some(hook) = self.initial_worklist.as_mut() {
                hook(&mut order);
            }
            let mut queued: HashSet<usize> = order.iter().copied().collect();
            let mut worklist: VecDeque<usize> = order.into_iter().collect();
            while let Some(number) = worklist.pop_front() {
                self.check_cancelled()?;
                self.results.stats.worklist_pops += 1;
                queued.remove(&number);
                if update(self, number)? {
                    for dependent in dependents(region, number, A::DIRECTION) {
                        if queued.insert(dependent) {
                            worklist.push_back(dependent);
                            self.results.stats.re_enqueues += 1;
                        }
                    }
                }
            }
        } else if region.is_natural_loop() {
            loop {
                self.check_cancelled()?;
                self.results.stats.loop_sweeps += 1;
                let mut changed = false;
                for &number in &order {
                    changed |= update(self, number)?;
                }
                if !changed {
                    break;
                }
            }
        } else {
            for &number in &order {
                update(self, number)?;
            }
        }
        Ok(())
    }

    fn forward_summary(&mut self, id: StructureId) -> Result<ForwardExits<A::Set>> {
        if let Some(RegionSummary::Forward(exits)) = self.summaries.get(&id) {
            return Ok(exits.clone());
        }
        let entry = self.tree.region(id)?.entry();
        let exits = self.solve_forward(id, &Summary::port(entry, self.width), Mode::Symbolic)?;
        self.summaries
            .insert(id, RegionSummary::Forward(exits.clone()));
        Ok(exits)
    }

    fn backward_summary(&mut self, id: StructureId) -> Result<Summary<A::Set>> {
        if let Some(RegionSummary::Backward(summary)) = self.summaries.get(&id) {
            return Ok(summary.clone());
        }
        let ports: BackwardInputs<A::Set> = self
            .tree
            .region(id)?
            .exit_edges()
            .map(|edge| (edge.to, Summary::port(edge.to, self.width)))
            .collect();
        let summary = self.solve_backward(id, &ports, Mode::Symbolic)?;
        self.summaries
            .insert(id, RegionSummary::Backward(summary.clone()));
        Ok(summary)
    }

    fn solve_forward(
        &mut self,
        id: StructureId,
        input: &Summary<A::Set>,
        mode: Mode,
    ) -> Result<ForwardExits<A::Set>> {
        self.results.stats.regions_solved += 1;
        let tree = self.tree;
        let region = tree.region(id)?;
        let mut values: HashMap<usize, Summary<A::Set>> = HashMap::new();
        let mut flows: HashMap<RegionEdge, Summary<A::Set>> = HashMap::new();

        self.drive(region, &mut |solver, number| {
            solver.update_forward(region, number, input, &mut values, &mut flows, mode)
        })?;

        if mode == Mode::Concrete {
            if self.use_gen_kill {
                for sub in region.sub_nodes() {
                    if tree.get(sub.structure)?.is_block() {
                        continue;
                    }
                    let child_input = values.get(&sub.number).cloned().unwrap_or_else(Summary::top);
                    self.solve_forward(sub.structure, &child_input, Mode::Concrete)?;
                }
            }
            self.results
                .structure_states
                .insert(id, input.materialize(A::CONFLUENCE, self.width));
            log::trace!(
                "{} region {}: in {:?}",
                self.analysis.kind(),
                id,
                self.results.structure_states.get(&id)
            );
        }

        let mut exits = ForwardExits::new();
        for edge in region.exit_edges() {
            let flow = flows.get(edge).cloned().unwrap_or_else(Summary::top);
            match exits.get_mut(&(edge.to, edge.kind)) {
                Some(existing) => {
                    existing.join(&flow, A::CONFLUENCE);
                }
                None => {
                    exits.insert((edge.to, edge.kind), flow);
                }
            }
        }
        Ok(exits)
    }

    fn update_forward(
        &mut self,
        region: &Region,
        number: usize,
        entry_input: &Summary<A::Set>,
        values: &mut HashMap<usize, Summary<A::Set>>,
        flows: &mut HashMap<RegionEdge, Summary<A::Set>>,
        mode: Mode,
    ) -> Result<bool> {
        let mut input = if number == region.entry() {
            entry_input.clone()
        } else {
            Summary::top()
        };
        for edge in region.edges().iter().filter(|e| e.to == number) {
            if let Some(flow) = flows.get(edge) {
                input.join(flow, A::CONFLUENCE);
            }
        }

        let tree = self.tree;
        let sub = region
            .sub_node(number)
            .ok_or_else(|| structure_error!("Subnode {} vanished during solve", number))?;
        let outgoing: Vec<(RegionEdge, Summary<A::Set>)> = match tree.get(sub.structure)?.as_region() {
            None => {
                let regular = self.block_transfer(number, &input)?;
                let exceptional = if region
                    .edges()
                    .iter()
                    .any(|e| e.from == number && e.kind == EdgeKind::Exception)
                {
                    Some(self.block_exceptional(number, &input)?)
                } else {
                    None
                };
                if mode == Mode::Concrete {
                    self.record_block(number, &input, &regular);
                }
                region
                    .edges()
                    .iter()
                    .filter(|e| e.from == number)
                    .map(|edge| {
                        let base = match (edge.kind, &exceptional) {
                            (EdgeKind::Exception, Some(exceptional)) => exceptional.clone(),
                            _ => regular.clone(),
                        };
                        (*edge, self.along_edge(number, edge.to, edge.kind, base))
                    })
                    .collect()
            }
            Some(_) => {
                let exits: ForwardExits<A::Set> = if self.use_gen_kill || mode == Mode::Symbolic {
                    self.forward_summary(sub.structure)?
                        .into_iter()
                        .map(|(key, value)| (key, value.substitute(A::CONFLUENCE, |_| input.clone())))
                        .collect()
                } else {
                    self.solve_forward(sub.structure, &input, mode)?
                };
                region
                    .edges()
                    .iter()
                    .filter(|e| e.from == number)
                    .map(|edge| {
                        let flow = exits
                            .get(&(edge.to, edge.kind))
                            .cloned()
                            .unwrap_or_else(Summary::top);
                        (*edge, flow)
                    })
                    .collect()
            }
        };

        // Flows only ever grow, so every region solve climbs a finite lattice
        let mut changed = false;
        for (edge, flow) in outgoing {
            changed |= flows
                .entry(edge)
                .or_insert_with(Summary::top)
                .join(&flow, A::CONFLUENCE);
        }
        values.insert(number, input);
        Ok(changed)
    }

    fn solve_backward(
        &mut self,
        id: StructureId,
        exits: &BackwardInputs<A::Set>,
        mode: Mode,
    ) -> Result<Summary<A::Set>> {
        self.results.stats.regions_solved += 1;
        let tree = self.tree;
        let region = tree.region(id)?;
        let mut values: HashMap<usize, Summary<A::Set>> = HashMap::new();

        self.drive(region, &mut |solver, number| {
            solver.update_backward(region, number, exits, &mut values, mode)
        })?;

        if mode == Mode::Concrete && self.use_gen_kill {
            for sub in region.sub_nodes() {
                let Some(child) = tree.get(sub.structure)?.as_region() else {
                    continue;
                };
                let inputs: BackwardInputs<A::Set> = child
                    .exit_edges()
                    .map(|edge| (edge.to, value_at(region, edge.to, &values, exits)))
                    .collect();
                self.solve_backward(sub.structure, &inputs, Mode::Concrete)?;
            }
        }

        let entry_value = values
            .get(&region.entry())
            .cloned()
            .unwrap_or_else(Summary::top);
        if mode == Mode::Concrete {
            self.results
                .structure_states
                .insert(id, entry_value.materialize(A::CONFLUENCE, self.width));
            log::trace!(
                "{} region {}: in {:?}",
                self.analysis.kind(),
                id,
                self.results.structure_states.get(&id)
            );
        }
        Ok(entry_value)
    }

    fn update_backward(
        &mut self,
        region: &Region,
        number: usize,
        exits: &BackwardInputs<A::Set>,
        values: &mut HashMap<usize, Summary<A::Set>>,
        mode: Mode,
    ) -> Result<bool> {
        let tree = self.tree;
        let sub = region
            .sub_node(number)
            .ok_or_else(|| structure_error!("Subnode {} vanished during solve", number))?;
        let value = match tree.get(sub.structure)?.as_region() {
            None => {
                let mut regular: Option<Summary<A::Set>> = None;
                let mut exceptional: Option<Summary<A::Set>> = None;
                for edge in region.edges().iter().filter(|e| e.from == number) {
                    let successor = value_at(region, edge.to, values, exits);
                    let flow = self.along_edge(number, edge.to, edge.kind, successor);
                    let slot = match edge.kind {
                        EdgeKind::Normal => &mut regular,
                        EdgeKind::Exception => &mut exceptional,
                    };
                    if let Some(acc) = slot.as_mut() {
                        acc.join(&flow, A::CONFLUENCE);
                    } else {
                        *slot = Some(flow);
                    }
                }
                let regular = regular.unwrap_or_else(|| Summary::constant(self.analysis.boundary()));

                let mut value = self.block_transfer(number, &regular)?;
                if let Some(exceptional) = &exceptional {
                    value.join(&self.block_exceptional(number, exceptional)?, A::CONFLUENCE);
                }
                if mode == Mode::Concrete {
                    let mut out_state = regular;
                    if let Some(exceptional) = &exceptional {
                        out_state.join(exceptional, A::CONFLUENCE);
                    }
                    self.record_block(number, &value, &out_state);
                }
                value
            }
            Some(child) => {
                if self.use_gen_kill || mode == Mode::Symbolic {
                    self.backward_summary(sub.structure)?
                        .substitute(A::CONFLUENCE, |port| value_at(region, port, values, exits))
                } else {
                    let inputs: BackwardInputs<A::Set> = child
                        .exit_edges()
                        .map(|edge| (edge.to, value_at(region, edge.to, values, exits)))
                        .collect();
                    self.solve_backward(sub.structure, &inputs, mode)?
                }
            }
        };

        Ok(values
            .entry(number)
            .or_insert_with(Summary::top)
            .join(&value, A::CONFLUENCE))
    }
}

/// Solves `analysis` with default settings.
///
/// # Errors
///
/// See [`DataflowSolver::solve`].
pub fn solve<A: BitVectorAnalysis, G: FlowGraph>(
    analysis: &A,
    cfg: &G,
    tree: &StructureTree,
) -> Result<DataflowResults<A::Set>> {
    DataflowSolver::new(analysis, cfg, tree).solve()
}

/// Value at the start of `target`, which is either a subnode of `region` or one of
/// its exit targets.
fn value_at<S: OrderedBitSet>(
    region: &Region,
    target: usize,
    values: &HashMap<usize, Summary<S>>,
    exits: &BackwardInputs<S>,
) -> Summary<S> {
    let known = if region.has_sub_node(target) {
        values.get(&target)
    } else {
        exits.get(&target)
    };
    known.cloned().unwrap_or_else(Summary::top)
}

/// Subnodes whose value depends on `number`.
fn dependents(region: &Region, number: usize, direction: Direction) -> Vec<usize> {
    let mut result: Vec<usize> = match direction {
        Direction::Forward => region.successors(number).map(|(to, _)| to).collect(),
        Direction::Backward => region.predecessors(number).map(|(from, _)| from).collect(),
    };
    result.dedup();
    result
}

/// Topological order of the subnodes, ignoring edges into the entry. Subnodes left
/// over because of cycles follow in insertion order.
fn structural_order(region: &Region) -> Vec<usize> {
    let entry = region.entry();
    let mut indegree: HashMap<usize, usize> =
        region.sub_nodes().iter().map(|n| (n.number, 0)).collect();
    for edge in region.internal_edges() {
        if edge.to != entry {
            *indegree.entry(edge.to).or_insert(0) += 1;
        }
    }

    let mut ready: VecDeque<usize> = VecDeque::new();
    ready.push_back(entry);
    for node in region.sub_nodes() {
        if node.number != entry && indegree.get(&node.number) == Some(&0) {
            ready.push_back(node.number);
        }
    }

    let mut order = Vec::with_capacity(region.sub_nodes().len());
    let mut placed = HashSet::new();
    while let Some(number) = ready.pop_front() {
        if !placed.insert(number) {
            continue;
        }
        order.push(number);
        for (to, _) in region.successors(number) {
            if to == entry {
                continue;
            }
            if let Some(count) = indegree.get_mut(&to) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.push_back(to);
                }
            }
        }
    }
    for node in region.sub_nodes() {
        if !placed.contains(&node.number) {
            order.push(node.number);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::Cfg,
        config::AnalysisConfig,
        dataflow::{AnalysisKind, Confluence},
        ir::Node,
        test::factories::{cfg_from_edges, irreducible, nested_loops},
        utils::BitSet,
    };

    /// Forward union analysis where every block generates its own number.
    struct Reached(usize);

    impl BitVectorAnalysis for Reached {
        type Set = BitSet;
        const DIRECTION: Direction = Direction::Forward;
        const CONFLUENCE: Confluence = Confluence::Union;

        fn kind(&self) -> AnalysisKind {
            AnalysisKind::ReachingBlocks
        }

        fn bit_count(&self) -> usize {
            self.0
        }

        fn supports_gen_and_kill(&self) -> bool {
            true
        }

        fn block_gen_kill(&self, block: usize, _statements: &[Node]) -> GenKill<BitSet> {
            let mut gen = BitSet::new(self.0);
            gen.insert(block);
            GenKill::new(gen, BitSet::new(self.0))
        }

        fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
            set.insert(block);
        }
    }

    /// Backward intersection analysis: blocks on every path to an exit.
    struct Dominated(usize);

    impl BitVectorAnalysis for Dominated {
        type Set = BitSet;
        const DIRECTION: Direction = Direction::Backward;
        const CONFLUENCE: Confluence = Confluence::Intersection;

        fn kind(&self) -> AnalysisKind {
            AnalysisKind::RegisterAnticipatability
        }

        fn bit_count(&self) -> usize {
            self.0
        }

        fn supports_gen_and_kill(&self) -> bool {
            true
        }

        fn block_gen_kill(&self, block: usize, _statements: &[Node]) -> GenKill<BitSet> {
            let mut gen = BitSet::new(self.0);
            gen.insert(block);
            GenKill::new(gen, BitSet::new(self.0))
        }

        fn transfer_block(&self, block: usize, _statements: &[Node], set: &mut BitSet) {
            set.insert(block);
        }
    }

    fn bits(set: Option<&BitSet>) -> Vec<usize> {
        set.map(|s| s.iter_ones().collect()).unwrap_or_default()
    }

    fn tree(cfg: &Cfg) -> StructureTree {
        StructureTree::build(cfg, &AnalysisConfig::strict()).unwrap()
    }

    #[test]
    fn test_forward_nested_loops() {
        let cfg = nested_loops();
        let tree = tree(&cfg);
        for fast in [true, false] {
            let results = DataflowSolver::new(&Reached(6), &cfg, &tree)
                .with_gen_kill(fast)
                .solve()
                .unwrap();
            assert_eq!(bits(results.in_state(0)), Vec::<usize>::new());
            assert_eq!(bits(results.in_state(1)), vec![0, 1, 2, 3, 4]);
            assert_eq!(bits(results.in_state(5)), vec![0, 1, 2, 3, 4]);
            assert_eq!(bits(results.out_state(5)), vec![0, 1, 2, 3, 4, 5]);
            assert!(results.stats().loop_sweeps >= 2);
        }
    }

    #[test]
    fn test_backward_intersection_diamond() {
        let cfg = cfg_from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = tree(&cfg);
        for fast in [true, false] {
            let results = DataflowSolver::new(&Dominated(4), &cfg, &tree)
                .with_gen_kill(fast)
                .solve()
                .unwrap();
            assert_eq!(bits(results.in_state(0)), vec![0, 3]);
            assert_eq!(bits(results.in_state(1)), vec![1, 3]);
            assert_eq!(bits(results.out_state(3)), Vec::<usize>::new());
        }
    }

    #[test]
    fn test_irreducible_uses_worklist() {
        let cfg = irreducible();
        let tree = tree(&cfg);
        let results = solve(&Reached(cfg.len()), &cfg, &tree).unwrap();
        assert!(results.stats().worklist_pops > 0);
        assert!(bits(results.in_state(1)).contains(&2));
        assert!(bits(results.in_state(2)).contains(&1));
    }

    #[test]
    fn test_cancelled_solve_fails() {
        let cfg = nested_loops();
        let tree = tree(&cfg);
        let token = CancellationToken::new();
        token.cancel();
        let result = DataflowSolver::new(&Reached(6), &cfg, &tree)
            .with_cancellation(token)
            .solve();
        assert!(matches!(result, Err(Error::Interrupted)));
    }

    #[test]
    fn test_width_mismatch_reported() {
        struct Wrong;
        impl BitVectorAnalysis for Wrong {
            type Set = BitSet;
            const DIRECTION: Direction = Direction::Forward;
            const CONFLUENCE: Confluence = Confluence::Union;
            fn kind(&self) -> AnalysisKind {
                AnalysisKind::ReachingBlocks
            }
            fn bit_count(&self) -> usize {
                4
            }
            fn boundary(&self) -> BitSet {
                BitSet::new(8)
            }
        }
        let cfg = cfg_from_edges(2, &[(0, 1)]);
        let tree = tree(&cfg);
        assert_eq!(
            solve(&Wrong, &cfg, &tree).err(),
            Some(Error::WidthMismatch { expected: 4, found: 8 })
        );
    }
}
