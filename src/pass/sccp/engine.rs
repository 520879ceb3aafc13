// Copyright (c) 2017-2021 Fabian Schuiki

//! The two-worklist solver of the constant propagation.

use super::{visitor::Visitor, ConstantValue, SccpOptions, WorklistOrder};
use crate::ir::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// An edge in the control flow graph.
///
/// An edge without a source block is the edge along which control enters the
/// function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfgEdge {
    /// The block control leaves, or `None` for the function entry.
    pub from: Option<Block>,
    /// The block control enters.
    pub to: Block,
}

impl CfgEdge {
    /// Create an edge between two blocks.
    pub fn new(from: Block, to: Block) -> Self {
        Self {
            from: Some(from),
            to,
        }
    }

    /// Create the edge entering a function at `entry`.
    pub fn entry(entry: Block) -> Self {
        Self { from: None, to: entry }
    }

    /// Dump the edge in human-readable form.
    pub fn dump(self, func: &Function) -> CfgEdgeDumper<'_> {
        CfgEdgeDumper(self, func)
    }
}

/// Temporary object to dump a `CfgEdge` in human-readable form.
pub struct CfgEdgeDumper<'a>(CfgEdge, &'a Function);

impl std::fmt::Display for CfgEdgeDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.0.from {
            Some(from) => write!(f, "{}", from.dump(self.1))?,
            None => write!(f, "NULL")?,
        }
        write!(f, " -> {}", self.0.to.dump(self.1))
    }
}

/// The outcome of the constant propagation on a function.
///
/// Holds the lattice value computed for each instruction result, and the set
/// of control flow edges found to be executable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SccpResult {
    facts: BTreeMap<Value, ConstantValue>,
    executable: BTreeSet<CfgEdge>,
}

impl SccpResult {
    /// Return the fact stored for an instruction result, if any.
    pub fn fact(&self, value: Value) -> Option<ConstantValue> {
        self.facts.get(&value).cloned()
    }

    /// Return what is known about any value.
    ///
    /// Literals are constant, function arguments are unknown inputs, and
    /// instruction results without a fact have not been evaluated yet.
    pub fn value_fact(&self, func: &Function, value: Value) -> ConstantValue {
        if let Some(imm) = func.get_const_int(value) {
            return ConstantValue::Constant(imm);
        }
        if func.get_value_arg(value).is_some() {
            return ConstantValue::Bottom;
        }
        self.fact(value).unwrap_or(ConstantValue::Top)
    }

    /// Return an iterator over all stored facts, in value order.
    pub fn facts<'a>(&'a self) -> impl Iterator<Item = (Value, ConstantValue)> + 'a {
        self.facts.iter().map(|(&v, &c)| (v, c))
    }

    /// Return an iterator over all values found to be constant.
    pub fn constants<'a>(&'a self) -> impl Iterator<Item = (Value, i64)> + 'a {
        self.facts()
            .filter_map(|(v, c)| c.as_constant().map(|imm| (v, imm)))
    }

    /// Check whether an edge was found to be executable.
    pub fn is_executable_edge(&self, edge: CfgEdge) -> bool {
        self.executable.contains(&edge)
    }

    /// Check whether a block is the target of an executable edge.
    pub fn is_executable_block(&self, bb: Block) -> bool {
        self.executable_incoming(bb) > 0
    }

    /// Return the number of executable edges entering a block.
    pub fn executable_incoming(&self, bb: Block) -> usize {
        self.executable.iter().filter(|edge| edge.to == bb).count()
    }

    /// Return an iterator over all executable edges.
    pub fn executable_edges<'a>(&'a self) -> impl Iterator<Item = CfgEdge> + 'a {
        self.executable.iter().cloned()
    }

    /// Dump the result in human-readable form.
    pub fn dump<'a>(&'a self, func: &'a Function) -> SccpResultDumper<'a> {
        SccpResultDumper(self, func)
    }
}

/// Temporary object to dump an `SccpResult` in human-readable form.
pub struct SccpResultDumper<'a>(&'a SccpResult, &'a Function);

impl std::fmt::Display for SccpResultDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (result, func) = (self.0, self.1);
        write!(f, "SCCP facts of @{}:\n", func.name())?;
        for (value, fact) in result.facts() {
            write!(f, "  {} : {}\n", value.dump(func), fact)?;
        }
        write!(f, "Executable edges of @{}:\n", func.name())?;
        for edge in result.executable_edges() {
            write!(f, "  {}\n", edge.dump(func))?;
        }
        Ok(())
    }
}

/// Run the constant propagation on a function.
///
/// The function is not modified. Use `transform` to apply the result.
pub fn analyze(func: &Function, opts: &SccpOptions) -> SccpResult {
    let mut solver = Solver::new(func, opts);
    solver.solve();
    solver.state
}

/// The state of one run of the constant propagation.
struct Solver<'a> {
    func: &'a Function,
    opts: &'a SccpOptions,
    cfg_worklist: BTreeSet<CfgEdge>,
    ssa_worklist: BTreeSet<Inst>,
    state: SccpResult,
}

impl<'a> Solver<'a> {
    fn new(func: &'a Function, opts: &'a SccpOptions) -> Self {
        Self {
            func,
            opts,
            cfg_worklist: Default::default(),
            ssa_worklist: Default::default(),
            state: Default::default(),
        }
    }

    /// Process both worklists until a fixpoint is reached.
    ///
    /// Pending control flow edges always take priority over pending
    /// instructions.
    fn solve(&mut self) {
        let entry = match self.func.first_block() {
            Some(bb) => bb,
            None => return,
        };
        self.cfg_worklist.insert(CfgEdge::entry(entry));
        loop {
            if let Some(edge) = pop(&mut self.cfg_worklist, self.opts.cfg_order) {
                self.visit_edge(edge);
            } else if let Some(inst) = pop(&mut self.ssa_worklist, self.opts.ssa_order) {
                self.visit_use(inst);
            } else {
                break;
            }
        }
        trace!(
            "Solved @{}: {} facts, {} executable edges",
            self.func.name(),
            self.state.facts.len(),
            self.state.executable.len()
        );
    }

    /// Mark an edge executable and evaluate the block it enters.
    fn visit_edge(&mut self, edge: CfgEdge) {
        if !self.state.executable.insert(edge) {
            trace!("Skipping {}, already executable", edge.dump(self.func));
            return;
        }
        trace!("Visiting {}", edge.dump(self.func));
        let func = self.func;
        let bb = edge.to;

        // Phi nodes are re-evaluated on every new incoming edge.
        for inst in func.phis(bb) {
            self.visit_inst(inst);
        }

        // The rest of the block only on the first incoming edge.
        if self.state.executable_incoming(bb) == 1 {
            for inst in func.insts(bb) {
                if !func[inst].opcode().is_phi() {
                    self.visit_inst(inst);
                }
            }
        }

        // Fall through unconditional control flow right away.
        if let [succ] = *func.successors(bb) {
            self.push_edge(CfgEdge::new(bb, succ));
        }
    }

    /// Re-evaluate an instruction one of whose operands changed.
    fn visit_use(&mut self, inst: Inst) {
        let func = self.func;
        let reachable = func[inst].opcode().is_phi()
            || func
                .inst_block(inst)
                .map(|bb| self.state.is_executable_block(bb))
                .unwrap_or(false);
        if reachable {
            self.visit_inst(inst);
        } else {
            trace!("Skipping {}, block not executable", inst.dump(func));
        }
    }

    /// Evaluate an instruction and record the outcome.
    fn visit_inst(&mut self, inst: Inst) {
        let func = self.func;
        let mut visitor = Visitor::new(func, &self.state);
        let value = visitor.visit(inst);
        for edge in visitor.into_activated() {
            self.push_edge(edge);
        }

        let result = match func.get_inst_result(inst) {
            Some(result) => result,
            None => return,
        };
        let old = self.state.facts.get(&result).cloned();
        if old == Some(value) {
            return;
        }
        debug_assert!(
            old.map(|old| value.is_at_or_below(old)).unwrap_or(true),
            "fact of {} moved up from {:?} to {:?}",
            result.dump(func),
            old,
            value
        );
        trace!("Fact {} : {}", result.dump(func), value);
        self.state.facts.insert(result, value);
        self.ssa_worklist.extend(func.uses(result));
    }

    /// Schedule an edge, unless it is already known to be executable.
    fn push_edge(&mut self, edge: CfgEdge) {
        if !self.state.is_executable_edge(edge) {
            self.cfg_worklist.insert(edge);
        }
    }
}

/// Take the next item off a worklist.
fn pop<T: Ord + Copy>(worklist: &mut BTreeSet<T>, order: WorklistOrder) -> Option<T> {
    let next = match order {
        WorklistOrder::Ascending => worklist.iter().next().cloned(),
        WorklistOrder::Descending => worklist.iter().next_back().cloned(),
    }?;
    worklist.remove(&next);
    Some(next)
}
