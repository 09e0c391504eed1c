//! C1: intraprocedural CFG reachability oracle.
//!
//! Ported from `original_source/lib/SABER/CFGReachabilityAnalysis.cpp`: a
//! per-function bit-matrix, one row per queried destination, built lazily by
//! a reverse BFS over CFG predecessors the first time that destination is
//! asked about. The original keeps the matrix as a raw `BitVector[]` indexed
//! by an `unordered_map<BasicBlock*, int>`; here the analogous per-function
//! cache lives behind a `RefCell` so `&self` queries can still mutate it
//! (queries are never made concurrently within one analysis, per §5).

use std::cell::RefCell;
use std::collections::BTreeMap as Map;

use crate::cfg::Cfg;
use crate::ir::{BbId, Function, GlobalInstId, InstId, Program};

struct FunctionReachability {
    cfg: Cfg,
    index: Map<BbId, usize>,
    blocks: Vec<BbId>,
    analyzed: Vec<bool>,
    /// `rows[dst][src] == true` iff `src` can reach `dst`.
    rows: Vec<Vec<bool>>,
}

impl FunctionReachability {
    fn new(function: &Function) -> Self {
        let cfg = Cfg::new(function);
        let mut blocks: Vec<BbId> = function.body.keys().cloned().collect();
        blocks.sort();
        let index = blocks.iter().cloned().enumerate().map(|(i, b)| (b, i)).collect();
        let n = blocks.len();
        FunctionReachability {
            cfg,
            index,
            blocks,
            analyzed: vec![false; n],
            rows: vec![vec![false; n]; n],
        }
    }

    fn block_index(&self, bb: &BbId) -> usize {
        *self
            .index
            .get(bb)
            .unwrap_or_else(|| panic!("unknown basic block {bb} in reachability query"))
    }

    /// Reverse BFS from `dst` over CFG predecessors, mirroring
    /// `CFGReachability::mapReachability`.
    fn analyze(&mut self, dst_idx: usize) {
        if self.analyzed[dst_idx] {
            return;
        }

        let mut visited = vec![false; self.blocks.len()];
        let mut worklist = vec![self.blocks[dst_idx].clone()];
        let mut first_run = true;

        while let Some(block) = worklist.pop() {
            let block_idx = self.block_index(&block);
            if visited[block_idx] {
                continue;
            }
            visited[block_idx] = true;

            if !first_run {
                self.rows[dst_idx][block_idx] = true;
            } else {
                first_run = false;
            }

            for pred in self.cfg.pred(&block) {
                worklist.push(pred.clone());
            }
        }

        self.analyzed[dst_idx] = true;
    }

    fn can_reach(&mut self, src: &BbId, dst: &BbId) -> bool {
        let dst_idx = self.block_index(dst);
        let src_idx = self.block_index(src);
        self.analyze(dst_idx);
        self.rows[dst_idx][src_idx]
    }
}

/// Caches reachability results per function for the lifetime of the
/// oracle. Safe to share read-only across queries over *disjoint* functions;
/// per §5, use one oracle per analysis thread if sharing across threads.
pub struct ReachabilityOracle {
    cache: RefCell<Map<crate::ir::FuncId, FunctionReachability>>,
}

impl Default for ReachabilityOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityOracle {
    pub fn new() -> Self {
        ReachabilityOracle {
            cache: RefCell::new(Map::new()),
        }
    }

    /// `can_reach(src_bb, dst_bb)`, requires `parent(src_bb) == parent(dst_bb)`
    /// — enforced here by taking a single `function` both blocks must belong
    /// to.
    pub fn can_reach(&self, function: &Function, src: &BbId, dst: &BbId) -> bool {
        self.cache
            .borrow_mut()
            .entry(function.id.clone())
            .or_insert_with(|| FunctionReachability::new(function))
            .can_reach(src, dst)
    }

    /// `can_reach_inst(src_inst, dst_inst)`. When the two instructions share
    /// a basic block, returns true iff `src` appears before or equal to
    /// `dst` in program order; otherwise delegates to `can_reach`.
    pub fn can_reach_inst(&self, function: &Function, src: &InstId, dst: &InstId) -> bool {
        if src.0 == dst.0 {
            src.1 <= dst.1
        } else {
            self.can_reach(function, &src.0, &dst.0)
        }
    }

    /// The §4.6 bridge used by the forward explorer: cross-function pairs
    /// are conservatively reachable (interprocedural CFG reachability is a
    /// non-goal); same-function pairs defer to `can_reach_inst` and
    /// additionally require `from != to`.
    pub fn reachable(&self, program: &Program, from: &GlobalInstId, to: &GlobalInstId) -> bool {
        if from.func != to.func {
            return true;
        }
        let function = program
            .functions
            .get(&from.func)
            .unwrap_or_else(|| panic!("unknown function {}", from.func));
        from != to && self.can_reach_inst(function, &from.inst_id(), &to.inst_id())
    }
}
