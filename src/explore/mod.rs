//! C4/C5/C7: the bi-directional value-flow exploration engine.
//!
//! [`Query`] owns everything one deallocation source's traversal needs
//! (the SVFG/IR it walks, the bounded resources it mutates: path recorder,
//! per-node guard map, accumulated report). The exploration itself is
//! spread across three files by concern, each contributing `impl Query`
//! blocks: `backward` (C4), `forward` (C5, with the C6 candidate filter
//! inlined into its one call site), and `verifier` (C7).

mod backward;
mod forward;
mod verifier;

use std::collections::BTreeMap as Map;

use crate::condition::{Condition, GuardAllocator};
use crate::config::Config;
use crate::ir::{FuncId, Program};
use crate::path_recorder::PathRecorder;
use crate::report::Report;
use crate::reachability::ReachabilityOracle;
use crate::svfg::{NodeId, Svfg};

/// The state threaded through one source's backward-then-forward walk.
/// Built fresh per source by the orchestrator (C8); not `Send`/`Sync` by
/// design — see §5, one query per thread.
pub struct Query<'p> {
    pub(crate) program: &'p Program,
    pub(crate) svfg: &'p Svfg,
    pub(crate) config: &'p Config,
    pub(crate) is_sink: &'p dyn Fn(&FuncId) -> bool,
    pub(crate) reachability: ReachabilityOracle,
    pub(crate) guards: GuardAllocator<'p>,
    pub(crate) path: PathRecorder<NodeId>,
    pub(crate) node_conditions: Map<NodeId, Condition>,
    pub(crate) report: Report,
}

impl<'p> Query<'p> {
    pub fn new(program: &'p Program, svfg: &'p Svfg, config: &'p Config, is_sink: &'p dyn Fn(&FuncId) -> bool) -> Self {
        Query {
            program,
            svfg,
            config,
            is_sink,
            reachability: ReachabilityOracle::new(),
            guards: GuardAllocator::new(program),
            path: PathRecorder::new(),
            node_conditions: Map::new(),
            report: Report::new(!config.report_num_only),
        }
    }

    pub fn into_report(self) -> Report {
        self.report
    }
}
