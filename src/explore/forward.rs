//! C5: the forward explorer, with the C6 candidate filter inlined at its
//! one call site (§4.7: "C6 is the predicate embedded in C5").
//!
//! Ported from `searchForward` in
//! `original_source/lib/SABER/UseAfterFreeChecker.cpp`.

use log::{debug, trace};

use crate::context::{match_forward, Context};
use crate::ir::GlobalInstId;
use crate::svfg::{NodeId, NodeKind, SvfgEdge};

use super::Query;

impl<'p> Query<'p> {
    /// Walk out-edges from `curr`, looking for uses of the value freed at
    /// `cs`. `tag` is true as long as every call/ret boundary crossed so
    /// far is known to be CFG-reachable from `cs`; once false it stays
    /// false for the rest of that branch (§9: `tag` is never un-cleared).
    ///
    /// `ctx` is threaded mutably across the out-edge loop the same way
    /// `search_backward` threads its context — see that function's doc
    /// comment.
    pub fn search_forward(&mut self, curr: NodeId, prev: Option<NodeId>, mut ctx: Context, cs: &GlobalInstId, tag: bool) {
        if ctx.len() > self.config.forward_bound() {
            trace!("forward: pruning at {curr:?}, context length {} exceeds bound", ctx.len());
            return;
        }

        trace!("forward: visiting {curr:?} from free site {cs}, tag={tag}");
        self.path.add(curr);

        let node = self.svfg.node(curr).clone();
        if tag && node.kind == NodeKind::Statement {
            if let (Some(anchor), Some(value)) = (node.anchor.clone(), node.value.clone()) {
                if let Some(function) = self.program.functions.get(&anchor.func) {
                    for (bb, idx) in function.users_of(&value) {
                        let user_loc = GlobalInstId::new(anchor.func.clone(), bb, idx);
                        let user_inst = function
                            .inst(&user_loc.inst_id())
                            .expect("users_of returned a location the function doesn't have");

                        let is_use = user_inst.is_load_of(&value)
                            || user_inst.is_store_through(&value)
                            || user_inst.is_sink_call_on(&value, self.is_sink);

                        if is_use && self.reachability.reachable(self.program, cs, &user_loc) {
                            debug!("forward: candidate use {user_loc} of value freed at {cs}");
                            self.path.push();
                            if self.check(&user_loc) {
                                debug!("forward: guard satisfiable, reporting use-after-free at {user_loc}");
                                self.report.record(self.program, self.svfg, &self.path, &user_loc);
                            } else {
                                trace!("forward: candidate {user_loc} discharged by path-condition verifier");
                            }
                            self.path.pop(1);
                        }
                    }
                }
            }
        }

        let out_edges: Vec<SvfgEdge> = self.svfg.out_edges(curr).cloned().collect();
        for out_edge in out_edges {
            let child = out_edge.dst;
            if Some(child) == prev {
                continue;
            }
            let child_node = self.svfg.node(child);
            if child_node.anchor.is_none() {
                continue;
            }

            let mut next_tag = tag;
            if out_edge.kind.is_call() || out_edge.kind.is_ret() {
                let cs_id = out_edge.call_site.expect("Call*/Ret* edges always carry a CallSiteId");
                let cs2 = self.svfg.call_site_inst(cs_id).clone();
                if &cs2 == cs {
                    continue;
                }
                if !match_forward(&mut ctx, self.svfg, &out_edge) {
                    continue;
                }
                if !self.reachability.reachable(self.program, cs, &cs2) {
                    next_tag = false;
                }
            } else if self.config.no_global {
                let curr_func = self.svfg.node(curr).anchor.as_ref().map(|a| &a.func);
                let child_func = child_node.anchor.as_ref().map(|a| &a.func);
                if curr_func != child_func {
                    continue;
                }
            }

            self.path.push();
            self.search_forward(child, Some(curr), ctx.clone(), cs, next_tag);
            self.path.pop(1);
        }
    }
}
