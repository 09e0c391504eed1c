//! C7: the path-condition verifier.
//!
//! Ported from `UseAfterFreeChecker::check` in
//! `original_source/lib/SABER/UseAfterFreeChecker.cpp`.

use std::collections::{BTreeMap as Map, BTreeSet as Set, VecDeque};

use log::trace;

use crate::condition::{and, false_cond, or, true_cond};
use crate::ir::GlobalInstId;
use crate::svfg::NodeId;

use super::Query;

impl<'p> Query<'p> {
    /// Verify that the currently recorded path (`self.path`) admits a
    /// satisfying control-flow guard reaching `user`. `self.path` must end
    /// with the node `user` is a candidate use of; it must also contain
    /// exactly one adjacent duplicate — the backward/forward seam left by
    /// the pivot in `search_backward` — or this is a precondition
    /// violation and the analysis aborts (§7, §9 open question: "should
    /// abort cleanly").
    pub fn check(&mut self, user: &GlobalInstId) -> bool {
        if self.config.no_check {
            return true;
        }

        let path: Vec<NodeId> = self.path.as_slice().to_vec();
        let n = path.len();

        let source = (0..n.saturating_sub(1))
            .find(|&i| path[i] == path[i + 1])
            .map(|i| path[i])
            .expect("path-condition verifier invoked on a path with no backward/forward pivot");

        // Step 2: build the replay-as-forward successor relation.
        let mut succ: Map<NodeId, Set<NodeId>> = Map::new();
        let mut reached_source = false;
        for i in 1..n.saturating_sub(1) {
            if !reached_source {
                succ.entry(path[i]).or_default().insert(path[i - 1]);
            } else {
                succ.entry(path[i]).or_default().insert(path[i + 1]);
            }
            if path[i] == source {
                reached_source = true;
            }
        }

        // Step 3: fixed-point guard propagation.
        self.node_conditions.clear();
        self.node_conditions.insert(source, true_cond());
        let mut worklist = VecDeque::from([source]);

        while let Some(node_id) = worklist.pop_front() {
            let cond = self.node_conditions.get(&node_id).cloned().unwrap_or_else(false_cond);
            let node = self.svfg.node(node_id);
            self.guards.set_current_value(node.value.clone());

            let Some(succs) = succ.get(&node_id).cloned() else {
                continue;
            };
            let Some(node_anchor) = node.anchor.clone() else {
                continue;
            };

            for out_edge in self.svfg.out_edges(node_id).cloned().collect::<Vec<_>>() {
                let succ_id = out_edge.dst;
                if !succs.contains(&succ_id) {
                    continue;
                }
                let succ_node = self.svfg.node(succ_id);
                let Some(succ_anchor) = succ_node.anchor.clone() else {
                    continue;
                };

                self.guards.clear_cf_scratch();
                let vf_cond = if out_edge.kind.is_call() {
                    let call_site = self.svfg.call_site_inst(out_edge.call_site.expect("call edge carries a CallSiteId"));
                    self.guards.inter_call_guard(&node_anchor.func, &node_anchor.bb, &call_site.bb)
                } else if out_edge.kind.is_ret() {
                    let ret_site = self.svfg.call_site_inst(out_edge.call_site.expect("ret edge carries a CallSiteId"));
                    self.guards.inter_ret_guard(&succ_anchor.func, &ret_site.bb, &succ_anchor.bb)
                } else {
                    self.guards.intra_guard(&node_anchor.func, &node_anchor.bb, &succ_anchor.bb)
                };

                let new_cond = and(&cond, &vf_cond);
                let current = self.node_conditions.get(&succ_id).cloned().unwrap_or_else(false_cond);
                let merged = or(&current, &new_cond);
                if merged != current {
                    self.node_conditions.insert(succ_id, merged);
                    worklist.push_back(succ_id);
                }
            }
        }

        // Step 4: final intra guard from the path's last node to `user`.
        let top = *path.last().expect("path recorder must be non-empty during verification");
        let top_node = self.svfg.node(top);
        let top_anchor = top_node
            .anchor
            .clone()
            .expect("the node a candidate use was found at must have a block anchor");
        assert_eq!(
            top_anchor.func, user.func,
            "candidate use must be in the same function as the SVFG node that produced it"
        );

        self.guards.clear_cf_scratch();
        let tail = self.guards.intra_guard(&user.func, &top_anchor.bb, &user.bb);
        let top_cond = self.node_conditions.get(&top).cloned().unwrap_or_else(false_cond);
        let tail_guard = and(&top_cond, &tail);

        let path0_cond = self.node_conditions.get(&path[0]).cloned().unwrap_or_else(false_cond);
        let guard = and(&path0_cond, &tail_guard);

        let accepted = guard != false_cond();
        trace!("verifier: candidate {user} {}", if accepted { "accepted" } else { "discharged (guard is False)" });
        accepted
    }
}
