//! C4: the backward explorer.
//!
//! Ported from `searchBackward` in
//! `original_source/lib/SABER/UseAfterFreeChecker.cpp`.

use log::{debug, trace};

use crate::context::{match_backward, Context};
use crate::svfg::{NodeId, SvfgEdge};

use super::Query;

impl<'p> Query<'p> {
    /// Walk in-edges from `curr`, climbing toward value-flow roots. `ctx`
    /// is threaded mutably through the in-edge loop exactly as in the
    /// original: a successful `match_backward` on one sibling in-edge
    /// leaves its mark on `ctx` for the *next* sibling too, only a fresh
    /// `ctx.clone()` is handed down into the recursive call. This is not a
    /// bug to fix — see the design notes on rule 4 of `match_backward` — so
    /// it is ported literally rather than reset per iteration.
    pub fn search_backward(&mut self, curr: NodeId, prev: Option<NodeId>, mut ctx: Context) {
        if ctx.len() > self.config.backward_bound() {
            trace!("backward: pruning at {curr:?}, context length {} exceeds bound", ctx.len());
            return;
        }

        trace!("backward: visiting {curr:?} (context depth {})", ctx.len());
        self.path.add(curr);

        if ctx.all_calls() {
            assert!(
                !ctx.is_empty(),
                "backward explorer reached a pivot with an empty context (seeded context must be non-empty)"
            );
            self.path.push();
            let top = ctx.top().expect("non-empty by the assert above").clone();
            let cs_id = top.call_site.expect("Call*/Ret* edges always carry a CallSiteId");
            let cs = self.svfg.call_site_inst(cs_id).clone();
            debug!("backward: pivot reached at {curr:?}, forking to forward search from call site {cs}");
            // The pivot's forward search inherits the backward walk's `prev`
            // (`searchForward(CurrNode, PrevNode, ...)` in the original) so
            // it won't immediately re-cross the edge the backward walk just
            // arrived on.
            self.search_forward(curr, prev, Context::new(), &cs, true);
            self.path.pop(1);
        }

        let in_edges: Vec<SvfgEdge> = self.svfg.in_edges(curr).cloned().collect();
        for in_edge in in_edges {
            let ancestor = in_edge.src;
            if ancestor == curr {
                continue;
            }
            let ancestor_node = self.svfg.node(ancestor);
            if ancestor_node.anchor.is_none() {
                continue;
            }

            if in_edge.kind.is_call() || in_edge.kind.is_ret() {
                if !match_backward(&mut ctx, self.svfg, &in_edge) {
                    continue;
                }
            } else if self.config.no_global {
                let curr_func = self.svfg.node(curr).anchor.as_ref().map(|a| &a.func);
                let ancestor_func = ancestor_node.anchor.as_ref().map(|a| &a.func);
                if curr_func != ancestor_func {
                    continue;
                }
            }

            self.path.push();
            self.search_backward(ancestor, Some(curr), ctx.clone());
            self.path.pop(1);
        }
    }
}
