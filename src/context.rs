//! C3: the context stack engine.
//!
//! Balanced matching of Call*/Ret* SVFG edges as the walk crosses procedure
//! boundaries, ported from `matchContextB`/`matchContextF` in
//! `original_source/lib/SABER/UseAfterFreeChecker.cpp`.

use crate::svfg::{Svfg, SvfgEdge};

/// An ordered sequence of Call*/Ret* edges, bounded by `MaxCxtLen` (+1 for
/// the backward explorer). Semantically a stack: a Call* push can be
/// cancelled by a matching Ret* (same `CallSiteId`, opposite kind) and vice
/// versa.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    edges: Vec<SvfgEdge>,
}

impl Context {
    pub fn new() -> Self {
        Context { edges: Vec::new() }
    }

    pub fn seeded(edge: SvfgEdge) -> Self {
        Context { edges: vec![edge] }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn top(&self) -> Option<&SvfgEdge> {
        self.edges.last()
    }

    pub fn as_slice(&self) -> &[SvfgEdge] {
        &self.edges
    }

    /// True iff every edge currently on the context is a Call* edge — the
    /// pivot condition in the backward explorer (§4.4).
    pub fn all_calls(&self) -> bool {
        self.edges.iter().all(|e| e.kind.is_call())
    }

    /// True iff every edge currently on the context is a Ret* edge — used
    /// symmetrically by `match_forward`'s rule 3.
    pub fn all_rets(&self) -> bool {
        self.edges.iter().all(|e| e.kind.is_ret())
    }

    fn push(&mut self, edge: SvfgEdge) {
        self.edges.push(edge);
    }

    fn pop(&mut self) -> SvfgEdge {
        self.edges.pop().expect("pop() on an empty context")
    }
}

/// Backward context matching (§4.3, the "backward" direction): either
/// returns true and mutates `ctx` in place, or returns false leaving `ctx`
/// unchanged.
///
/// Crossing a Call edge while walking backward means entering the callee
/// whose value is being passed in; crossing a Ret edge means entering a
/// callee that returned a value. See the Design Notes: rule 3's
/// `dst_function(E) == src_function(Top)` check is specified exactly as in
/// the original and is not to be generalized.
pub fn match_backward(ctx: &mut Context, svfg: &Svfg, edge: &SvfgEdge) -> bool {
    let Some(top) = ctx.top().cloned() else {
        ctx.push(edge.clone());
        return true;
    };

    if edge.call_site == top.call_site {
        if edge.kind.is_call() != top.kind.is_call() {
            ctx.pop();
            return true;
        }
        return false;
    }

    if edge.kind.is_call() {
        if ctx.all_calls() && svfg.dst_function(edge) == svfg.src_function(&top) {
            ctx.push(edge.clone());
            return true;
        }
        return false;
    }

    debug_assert!(edge.kind.is_ret());
    ctx.push(edge.clone());
    true
}

/// Forward context matching (§4.3, the "forward" direction): symmetric to
/// [`match_backward`] with Call and Ret swapped.
pub fn match_forward(ctx: &mut Context, svfg: &Svfg, edge: &SvfgEdge) -> bool {
    let Some(top) = ctx.top().cloned() else {
        ctx.push(edge.clone());
        return true;
    };

    if edge.call_site == top.call_site {
        if edge.kind.is_call() != top.kind.is_call() {
            ctx.pop();
            return true;
        }
        return false;
    }

    if edge.kind.is_ret() {
        if ctx.all_rets() && svfg.src_function(edge) == svfg.dst_function(&top) {
            ctx.push(edge.clone());
            return true;
        }
        return false;
    }

    debug_assert!(edge.kind.is_call());
    ctx.push(edge.clone());
    true
}
