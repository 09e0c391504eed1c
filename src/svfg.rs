//! The Sparse Value-Flow Graph (SVFG) data model (§3) and the provider
//! interface it is queried through (§6). Building the SVFG is pointer
//! analysis's job and is out of scope here (§1): this module only defines
//! the shape the explorers walk, plus an in-memory store good enough to
//! deserialize a collaborator-produced SVFG from JSON, or to build small
//! fixtures by hand in tests.

use std::collections::BTreeMap as Map;

use serde::{Deserialize, Serialize};

use crate::ir::{FuncId, GlobalInstId, Instruction, Program, ValueId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSiteId(pub u32);

/// A node id reserved to stand for "no node" (⊥), the synthetic destination
/// of the seed edge the orchestrator fabricates for each source (§4.9). It
/// never appears as a key in [`Svfg`]'s node map; an edge whose `dst` is
/// `BOTTOM` must never have its destination dereferenced.
pub const BOTTOM: NodeId = NodeId(u32::MAX);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Statement,
    Phi,
    ActualParam,
    FormalParam,
    ActualRet,
    FormalRet,
    NullPtr,
    ActualIn,
    ActualOut,
}

/// An SVFG node: an optional basic-block anchor `BB(N)`, a kind tag, and an
/// associated IR value `V(N)` (used by the guard solver to pick the value
/// being tracked, via `set_current_value`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SvfgNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// `BB(N)`. `None` only for `NullPtr` nodes.
    pub anchor: Option<GlobalInstId>,
    /// `V(N)`.
    pub value: Option<ValueId>,
}

impl SvfgNode {
    pub fn has_block(&self) -> bool {
        self.anchor.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    IntraDirect,
    IntraIndirect,
    CallDirect,
    CallIndirect,
    RetDirect,
    RetIndirect,
}

impl EdgeKind {
    pub fn is_call(self) -> bool {
        matches!(self, EdgeKind::CallDirect | EdgeKind::CallIndirect)
    }

    pub fn is_ret(self) -> bool {
        matches!(self, EdgeKind::RetDirect | EdgeKind::RetIndirect)
    }

    pub fn is_intra(self) -> bool {
        matches!(self, EdgeKind::IntraDirect | EdgeKind::IntraIndirect)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvfgEdge {
    pub id: EdgeId,
    pub src: NodeId,
    pub dst: NodeId,
    pub kind: EdgeKind,
    /// Present iff `kind.is_call() || kind.is_ret()`.
    pub call_site: Option<CallSiteId>,
}

/// The SVFG provider (§6): enumerates nodes, iterates in-/out-edges,
/// classifies edges, maps `CallSiteId` to call-site instructions, and
/// builds the synthetic seed edge the orchestrator needs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Svfg {
    nodes: Map<NodeId, SvfgNode>,
    edges: Map<EdgeId, SvfgEdge>,
    out_edges: Map<NodeId, Vec<EdgeId>>,
    in_edges: Map<NodeId, Vec<EdgeId>>,
    call_sites: Map<CallSiteId, GlobalInstId>,
    /// The PAG's `(call site -> actual-argument node list)` map (§6): the
    /// only PAG capability this core needs is enumerating call sites and
    /// their argument nodes.
    call_site_args: Map<GlobalInstId, Vec<NodeId>>,
    #[serde(skip)]
    next_node: u32,
    #[serde(skip)]
    next_edge: u32,
    #[serde(skip)]
    next_call_site: u32,
}

impl Svfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: NodeKind, anchor: Option<GlobalInstId>, value: Option<ValueId>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, SvfgNode { id, kind, anchor, value });
        id
    }

    /// Intern a call site: two calls with an equal `GlobalInstId` get the
    /// same `CallSiteId`, per the "stable across queries" invariant in §3.
    pub fn intern_call_site(&mut self, inst: GlobalInstId) -> CallSiteId {
        if let Some((&id, _)) = self.call_sites.iter().find(|(_, v)| **v == inst) {
            return id;
        }
        let id = CallSiteId(self.next_call_site);
        self.next_call_site += 1;
        self.call_sites.insert(id, inst);
        id
    }

    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, kind: EdgeKind, call_site: Option<CallSiteId>) -> EdgeId {
        debug_assert_eq!(kind.is_call() || kind.is_ret(), call_site.is_some());
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            SvfgEdge {
                id,
                src,
                dst,
                kind,
                call_site,
            },
        );
        if dst != BOTTOM {
            self.in_edges.entry(dst).or_default().push(id);
        }
        if src != BOTTOM {
            self.out_edges.entry(src).or_default().push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &SvfgNode {
        self.nodes.get(&id).unwrap_or_else(|| panic!("dangling SVFG node id {id:?}"))
    }

    pub fn edge(&self, id: EdgeId) -> &SvfgEdge {
        self.edges.get(&id).expect("dangling SVFG edge id")
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SvfgNode> {
        self.nodes.values()
    }

    /// Iterate in-edges of `id` in stable (insertion) order.
    pub fn in_edges(&self, id: NodeId) -> impl Iterator<Item = &SvfgEdge> {
        self.in_edges
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |eid| self.edge(*eid))
    }

    /// Iterate out-edges of `id` in stable (insertion) order.
    pub fn out_edges(&self, id: NodeId) -> impl Iterator<Item = &SvfgEdge> {
        self.out_edges
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |eid| self.edge(*eid))
    }

    pub fn call_site_inst(&self, id: CallSiteId) -> &GlobalInstId {
        self.call_sites
            .get(&id)
            .unwrap_or_else(|| panic!("unknown call site id {id:?}"))
    }

    /// Read-only counterpart to [`Svfg::intern_call_site`]: look up the id
    /// of an already-registered call site without allocating a new one.
    pub fn call_site_id(&self, inst: &GlobalInstId) -> Option<CallSiteId> {
        self.call_sites.iter().find(|(_, v)| *v == inst).map(|(&id, _)| id)
    }

    pub fn add_call_site_args(&mut self, call_site: GlobalInstId, args: Vec<NodeId>) {
        self.call_site_args.insert(call_site, args);
    }

    /// Every call site the PAG knows about, with its actual-argument list,
    /// in stable (key) order.
    pub fn call_sites_with_args(&self) -> impl Iterator<Item = (&GlobalInstId, &[NodeId])> {
        self.call_site_args.iter().map(|(cs, args)| (cs, args.as_slice()))
    }

    pub fn call_site_args(&self, call_site: &GlobalInstId) -> &[NodeId] {
        self.call_site_args.get(call_site).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn src_function(&self, edge: &SvfgEdge) -> FuncId {
        self.node(edge.src)
            .anchor
            .as_ref()
            .map(|a| a.func.clone())
            .unwrap_or_else(|| panic!("SVFG node {:?} has no block anchor", edge.src))
    }

    pub fn dst_function(&self, edge: &SvfgEdge) -> FuncId {
        self.node(edge.dst)
            .anchor
            .as_ref()
            .map(|a| a.func.clone())
            .unwrap_or_else(|| panic!("SVFG node {:?} has no block anchor", edge.dst))
    }

    /// Build the synthetic `(src -> BOTTOM)` Call-direct seed edge the
    /// orchestrator registers for a deallocation source (§4.9), labeled
    /// with the deallocator's call-site id. Not inserted into the graph's
    /// adjacency lists — it only ever seeds a `Context`, so it needs no
    /// durable id of its own.
    pub fn synthetic_seed_edge(&self, src: NodeId, call_site: CallSiteId) -> SvfgEdge {
        SvfgEdge {
            id: EdgeId(u32::MAX),
            src,
            dst: BOTTOM,
            kind: EdgeKind::CallDirect,
            call_site: Some(call_site),
        }
    }

    /// The underlying IR instruction a Statement node is anchored to, i.e.
    /// `I(S)` in §4.5, if it has one.
    pub fn instruction<'p>(&self, program: &'p Program, node: &SvfgNode) -> Option<&'p Instruction> {
        let anchor = node.anchor.as_ref()?;
        program.functions.get(&anchor.func)?.inst(&anchor.inst_id())
    }
}

/// Small hand-built SVFG fixtures shared by this crate's own tests (the
/// context-matching tests and the end-to-end scenarios in `tests/`).
#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::ir::{bb_id, func_id};

    pub struct CallRetFixture {
        svfg: Svfg,
        call_edge: EdgeId,
        ret_edge: EdgeId,
    }

    impl std::ops::Deref for CallRetFixture {
        type Target = Svfg;
        fn deref(&self) -> &Svfg {
            &self.svfg
        }
    }

    impl CallRetFixture {
        pub fn call_edge_id(&self) -> EdgeId {
            self.call_edge
        }
        pub fn ret_edge_id(&self) -> EdgeId {
            self.ret_edge
        }
    }

    pub fn tiny_call_ret_svfg() -> CallRetFixture {
        let mut svfg = Svfg::new();
        let caller = GlobalInstId::new(func_id("caller"), bb_id("entry"), 0);
        let callee_entry = GlobalInstId::new(func_id("callee"), bb_id("entry"), 0);

        let cs = svfg.intern_call_site(caller.clone());
        let n_actual = svfg.add_node(NodeKind::ActualParam, Some(caller), None);
        let n_formal = svfg.add_node(NodeKind::FormalParam, Some(callee_entry), None);

        let call_edge = svfg.add_edge(n_actual, n_formal, EdgeKind::CallDirect, Some(cs));
        let ret_edge = svfg.add_edge(n_formal, n_actual, EdgeKind::RetDirect, Some(cs));

        CallRetFixture {
            svfg,
            call_edge,
            ret_edge,
        }
    }

    pub struct TwoCallsiteFixture {
        svfg: Svfg,
        call_edge: EdgeId,
        other_ret_edge: EdgeId,
    }

    impl std::ops::Deref for TwoCallsiteFixture {
        type Target = Svfg;
        fn deref(&self) -> &Svfg {
            &self.svfg
        }
    }

    impl TwoCallsiteFixture {
        pub fn call_edge_id(&self) -> EdgeId {
            self.call_edge
        }
        pub fn other_ret_edge_id(&self) -> EdgeId {
            self.other_ret_edge
        }
    }

    pub fn two_callsite_svfg() -> TwoCallsiteFixture {
        let mut svfg = Svfg::new();
        let call_a = GlobalInstId::new(func_id("caller"), bb_id("entry"), 0);
        let call_b = GlobalInstId::new(func_id("other_caller"), bb_id("entry"), 0);
        let callee_entry = GlobalInstId::new(func_id("callee"), bb_id("entry"), 0);

        let cs_a = svfg.intern_call_site(call_a.clone());
        let cs_b = svfg.intern_call_site(call_b.clone());

        let n_a = svfg.add_node(NodeKind::ActualParam, Some(call_a), None);
        let n_formal = svfg.add_node(NodeKind::FormalParam, Some(callee_entry), None);
        let n_b = svfg.add_node(NodeKind::ActualParam, Some(call_b), None);

        let call_edge = svfg.add_edge(n_a, n_formal, EdgeKind::CallDirect, Some(cs_a));
        let other_ret_edge = svfg.add_edge(n_formal, n_b, EdgeKind::RetDirect, Some(cs_b));

        TwoCallsiteFixture {
            svfg,
            call_edge,
            other_ret_edge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{bb_id, func_id};

    #[test]
    fn call_site_interning_is_stable() {
        let mut svfg = Svfg::new();
        let inst = GlobalInstId::new(func_id("f"), bb_id("entry"), 2);
        let a = svfg.intern_call_site(inst.clone());
        let b = svfg.intern_call_site(inst);
        assert_eq!(a, b);
    }

    #[test]
    fn seed_edge_is_not_wired_into_adjacency() {
        let mut svfg = Svfg::new();
        let anchor = GlobalInstId::new(func_id("f"), bb_id("entry"), 0);
        let n = svfg.add_node(NodeKind::ActualParam, Some(anchor.clone()), None);
        let cs = svfg.intern_call_site(anchor);
        let seed = svfg.synthetic_seed_edge(n, cs);
        assert_eq!(seed.dst, BOTTOM);
        assert_eq!(svfg.out_edges(n).count(), 0);
    }
}
