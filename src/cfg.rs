//! The control-flow graph for a single function.
//!
//! Adapted from the teaching compiler's `middle_end::analysis::Cfg`: the
//! same idea (compute successor/predecessor edge sets once per function so
//! forward and backward queries are both cheap), stripped of the
//! struct-layout/address-taken bookkeeping that compiler needed for its own
//! optimization passes, which this detector has no use for. `loop_headers`
//! is kept from the teacher's `Cfg` too, even though nothing in this crate
//! currently reads it (the condition allocator's own path enumeration tracks
//! visited blocks directly rather than consulting it) — cheap enough to
//! carry as the one piece of loop-structure information a future guard
//! allocator refinement would reach for first.

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use crate::ir::{bb_id, BbId, Function, Terminator};

#[derive(Clone, Debug)]
pub struct Cfg {
    pub entry: BbId,
    pub exit: BbId,
    succ_edges: Map<BbId, Set<BbId>>,
    pred_edges: Map<BbId, Set<BbId>>,
    pub loop_headers: Set<BbId>,
}

impl Cfg {
    pub fn new(function: &Function) -> Self {
        fn insert_edge(map: &mut Map<BbId, Set<BbId>>, key: &BbId, value: &BbId) {
            map.entry(key.clone())
                .and_modify(|s| {
                    s.insert(value.clone());
                })
                .or_insert_with(|| [value.clone()].into());
        }

        let entry = bb_id("entry");
        let mut exit = bb_id("exit");
        let mut succ_edges: Map<BbId, Set<BbId>> = Map::new();
        let mut pred_edges: Map<BbId, Set<BbId>> = Map::new();

        pred_edges.insert(entry.clone(), Set::new());

        for (bbid, bb) in &function.body {
            match &bb.term {
                Terminator::Branch { tt, ff, .. } => {
                    insert_edge(&mut succ_edges, bbid, tt);
                    insert_edge(&mut succ_edges, bbid, ff);
                    insert_edge(&mut pred_edges, tt, bbid);
                    insert_edge(&mut pred_edges, ff, bbid);
                }
                Terminator::Jump(next_bb) => {
                    insert_edge(&mut succ_edges, bbid, next_bb);
                    insert_edge(&mut pred_edges, next_bb, bbid);
                }
                Terminator::Ret(_) => {
                    succ_edges.entry(bbid.clone()).or_default();
                    exit = bbid.clone();
                }
            }
        }

        let mut cfg = Cfg {
            entry,
            exit,
            succ_edges,
            pred_edges,
            loop_headers: Set::new(),
        };
        cfg.loop_headers = cfg.find_loop_headers();
        cfg
    }

    pub fn succ(&self, bb: &BbId) -> impl Iterator<Item = &BbId> {
        self.succ_edges.get(bb).into_iter().flatten()
    }

    pub fn pred(&self, bb: &BbId) -> impl Iterator<Item = &BbId> {
        self.pred_edges.get(bb).into_iter().flatten()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BbId> {
        self.succ_edges.keys()
    }

    fn find_loop_headers(&self) -> Set<BbId> {
        let mut headers = Set::new();
        let mut visited: Set<BbId> = Set::new();
        visited.insert(self.entry.clone());
        self.recursive_search(&self.entry, visited, &mut headers);
        headers
    }

    fn recursive_search(&self, curr: &BbId, visited: Set<BbId>, headers: &mut Set<BbId>) {
        for succ in self.succ(curr) {
            if visited.contains(succ) {
                headers.insert(succ.clone());
            } else if *succ == self.exit {
                continue;
            } else {
                let mut next_visited = visited.clone();
                next_visited.insert(succ.clone());
                self.recursive_search(succ, next_visited, headers);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{func_id, BasicBlock, Function, Terminator};
    use std::collections::BTreeMap;

    fn straight_line() -> Function {
        let mut body = BTreeMap::new();
        body.insert(
            bb_id("entry"),
            BasicBlock {
                id: bb_id("entry"),
                insts: vec![],
                term: Terminator::Jump(bb_id("exit")),
            },
        );
        body.insert(
            bb_id("exit"),
            BasicBlock {
                id: bb_id("exit"),
                insts: vec![],
                term: Terminator::Ret(None),
            },
        );
        Function {
            id: func_id("f"),
            params: vec![],
            body,
        }
    }

    #[test]
    fn succ_pred_are_symmetric() {
        let cfg = Cfg::new(&straight_line());
        assert_eq!(cfg.succ(&bb_id("entry")).collect::<Vec<_>>(), vec![&bb_id("exit")]);
        assert_eq!(cfg.pred(&bb_id("exit")).collect::<Vec<_>>(), vec![&bb_id("entry")]);
    }

    #[test]
    fn no_loop_headers_in_straight_line_code() {
        let cfg = Cfg::new(&straight_line());
        assert!(cfg.loop_headers.is_empty());
    }
}
