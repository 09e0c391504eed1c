//! The intermediate representation this detector analyzes.
//!
//! A whole program is a set of functions, each a set of basic blocks, each a
//! straight-line list of instructions ending in one terminator. This is
//! deliberately generic (no type system, no struct layout) compared to the
//! teaching compiler's `lir` module this grew out of: the SVFG collaborator
//! (out of scope, §6) is assumed to have already resolved pointer targets,
//! so the IR only needs to carry enough shape for the CFG reachability
//! oracle (C1) and the candidate filter (C6) to do their jobs — classifying
//! instructions as Load/Store/Call and answering def-use queries.

use std::collections::BTreeMap as Map;
use std::fmt;

use serde::{Deserialize, Serialize};

// SECTION: identifiers

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FuncId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BbId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(pub String);

pub fn func_id(name: impl Into<String>) -> FuncId {
    FuncId(name.into())
}

pub fn bb_id(name: impl Into<String>) -> BbId {
    BbId(name.into())
}

pub fn value_id(name: impl Into<String>) -> ValueId {
    ValueId(name.into())
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruction id within a function: the block it lives in plus its index in
/// program order in that block.
pub type InstId = (BbId, usize);

/// An instruction id that also carries which function it belongs to, used
/// whenever two instructions from potentially different functions need to be
/// compared (the C1 bridge used by the forward explorer, C5 §4.6).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlobalInstId {
    pub func: FuncId,
    pub bb: BbId,
    pub index: usize,
}

impl GlobalInstId {
    pub fn new(func: FuncId, bb: BbId, index: usize) -> Self {
        GlobalInstId { func, bb, index }
    }

    pub fn inst_id(&self) -> InstId {
        (self.bb.clone(), self.index)
    }
}

impl fmt::Display for GlobalInstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.func, self.bb, self.index)
    }
}

// SECTION: instructions

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Value(ValueId),
    Const(i64),
    Null,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Const(c) => write!(f, "{c}"),
            Operand::Null => write!(f, "null"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `lhs = *ptr`
    Load { lhs: ValueId, ptr: ValueId },
    /// `*ptr = op` — a store *to* the pointer, not storing the pointer
    /// itself into memory.
    Store { ptr: ValueId, op: Operand },
    /// A direct call to a statically known function.
    Call {
        lhs: Option<ValueId>,
        callee: FuncId,
        args: Vec<Operand>,
    },
    /// A call through a function-valued operand.
    CallIndirect {
        lhs: Option<ValueId>,
        callee: Operand,
        args: Vec<Operand>,
    },
    /// Anything else (arithmetic, comparisons, casts, phi, address-of, …).
    /// Kept coarse: the detector only needs to know whether it defines a
    /// value and what it uses, not what it computes.
    Other {
        lhs: Option<ValueId>,
        uses: Vec<Operand>,
        mnemonic: &'static str,
    },
}

impl Instruction {
    /// The value this instruction defines, if any (a void instruction, e.g.
    /// a bare store, defines none).
    pub fn result(&self) -> Option<&ValueId> {
        match self {
            Instruction::Load { lhs, .. } => Some(lhs),
            Instruction::Store { .. } => None,
            Instruction::Call { lhs, .. } => lhs.as_ref(),
            Instruction::CallIndirect { lhs, .. } => lhs.as_ref(),
            Instruction::Other { lhs, .. } => lhs.as_ref(),
        }
    }

    /// The operands this instruction reads.
    pub fn uses(&self) -> Vec<Operand> {
        match self {
            Instruction::Load { ptr, .. } => vec![Operand::Value(ptr.clone())],
            Instruction::Store { ptr, op } => vec![Operand::Value(ptr.clone()), op.clone()],
            Instruction::Call { args, .. } => args.clone(),
            Instruction::CallIndirect { callee, args, .. } => {
                let mut u = vec![callee.clone()];
                u.extend(args.iter().cloned());
                u
            }
            Instruction::Other { uses, .. } => uses.clone(),
        }
    }

    /// Iff this instruction is a load whose pointer operand is exactly
    /// `pointer` (a use-after-free candidate per C6).
    pub fn is_load_of(&self, pointer: &ValueId) -> bool {
        matches!(self, Instruction::Load { ptr, .. } if ptr == pointer)
    }

    /// Iff this instruction stores *through* `pointer` (as opposed to
    /// storing `pointer`'s value into some other location).
    pub fn is_store_through(&self, pointer: &ValueId) -> bool {
        matches!(self, Instruction::Store { ptr, .. } if ptr == pointer)
    }

    /// Iff this instruction calls a sink-like (deallocator) function with
    /// `pointer` as its first argument (a double-free candidate).
    pub fn is_sink_call_on(&self, pointer: &ValueId, is_sink: impl Fn(&FuncId) -> bool) -> bool {
        match self {
            Instruction::Call { callee, args, .. } => {
                is_sink(callee) && args.first() == Some(&Operand::Value(pointer.clone()))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Load { lhs, ptr } => write!(f, "{lhs} = load {ptr}"),
            Instruction::Store { ptr, op } => write!(f, "store {op}, {ptr}"),
            Instruction::Call { lhs, callee, args } => {
                if let Some(lhs) = lhs {
                    write!(f, "{lhs} = ")?;
                }
                let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "call {callee}({args})")
            }
            Instruction::CallIndirect { lhs, callee, args } => {
                if let Some(lhs) = lhs {
                    write!(f, "{lhs} = ")?;
                }
                let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "call {callee}({args})")
            }
            Instruction::Other { lhs, mnemonic, .. } => {
                if let Some(lhs) = lhs {
                    write!(f, "{lhs} = {mnemonic}")
                } else {
                    write!(f, "{mnemonic}")
                }
            }
        }
    }
}

// SECTION: terminators and blocks

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    Branch { cond: Operand, tt: BbId, ff: BbId },
    Jump(BbId),
    Ret(Option<Operand>),
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Branch { cond, tt, ff } => write!(f, "branch {cond}, {tt}, {ff}"),
            Terminator::Jump(bb) => write!(f, "jump {bb}"),
            Terminator::Ret(None) => write!(f, "ret"),
            Terminator::Ret(Some(op)) => write!(f, "ret {op}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BbId,
    pub insts: Vec<Instruction>,
    pub term: Terminator,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: FuncId,
    pub params: Vec<ValueId>,
    pub body: Map<BbId, BasicBlock>,
}

impl Function {
    pub fn inst(&self, id: &InstId) -> Option<&Instruction> {
        self.body.get(&id.0)?.insts.get(id.1)
    }

    /// All instructions in the function that read `value` as an operand,
    /// in a stable (block, then program) order — this is the "def-use"
    /// query the CFG provider exposes in §6.
    pub fn users_of(&self, value: &ValueId) -> Vec<InstId> {
        let mut users = Vec::new();
        for (bbid, bb) in &self.body {
            for (i, inst) in bb.insts.iter().enumerate() {
                if inst.uses().contains(&Operand::Value(value.clone())) {
                    users.push((bbid.clone(), i));
                }
            }
        }
        users
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Map<FuncId, Function>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_fn() -> Function {
        let mut body = Map::new();
        body.insert(
            bb_id("entry"),
            BasicBlock {
                id: bb_id("entry"),
                insts: vec![
                    Instruction::Call {
                        lhs: Some(value_id("p")),
                        callee: func_id("malloc"),
                        args: vec![],
                    },
                    Instruction::Load {
                        lhs: value_id("x"),
                        ptr: value_id("p"),
                    },
                ],
                term: Terminator::Ret(None),
            },
        );
        Function {
            id: func_id("main"),
            params: vec![],
            body,
        }
    }

    #[test]
    fn users_of_finds_the_load() {
        let f = sample_fn();
        let users = f.users_of(&value_id("p"));
        assert_eq!(users, vec![(bb_id("entry"), 1)]);
    }

    #[test]
    fn load_and_store_classification() {
        let load = Instruction::Load {
            lhs: value_id("x"),
            ptr: value_id("p"),
        };
        assert!(load.is_load_of(&value_id("p")));
        assert!(!load.is_load_of(&value_id("q")));

        let store = Instruction::Store {
            ptr: value_id("p"),
            op: Operand::Const(0),
        };
        assert!(store.is_store_through(&value_id("p")));
    }
}
