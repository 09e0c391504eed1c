//! Bug reporting (§6 Outputs): either a running count, or for each
//! detected use-after-free a numbered block listing the visited SVFG nodes
//! followed by the offending instruction — mirroring
//! `UseAfterFreeChecker::reportBug`.

use std::fmt;

use crate::ir::{GlobalInstId, Program};
use crate::path_recorder::PathRecorder;
use crate::svfg::{NodeId, Svfg};

#[derive(Clone, Debug)]
pub struct ReportedPath {
    /// One descriptive line per visited SVFG node, in path order.
    pub lines: Vec<String>,
    /// The offending instruction, rendered the same way.
    pub tail: String,
}

/// Accumulates UAF findings across every source a [`crate::explore::Query`]
/// drives. `record_paths` mirrors `!report-num-only`: when false, only the
/// count is kept (matching the default, count-only reporting mode).
#[derive(Debug, Default)]
pub struct Report {
    count: usize,
    paths: Vec<ReportedPath>,
    record_paths: bool,
}

impl Report {
    pub fn new(record_paths: bool) -> Self {
        Report {
            count: 0,
            paths: Vec::new(),
            record_paths,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn paths(&self) -> &[ReportedPath] {
        &self.paths
    }

    /// Render and record one confirmed use-after-free. `path` is the
    /// recorder's full backward-then-forward walk that led to `tail`.
    pub fn record(&mut self, program: &Program, svfg: &Svfg, path: &PathRecorder<NodeId>, tail: &GlobalInstId) {
        self.count += 1;
        if !self.record_paths {
            return;
        }

        let lines = path
            .as_slice()
            .iter()
            .map(|&id| describe_node(program, svfg, id))
            .collect();
        let tail_inst = program
            .functions
            .get(&tail.func)
            .and_then(|f| f.inst(&tail.inst_id()));
        let tail_line = match tail_inst {
            Some(inst) => format!("XX ({}) \t{inst}", tail.func),
            None => format!("XX ({}) \t<unknown instruction {tail}>", tail.func),
        };
        self.paths.push(ReportedPath { lines, tail: tail_line });
    }
}

fn describe_node(program: &Program, svfg: &Svfg, id: NodeId) -> String {
    let node = svfg.node(id);
    match &node.anchor {
        Some(anchor) => match svfg.instruction(program, node) {
            Some(inst) => format!("{id:?} ({}) \t{inst}", anchor.func),
            None => format!("{id:?} ({})", anchor.func),
        },
        None => format!("{id:?} (unknown function)"),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.record_paths {
            return writeln!(f, "Total: {}", self.count);
        }
        for (i, path) in self.paths.iter().enumerate() {
            writeln!(f, "+++++{}+++++", i + 1)?;
            for (j, line) in path.lines.iter().enumerate() {
                writeln!(f, "[{j}] {line}")?;
            }
            writeln!(f, "[{}] {}", path.lines.len(), path.tail)?;
            writeln!(f)?;
        }
        writeln!(f, "Total: {}", self.count)
    }
}
