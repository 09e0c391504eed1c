//! Explicit, immutable configuration threaded into the explorers.
//!
//! The original tool this detector is modeled on recognized its options as
//! process-global `cl::opt<bool>` flags. The Design Notes call that out as
//! something not to carry over literally: a reimplementation should pass
//! `MaxCxtLen` and the feature flags through an explicit configuration
//! record instead. This is that record.

/// Recognized options (see the external-interfaces table). Constructed once
/// by the binary from CLI flags and shared by reference into the
/// orchestrator and explorers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Bound on `Context` length. The backward explorer's bound is
    /// `max_cxt_len + 1`; the forward explorer's bound is `max_cxt_len`.
    pub max_cxt_len: usize,
    /// If true, only count UAFs; otherwise print each full path.
    pub report_num_only: bool,
    /// If true, skip the path-condition verifier and report every syntactic
    /// candidate that survives context matching and CFG reachability.
    pub no_check: bool,
    /// If true, skip value-flow edges that cross function boundaries via a
    /// non-Call/Ret (global-variable) edge.
    pub no_global: bool,
    /// Worker count for the enclosing batch driver. Not consulted inside a
    /// single query.
    pub nworkers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_cxt_len: 3,
            report_num_only: true,
            no_check: false,
            no_global: false,
            nworkers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl Config {
    /// Bound used while walking backward: `MaxCxtLen + 1`.
    pub fn backward_bound(&self) -> usize {
        self.max_cxt_len + 1
    }

    /// Bound used while walking forward: `MaxCxtLen`.
    pub fn forward_bound(&self) -> usize {
        self.max_cxt_len
    }
}
