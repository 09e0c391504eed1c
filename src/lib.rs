//! A static use-after-free detector core: a bi-directional,
//! context-sensitive value-flow exploration over a sparse value-flow graph
//! (SVFG), verified against path conditions before being reported.
//!
//! Module map mirrors the component breakdown this crate was designed
//! against:
//!
//! - [`ir`] / [`cfg`]: the program representation this crate analyzes and
//!   its per-function control-flow graph.
//! - [`svfg`]: the sparse value-flow graph and its provider interface.
//! - [`reachability`]: intraprocedural CFG reachability (C1).
//! - [`path_recorder`]: the backtracking path recorder (C2).
//! - [`context`]: call/return context matching (C3).
//! - [`condition`]: the hash-consed boolean path-condition algebra.
//! - [`explore`]: the backward/forward/verifier exploration engine (C4,
//!   C5/C6, C7).
//! - [`report`]: accumulated findings and their rendering.
//! - [`orchestrator`]: source enumeration and the top-level driver (C8).
//! - [`config`]: analysis configuration.
//! - [`error`]: this crate's error type.

pub mod cfg;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod explore;
pub mod ir;
pub mod orchestrator;
pub mod path_recorder;
pub mod reachability;
pub mod report;
pub mod svfg;

pub use config::Config;
pub use error::{Error, Result};
pub use ir::Program;
pub use report::Report;
pub use svfg::Svfg;
