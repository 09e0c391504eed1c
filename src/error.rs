//! Initialization-time errors.
//!
//! Only initialization/collaborator failures are ever wrapped in a
//! `Result`; everything that happens once a query is running follows the
//! silent-pruning policy of the exploration (see `explore`) and never
//! produces one of these. Modeled the same way the front-end's `ParseError`
//! is: a small `Display`-able error type built with `derive_more`, not a
//! hand-rolled `impl fmt::Display`.

use derive_more::Display;

/// Something went wrong constructing the inputs to a query, before any
/// exploration started.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Error {
    /// A deallocation call site had no actual-parameter list to seed a
    /// source from.
    #[display(fmt = "deallocator call site {call_site:?} has no argument list")]
    EmptyArgList { call_site: crate::svfg::CallSiteId },

    /// The SVFG referenced a node id that the provider does not know about.
    #[display(fmt = "dangling SVFG node id {0:?}")]
    DanglingNode(crate::svfg::NodeId),

    /// The serialized program/SVFG fixture failed to parse.
    #[display(fmt = "malformed input: {0}")]
    Malformed(String),
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
