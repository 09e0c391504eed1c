//! C8: the orchestrator.
//!
//! Ported from `UseAfterFreeChecker::initSrcs`/`runOnModule` in
//! `original_source/lib/SABER/UseAfterFreeChecker.cpp`: enumerate
//! deallocation call sites from the PAG's call-site/arg-list map, seed one
//! source per call site, and drive the backward explorer from each.

use log::{debug, info};

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::explore::Query;
use crate::ir::{FuncId, Program};
use crate::report::Report;
use crate::svfg::{NodeId, Svfg};

/// Run the detector over every deallocation source the PAG/SVFG exposes.
///
/// `is_sink` is the "sink predicate" collaborator (§6): identification of
/// deallocator functions is out of scope for this core and is supplied by
/// the caller.
pub fn run(program: &Program, svfg: &Svfg, config: &Config, is_sink: &dyn Fn(&FuncId) -> bool) -> Result<Report> {
    let sources = init_sources(program, svfg, is_sink)?;
    info!("orchestrator: {} deallocation source(s) registered", sources.len());

    let mut query = Query::new(program, svfg, config, is_sink);
    for (src, seed_edge) in sources {
        debug!("orchestrator: driving backward search from source {src:?}");
        let ctx = Context::seeded(seed_edge);
        query.path.push();
        query.search_backward(src, None, ctx);
        query.path.pop(1);
    }

    info!("orchestrator: {} use-after-free report(s)", query.report.count());
    Ok(query.into_report())
}

/// Enumerate every call site whose callee is sink-like and externally
/// defined (empty body), registering the actual-parameter node of its
/// first argument as a source, seeded with the synthetic
/// `(Src -> BOTTOM)` Call-direct edge labeled with that call site's id.
fn init_sources(program: &Program, svfg: &Svfg, is_sink: &dyn Fn(&FuncId) -> bool) -> Result<Vec<(NodeId, crate::svfg::SvfgEdge)>> {
    let mut sources = Vec::new();

    for (call_site, args) in svfg.call_sites_with_args() {
        let Some(inst) = program.functions.get(&call_site.func).and_then(|f| f.inst(&call_site.inst_id())) else {
            continue;
        };
        let crate::ir::Instruction::Call { callee, .. } = inst else {
            continue;
        };
        let is_external = program.functions.get(callee).map_or(true, |f| f.body.is_empty());
        if !is_sink(callee) || !is_external {
            continue;
        }

        let cs_id = svfg
            .call_site_id(call_site)
            .unwrap_or_else(|| panic!("call site {call_site} missing from the SVFG's call-site table"));

        let Some(&src) = args.first() else {
            log::warn!("orchestrator: deallocator call site {call_site} has no argument list");
            return Err(Error::EmptyArgList { call_site: cs_id });
        };

        debug!("orchestrator: registering source at call site {call_site} (callee {callee})");
        let seed_edge = svfg.synthetic_seed_edge(src, cs_id);
        sources.push((src, seed_edge));
    }

    Ok(sources)
}
