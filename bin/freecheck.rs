//! CLI driver: load a program and its SVFG from a pair of JSON side files,
//! run the use-after-free detector, and print the report.

use std::fs;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Arg, Command};

use freecheck::config::Config;
use freecheck::ir::{func_id, FuncId, Program};
use freecheck::svfg::Svfg;

const USAGE: &str = "freecheck [OPTIONS] PROGRAM SVFG -- DEALLOC_FN...";

fn make_parser() -> Command<'static> {
    Command::new("freecheck")
        .override_usage(USAGE)
        .about("Static use-after-free detector over a sparse value-flow graph.")
        .arg(
            Arg::new("max-cxt-len")
                .long("max-cxt-len")
                .takes_value(true)
                .value_parser(clap::value_parser!(usize))
                .help("Bound on the call/return context stack depth."),
        )
        .arg(
            Arg::new("report-paths")
                .long("report-paths")
                .takes_value(false)
                .help("Print each finding's full value-flow path instead of just a count."),
        )
        .arg(
            Arg::new("no-check")
                .long("no-check")
                .takes_value(false)
                .help("Skip path-condition verification; report every candidate use."),
        )
        .arg(
            Arg::new("no-global")
                .long("no-global")
                .takes_value(false)
                .help("Do not cross function boundaries along non-call/return edges."),
        )
        .arg(
            Arg::new("nworkers")
                .long("nworkers")
                .takes_value(true)
                .value_parser(clap::value_parser!(usize))
                .help("Reserved for future parallel source exploration (§5); currently unused."),
        )
        .arg(
            Arg::new("PROGRAM")
                .required(true)
                .help("Path to the serialized Program (JSON)."),
        )
        .arg(
            Arg::new("SVFG")
                .required(true)
                .help("Path to the serialized Svfg (JSON)."),
        )
        .arg(
            Arg::new("DEALLOC")
                .multiple(true)
                .help("Names of functions to treat as sink-like deallocators."),
        )
}

fn load_program(path: &str) -> Result<Program> {
    let text = fs::read_to_string(path).with_context(|| format!("reading program file {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing program file {path}"))
}

fn load_svfg(path: &str) -> Result<Svfg> {
    let text = fs::read_to_string(path).with_context(|| format!("reading SVFG file {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing SVFG file {path}"))
}

fn main() -> ExitCode {
    env_logger::init();

    let matches = make_parser().get_matches();

    let mut config = Config::default();
    if let Some(len) = matches.get_one::<usize>("max-cxt-len") {
        config.max_cxt_len = *len;
    }
    config.report_num_only = !matches.contains_id("report-paths");
    config.no_check = matches.contains_id("no-check");
    config.no_global = matches.contains_id("no-global");
    if let Some(n) = matches.get_one::<usize>("nworkers") {
        config.nworkers = *n;
    }

    let program_path = matches.get_one::<String>("PROGRAM").expect("required");
    let svfg_path = matches.get_one::<String>("SVFG").expect("required");
    let deallocators: std::collections::BTreeSet<FuncId> = matches
        .get_many::<String>("DEALLOC")
        .into_iter()
        .flatten()
        .map(|name| func_id(name.as_str()))
        .collect();

    let result = (|| -> Result<()> {
        let program = load_program(program_path)?;
        let svfg = load_svfg(svfg_path)?;
        let is_sink = |f: &FuncId| deallocators.contains(f);

        let report = freecheck::orchestrator::run(&program, &svfg, &config, &is_sink)
            .context("running the use-after-free detector")?;
        print!("{report}");
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("freecheck: {err:#}");
            ExitCode::FAILURE
        }
    }
}
