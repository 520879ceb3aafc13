// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use anyhow::{anyhow, bail, Context, Result};
use clap::Arg;
use sccp::{
    assembly::{parse_module, Writer},
    ir::Module,
    opt::prelude::*,
    pass::sccp::{PhiRepair, WorklistOrder},
    pass::{SccpPrinter, SparseCondConstProp},
    verifier::Verifier,
};
use std::{
    fs::File,
    io::{BufWriter, Read, Write},
};

fn main() {
    match main_inner() {
        Ok(_) => (),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn main_inner() -> Result<()> {
    let matches = app_from_crate!()
        .about("Propagates constants through SSA assembly.")
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help(HELP_VERBOSITY.lines().next().unwrap_or_default())
                .long_help(HELP_VERBOSITY),
        )
        .arg(
            Arg::with_name("input")
                .help("Assembly file to optimize")
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("File to write output to; stdout if omitted"),
        )
        .arg(
            Arg::with_name("time-passes")
                .short("t")
                .long("time")
                .help("Print execution time statistics per pass"),
        )
        .arg(
            Arg::with_name("single-threaded")
                .short("s")
                .long("no-parallel")
                .help("Do not parallelize execution"),
        )
        .arg(
            Arg::with_name("passes")
                .short("p")
                .long("pass")
                .value_name("PASS")
                .takes_value(true)
                .multiple(true)
                .help(HELP_PASSES.lines().next().unwrap_or_default())
                .long_help(HELP_PASSES),
        )
        .arg(
            Arg::with_name("worklist-order")
                .long("worklist-order")
                .takes_value(true)
                .possible_values(&["asc", "desc"])
                .help("Order in which worklist items are processed"),
        )
        .arg(
            Arg::with_name("phi-repair")
                .long("phi-repair")
                .takes_value(true)
                .possible_values(&["precise", "legacy"])
                .help("How phi nodes are repaired after removing blocks"),
        )
        .get_matches();

    // Configure the logger.
    let verbose = std::cmp::max(1, matches.occurrences_of("verbosity") as usize) - 1;
    let quiet = !matches.is_present("verbosity");
    stderrlog::new()
        .module("sccp")
        .module("sccp_opt")
        .quiet(quiet)
        .verbosity(verbose)
        .init()
        .context("failed to initialize logging")?;

    // Configure rayon to be single-threaded if requested.
    if matches.is_present("single-threaded") {
        info!("Limiting to one rayon worker thread");
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build_global()
            .context("failed to configure worker threads")?;
    }

    // Assemble the pass configuration.
    let mut ctx = PassContext::default();
    if let Some(order) = matches.value_of("worklist-order") {
        let order = match order {
            "asc" => WorklistOrder::Ascending,
            "desc" => WorklistOrder::Descending,
            _ => bail!("unknown worklist order `{}`", order),
        };
        ctx.sccp.cfg_order = order;
        ctx.sccp.ssa_order = order;
    }
    if let Some(repair) = matches.value_of("phi-repair") {
        ctx.sccp.phi_repair = match repair {
            "precise" => PhiRepair::Precise,
            "legacy" => PhiRepair::Legacy,
            _ => bail!("unknown phi repair mode `{}`", repair),
        };
    }
    debug!("Using {:?}", ctx.sccp);

    // Prepare the time tracking.
    let mut times = vec![];
    let tinit = time::precise_time_ns();

    // Read the input.
    let t0 = time::precise_time_ns();
    let mut module = {
        let path = matches
            .value_of("input")
            .ok_or_else(|| anyhow!("no input file"))?;
        read_module(path).with_context(|| format!("failed to read `{}`", path))?
    };
    let t1 = time::precise_time_ns();
    times.push(("parse".to_owned(), t1 - t0));

    // Determine the passes to be run.
    let passes: Vec<_> = match matches.values_of("passes") {
        Some(passes) => passes.collect(),
        None => vec!["sccp"],
    };

    // Apply the passes.
    debug!("Running {:?}", passes);
    for &pass in &passes {
        trace!("Running pass {}", pass);
        let t0 = time::precise_time_ns();
        let changes = match pass {
            "sccp" => SparseCondConstProp::run_on_module(&ctx, &mut module),
            "print-sccp" => SccpPrinter::run_on_module(&ctx, &mut module),
            "verify" => {
                if let Err(errs) = verify(&module) {
                    error!("Verification failed:\n{}", errs);
                }
                false
            }
            _ => bail!("unknown pass `{}`", pass),
        };
        debug!("Pass {} modified module: {}", pass, changes);
        let t1 = time::precise_time_ns();
        times.push((pass.to_owned(), t1 - t0));
    }

    // Verify the modified module. Legacy phi repair is known to leave empty
    // phi nodes behind.
    let t0 = time::precise_time_ns();
    match (verify(&module), ctx.sccp.phi_repair) {
        (Ok(()), _) => (),
        (Err(errs), PhiRepair::Legacy) => {
            warn!("Verification failed after optimization:\n{}", errs)
        }
        (Err(errs), PhiRepair::Precise) => {
            bail!("verification failed after optimization:\n{}", errs)
        }
    }
    let t1 = time::precise_time_ns();
    times.push(("verify".to_owned(), t1 - t0));

    // Write the output.
    let t0 = time::precise_time_ns();
    if let Some(path) = matches.value_of("output") {
        let output =
            File::create(path).with_context(|| format!("failed to create `{}`", path))?;
        let output = BufWriter::with_capacity(1 << 20, output);
        write_module(output, &module)?;
    } else {
        write_module(std::io::stdout().lock(), &module)?;
    }
    let t1 = time::precise_time_ns();
    times.push(("output".to_owned(), t1 - t0));

    // Final time stat.
    let tfinal = time::precise_time_ns();
    times.push(("total".to_owned(), tfinal - tinit));

    // Print execution time statistics if requested by the user.
    if matches.is_present("time-passes") {
        eprintln!("Execution Time Statistics:");
        for (mut name, ns) in times {
            name.push(':');
            eprintln!("  {:10}  {:8.3} ms", name, ns as f64 * 1.0e-6);
        }
    }

    info!("Used {} rayon worker threads", rayon::current_num_threads());
    Ok(())
}

fn read_module(path: &str) -> Result<Module> {
    let mut input = File::open(path)?;
    let mut contents = String::new();
    input.read_to_string(&mut contents)?;
    let module = parse_module(&contents)?;
    verify(&module).context("input is malformed")?;
    Ok(module)
}

fn verify(module: &Module) -> Result<(), sccp::verifier::VerifierErrors> {
    let mut verifier = Verifier::new();
    verifier.verify_module(module);
    verifier.finish()
}

fn write_module(sink: impl Write, module: &Module) -> Result<()> {
    let mut writer = Writer::new(sink);
    writer
        .write_module(module)
        .context("failed to write output")?;
    writer.into_inner().flush()?;
    Ok(())
}

static HELP_VERBOSITY: &str = "Increase message verbosity

This option can be specified multiple times to increase the level of verbosity \
in the output:

-v      Only print errors
-vv     Also print warnings
-vvv    Also print info messages
-vvvv   Also print debug messages
-vvvvv  Also print detailed tracing messages
";

static HELP_PASSES: &str = "Exact order of passes to run

This option specifies the exact order of passes to be executed. The admissible \
passes are as follows:

sccp        Sparse Conditional Constant Propagation
print-sccp  Print the facts and executable edges found by SCCP to stderr
verify      Check the module for consistency and report errors
";
