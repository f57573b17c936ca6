//! Driver binary: load a program graph and a config, run the pipeline
//! (points-to → reaching-definitions → dependence → slicer) and write the
//! residual program back out (design §6 "External interfaces").

use clap::Parser;
use llir_slicer::features::concurrency::ConcurrencyAnalyzer;
use llir_slicer::features::points_to::PointsToAnalyzer;
use llir_slicer::features::reaching_defs::RdAnalyzer;
use llir_slicer::features::slicing::SlicerAnalyzer;
use llir_slicer::features::validation::ValidationRunner;
use llir_slicer::shared::config::AnalysisConfig;
use llir_slicer::shared::error::DiagnosticSink;
use llir_slicer::shared::ir::{NodeId, Operand, Program};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "slicer-cli", about = "Whole-program dependence slicer")]
struct Cli {
    /// JSON-serialized program graph.
    program: PathBuf,

    /// TOML config (pta/rd/slicer option tables); defaults are used for
    /// anything the file omits or if no file is given.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit criterion node IDs. If omitted, `slicer.criterionSelector`
    /// from the config is used to find matching call sites.
    #[arg(long = "criterion", value_delimiter = ',')]
    criterion: Vec<NodeId>,

    /// Where to write the residual program as JSON.
    #[arg(long, default_value = "residual.json")]
    out: PathBuf,
}

fn find_criterion_by_pattern(program: &Program, pattern: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    for function in program.functions.values() {
        for &id in &function.order {
            let Some(instr) = function.instruction(id) else { continue };
            let matches = instr.operands.iter().any(|op| matches!(op, Operand::Symbol(name) if name.contains(pattern)));
            if matches {
                found.push(id);
            }
        }
    }
    found.sort_unstable();
    found
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let program_text = std::fs::read_to_string(&cli.program)?;
    let program: Program = serde_json::from_str(&program_text)?;

    let mut sink = DiagnosticSink::new();
    let mut validation = ValidationRunner::new();
    if !validation.validate_program(&program, &mut sink) {
        for diagnostic in sink.diagnostics() {
            eprintln!("{diagnostic}");
        }
        anyhow::bail!("program graph failed structural validation");
    }
    validation.record_blocks(&program);

    let criterion = if !cli.criterion.is_empty() {
        cli.criterion.clone()
    } else if let Some(pattern) = &config.slicer.criterion_selector {
        find_criterion_by_pattern(&program, pattern)
    } else {
        Vec::new()
    };

    let mut pta = PointsToAnalyzer::new(config.pta.clone());
    pta.build(&program)?;
    pta.run(validation.stats_mut());

    let mut rd = RdAnalyzer::new(config.rd.clone());
    rd.build(&program, pta.results());
    rd.run(&program, validation.stats_mut());

    let slicer = SlicerAnalyzer::new(config.slicer.clone());
    let residual = if config.pta.threads {
        let mut concurrency = ConcurrencyAnalyzer::new();
        let graph = rd.graph().expect("rd.build ran above");
        concurrency.build(&program, graph, pta.results());
        slicer.slice_with_concurrency(&program, &rd, pta.results(), &criterion, &concurrency)
    } else {
        slicer.slice(&program, &rd, pta.results(), &criterion)
    };

    let residual_json = serde_json::to_string_pretty(&residual)?;
    std::fs::write(&cli.out, residual_json)?;

    println!(
        "sliced on {} criterion node(s); residual has {} function(s), written to {}",
        criterion.len(),
        residual.functions.len(),
        cli.out.display()
    );
    let stats = validation.stats();
    println!(
        "stats: {} block(s), {} pta iteration(s), {} rd iteration(s), max points-to set {} (avg {:.2})",
        stats.processed_blocks,
        stats.pta_iterations,
        stats.rd_iterations,
        stats.max_points_to_set_size,
        stats.average_points_to_set_size(pta.results().len()),
    );

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
