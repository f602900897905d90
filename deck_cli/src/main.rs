//! # Deckwright CLI
//!
//! Runs a study file through the girder engine and prints a report.
//!
//! ```text
//! deck_cli <study.deck> [evaluate|diagrams|search] [--out <file.json>] [--save]
//! ```
//!
//! - `evaluate` (default) - sweep the train, report minimum safety factors,
//!   dead zones and the maximum load
//! - `diagrams` - shear, moment and curvature at the study's load case, plus
//!   the force envelope of a full traversal
//! - `search` - run the study's search block; `--save` writes the winning
//!   girder back into the study
//!
//! Logs go to stderr, the report and JSON to stdout (or `--out`).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use deck_core::calculations::{
    BeamModel, FailureMode, ForceEnvelope, MaximumLoad, SafetyEvaluator, SafetySweep,
};
use deck_core::file_io::{load_study, save_study, write_json_atomic, FileLock};
use deck_core::search::SearchOutcome;
use deck_core::{DeckError, DeckResult, Study};
use serde::Serialize;
use tracing::info;

const USAGE: &str =
    "usage: deck_cli <study.deck> [evaluate|diagrams|search] [--out <file.json>] [--save]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Evaluate,
    Diagrams,
    Search,
}

#[derive(Debug)]
struct Args {
    study: PathBuf,
    command: Command,
    out: Option<PathBuf>,
    save: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let study = args.next().map(PathBuf::from).ok_or(USAGE)?;
    let mut parsed = Args {
        study,
        command: Command::Evaluate,
        out: None,
        save: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "evaluate" => parsed.command = Command::Evaluate,
            "diagrams" => parsed.command = Command::Diagrams,
            "search" => parsed.command = Command::Search,
            "--save" => parsed.save = true,
            "--out" => {
                parsed.out = Some(args.next().map(PathBuf::from).ok_or("--out needs a path")?)
            }
            other => return Err(format!("unknown argument '{}'\n{}", other, USAGE)),
        }
    }
    Ok(parsed)
}

#[derive(Debug, Serialize)]
struct EvaluationReport {
    maximum_load: MaximumLoad,
    /// Smallest factor of each mode over the sweep (null when unbounded)
    minimum_factors: BTreeMap<FailureMode, f64>,
    dead_zones: Vec<(f64, f64)>,
    sweep: SafetySweep,
}

#[derive(Debug, Serialize)]
struct DiagramReport {
    shear_force: Vec<(f64, f64)>,
    bending_moment: Vec<(f64, f64)>,
    curvature: Vec<(f64, f64)>,
    envelope: ForceEnvelope,
}

fn evaluate(study: &Study, model: &BeamModel) -> DeckResult<EvaluationReport> {
    let evaluator =
        SafetyEvaluator::new(model, &study.material).with_threshold(study.settings.threshold);
    let sweep = evaluator.pass_train(study.settings.dx)?;
    let maximum_load = evaluator.maximum_load(study.settings.dx)?;
    let minimum_factors: BTreeMap<FailureMode, f64> = evaluator
        .modes()
        .into_iter()
        .filter_map(|m| sweep.minimum(m).map(|f| (m, f)))
        .collect();
    let dead_zones = evaluator.dead_zones(&sweep);

    rule("SAFETY SWEEP");
    println!(
        "  Span {:.0} mm, train {:.1} N, step {} mm",
        model.span(),
        study.bridge.total_load,
        study.settings.dx
    );
    println!();
    for (mode, factor) in &minimum_factors {
        println!(
            "  {:<18} FoS = {:>8.3} {}",
            mode.to_string(),
            factor,
            status_icon(*factor >= study.settings.threshold)
        );
    }
    println!();
    if dead_zones.is_empty() {
        println!("  No dead zones");
    } else {
        for (start, end) in &dead_zones {
            println!("  Dead zone: first axle at {:.1} .. {:.1} mm", start, end);
        }
    }
    println!();
    println!(
        "  Maximum load: {:.1} N (governs: {})",
        maximum_load.load, maximum_load.mode
    );
    rule_end();

    Ok(EvaluationReport {
        maximum_load,
        minimum_factors,
        dead_zones,
        sweep,
    })
}

fn diagrams(study: &Study, model: &BeamModel) -> DeckResult<DiagramReport> {
    let case = model.load_case();
    let step = study.settings.diagram_step;
    let report = DiagramReport {
        shear_force: model.shear_force_diagram(&case, step)?,
        bending_moment: model.bending_moment_diagram(&case, step)?,
        curvature: model.curvature_diagram(&case, step, study.material.elastic_modulus)?,
        envelope: model.force_envelope(case.magnitude, study.settings.dx, step)?,
    };
    let peak = |series: &[(f64, f64)]| {
        series
            .iter()
            .copied()
            .fold((0.0_f64, 0.0_f64), |best, p| if p.1.abs() > best.1.abs() { p } else { best })
    };

    rule("DIAGRAMS");
    let (x, v) = peak(&report.envelope.shear);
    println!("  Envelope |V|max = {:.2} N at x = {:.1} mm", v, x);
    let (x, m) = peak(&report.envelope.moment);
    println!("  Envelope  Mmax  = {:.0} N·mm at x = {:.1} mm", m, x);
    println!("  {} stations at {} mm", report.shear_force.len(), step);
    rule_end();
    Ok(report)
}

fn search(study: &mut Study) -> DeckResult<SearchOutcome> {
    let outcome = study.optimize()?;
    rule("SECTION SEARCH");
    println!(
        "  {} candidates, {} rejected",
        outcome.evaluated, outcome.rejected
    );
    println!("  Best load: {:.1} N", outcome.score);
    for (name, value) in &outcome.params {
        println!("    {:<12} = {:.3}", name, value);
    }
    rule_end();
    Ok(outcome)
}

fn emit<T: Serialize>(value: &T, out: Option<&PathBuf>) -> DeckResult<()> {
    match out {
        Some(path) => {
            write_json_atomic(value, path)?;
            info!(path = %path.display(), "wrote results");
        }
        None => {
            let json = serde_json::to_string_pretty(value).map_err(|e| {
                DeckError::SerializationError {
                    reason: e.to_string(),
                }
            })?;
            println!();
            println!("JSON Output:");
            println!("{}", json);
        }
    }
    Ok(())
}

fn run(args: &Args) -> DeckResult<()> {
    let mut study = load_study(&args.study)?;
    println!("Deckwright - {} ({})", study.meta.name, args.study.display());
    println!();

    match args.command {
        Command::Evaluate => {
            let model = study.build_model()?;
            let report = evaluate(&study, &model)?;
            emit(&report, args.out.as_ref())
        }
        Command::Diagrams => {
            let model = study.build_model()?;
            let report = diagrams(&study, &model)?;
            emit(&report, args.out.as_ref())
        }
        Command::Search => {
            let lock = if args.save {
                Some(FileLock::acquire(&args.study, whoami())?)
            } else {
                None
            };
            let outcome = search(&mut study)?;
            if lock.is_some() {
                save_study(&study, &args.study)?;
            }
            emit(&outcome, args.out.as_ref())
        }
    }
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "deck_cli".to_string())
}

fn rule(title: &str) {
    println!("═══════════════════════════════════════");
    println!("  {}", title);
    println!("═══════════════════════════════════════");
}

fn rule_end() {
    println!("═══════════════════════════════════════");
}

fn status_icon(pass: bool) -> &'static str {
    if pass {
        "[OK]"
    } else {
        "[FAIL]"
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
