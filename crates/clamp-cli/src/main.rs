use std::env;
use std::path::PathBuf;

use clamp_core::compartment::Compartment;
use clamp_core::csv_export::write_csv_pair;
use clamp_core::engine::StepConfig;
use clamp_core::grid::{linspace, GridAxes};
use clamp_core::normalize::normalize_pair;
use clamp_core::options::SimOptions;
use clamp_core::plot::{render_figure, PanelRow};
use clamp_core::protocol::StimulusProtocol;
use clamp_core::result_store::{Catalog, ResultStore};
use clamp_core::runner::{PairedRunner, WorkerContext};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"rustclamp - paired current-clamp sweep driver

USAGE:
    clamp-cli <COMMAND> [OPTIONS]

COMMANDS:
    run     Run this worker's share of the condition sweep
    plot    Render the grouped comparison figure from stored results
    ls      List stored result identifiers

RUN OPTIONS:
    --data <DIR>            Result store directory (default: data)
    --worker-id <N>         0-based worker index (default: $CLAMP_WORKER_ID or 0)
    --worker-count <N>      Number of cooperating workers (default: $CLAMP_WORKER_COUNT or 1)
    --eref <LIST>           Reference leak potentials in mV (default: -85)
    --conc <LIST>           Intracellular Cl- concentrations in mM (default: 10)
    --ihold <LIST>          Holding currents in nA (default: -0.5:2:51)
    --istep <LIST>          Step currents in nA (default: -0.06:0.06:9)
    --option <NAME=VALUE>   Set a simulator option (repeatable)

PLOT OPTIONS:
    --data <DIR>            Result store directory (default: data)
    --out <PATH>            Output image path (default: fig_comparison.png)
    --pin <SUBSTRS>         Comma-joined identifier substrings selecting one
                            figure row; all must match (repeatable)
    --csv <DIR>             Also export each matched pair as CSV into <DIR>
    --option <NAME=VALUE>   Set a simulator option, e.g. precision=9

LS OPTIONS:
    --data <DIR>            Result store directory (default: data)
    --pin <SUBSTRS>         Comma-joined identifier substrings to filter by

LIST syntax: comma-separated values (e.g. "-85,-70") or start:stop:count
for evenly spaced values (e.g. "-0.5:2:51").

EXAMPLES:
    clamp-cli run --data data
    clamp-cli run --worker-id 2 --worker-count 8 --option celsius=30
    clamp-cli plot --data data --out fig2a.png
    clamp-cli plot --pin IHOLD_0.3_,0.015 --pin IHOLD_0_,0.015
    clamp-cli ls --data data --pin ISTEP_0.03"#
    );
}

fn print_version() {
    println!("rustclamp {}", VERSION);
}

fn main() {
    env_logger::init();
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        std::process::exit(2);
    };
    match command.as_str() {
        "--help" | "-h" | "help" => print_help(),
        "--version" | "-V" => print_version(),
        "run" => cmd_run(args),
        "plot" => cmd_plot(args),
        "ls" => cmd_ls(args),
        other => {
            eprintln!("unknown command: {} (expected: run, plot, ls)", other);
            std::process::exit(2);
        }
    }
}

fn missing_value(flag: &str) -> ! {
    eprintln!("missing value for {}", flag);
    std::process::exit(2);
}

fn cmd_run(mut args: impl Iterator<Item = String>) {
    let mut data_dir = PathBuf::from("data");
    let mut worker_id = env_usize("CLAMP_WORKER_ID").unwrap_or(0);
    let mut worker_count = env_usize("CLAMP_WORKER_COUNT").unwrap_or(1);
    let mut axes = GridAxes::default();
    let mut options = SimOptions::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                data_dir = PathBuf::from(value);
            }
            "--worker-id" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                worker_id = parse_or_exit(&arg, &value);
            }
            "--worker-count" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                worker_count = parse_or_exit(&arg, &value);
            }
            "--eref" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                axes.e_ref = parse_axis_or_exit(&arg, &value);
            }
            "--conc" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                axes.cl_in = parse_axis_or_exit(&arg, &value);
            }
            "--ihold" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                axes.i_hold = parse_axis_or_exit(&arg, &value);
            }
            "--istep" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                axes.i_step = parse_axis_or_exit(&arg, &value);
            }
            "--option" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                let Some((key, raw)) = value.split_once('=') else {
                    eprintln!("expected NAME=VALUE for --option, got '{}'", value);
                    std::process::exit(2);
                };
                options.set(key, raw);
            }
            _ => {
                eprintln!("unexpected argument: {}", arg);
                std::process::exit(2);
            }
        }
    }

    if worker_count == 0 || worker_id >= worker_count {
        eprintln!(
            "invalid worker identity: id {} of {} workers",
            worker_id, worker_count
        );
        std::process::exit(2);
    }

    // A store that cannot be created is fatal for the worker.
    let store = match ResultStore::create(&data_dir) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("cannot create result store {}: {}", data_dir.display(), err);
            std::process::exit(1);
        }
    };

    options.print_user_options();
    let compartment = Compartment::from_options(&options);
    let runner = PairedRunner::new(compartment, StepConfig::from_options(&options), store)
        .with_settle(options.get_float("settle"));

    let conditions = axes.conditions();
    let ctx = WorkerContext {
        worker_id,
        worker_count,
    };
    let summary = runner.run_partition(&conditions, ctx);
    println!(
        "worker {}/{}: {} assigned, {} completed, {} skipped (grid size {})",
        worker_id,
        worker_count,
        summary.assigned,
        summary.completed,
        summary.skipped,
        conditions.len()
    );
}

fn cmd_plot(mut args: impl Iterator<Item = String>) {
    let mut data_dir = PathBuf::from("data");
    let mut out_path = PathBuf::from("fig_comparison.png");
    let mut pins: Vec<Vec<String>> = Vec::new();
    let mut csv_dir: Option<PathBuf> = None;
    let mut options = SimOptions::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                data_dir = PathBuf::from(value);
            }
            "--out" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                out_path = PathBuf::from(value);
            }
            "--pin" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                pins.push(split_pins(&value));
            }
            "--csv" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                csv_dir = Some(PathBuf::from(value));
            }
            "--option" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                let Some((key, raw)) = value.split_once('=') else {
                    eprintln!("expected NAME=VALUE for --option, got '{}'", value);
                    std::process::exit(2);
                };
                options.set(key, raw);
            }
            _ => {
                eprintln!("unexpected argument: {}", arg);
                std::process::exit(2);
            }
        }
    }
    let precision = options.get_int("precision") as usize;

    // The standard figure: three holding-current groups at the +/-0.015 nA
    // step currents.
    if pins.is_empty() {
        for group in ["IHOLD_0.3_", "IHOLD_0_", "IHOLD_-0.3_"] {
            pins.push(vec![group.to_string(), "0.015".to_string()]);
        }
    }

    let store = ResultStore::open(&data_dir);
    let catalog = match Catalog::scan(&store) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("cannot scan result store {}: {}", data_dir.display(), err);
            std::process::exit(1);
        }
    };

    let t_ref = StimulusProtocol::two_stage(0.0, 0.0).reference_time();
    let mut rows = Vec::new();
    let mut total_skipped = 0usize;
    for pin_set in &pins {
        let entries = catalog.query_substrings(pin_set);
        let outcome = catalog.load(&entries);
        total_skipped += outcome.skipped;

        if let Some(csv_dir) = &csv_dir {
            export_pairs_csv(csv_dir, &outcome.pairs, precision);
        }

        let pairs = outcome
            .pairs
            .iter()
            .filter_map(|pair| normalize_pair(pair, t_ref))
            .collect::<Vec<_>>();
        println!("row [{}]: {} matched", pin_set.join(","), pairs.len());
        rows.push(PanelRow {
            label: pin_set.join(","),
            pairs,
        });
    }
    if total_skipped > 0 {
        eprintln!("skipped {} malformed record(s)", total_skipped);
    }

    if let Err(err) = render_figure(&out_path, &rows) {
        eprintln!("rendering failed: {}", err);
        std::process::exit(1);
    }
    println!("saved figure to {}", out_path.display());
}

fn cmd_ls(mut args: impl Iterator<Item = String>) {
    let mut data_dir = PathBuf::from("data");
    let mut pins: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                data_dir = PathBuf::from(value);
            }
            "--pin" => {
                let Some(value) = args.next() else { missing_value(&arg) };
                pins = split_pins(&value);
            }
            _ => {
                eprintln!("unexpected argument: {}", arg);
                std::process::exit(2);
            }
        }
    }

    let store = ResultStore::open(&data_dir);
    let catalog = match Catalog::scan(&store) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("cannot scan result store {}: {}", data_dir.display(), err);
            std::process::exit(1);
        }
    };
    let entries = catalog.query_substrings(&pins);
    for entry in &entries {
        println!("{}", entry.identifier);
    }
    println!("total: {}", entries.len());
}

fn export_pairs_csv(
    csv_dir: &PathBuf,
    pairs: &[clamp_core::result_store::RecordPair],
    precision: usize,
) {
    if let Err(err) = std::fs::create_dir_all(csv_dir) {
        eprintln!("cannot create {}: {}", csv_dir.display(), err);
        return;
    }
    for pair in pairs {
        let Some(key) = pair.key() else { continue };
        let path = csv_dir.join(format!("{}.csv", key.identifier()));
        if let Err(err) = write_csv_pair(pair, &path, precision) {
            eprintln!("cannot write {}: {}", path.display(), err);
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_or_exit(flag: &str, value: &str) -> usize {
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("invalid value for {}: '{}'", flag, value);
            std::process::exit(2);
        }
    }
}

fn parse_axis_or_exit(flag: &str, value: &str) -> Vec<f64> {
    match parse_axis(value) {
        Some(values) if !values.is_empty() => values,
        _ => {
            eprintln!(
                "invalid axis for {}: '{}' (expected values or start:stop:count)",
                flag, value
            );
            std::process::exit(2);
        }
    }
}

/// Parse an axis list: either comma-separated values or `start:stop:count`.
fn parse_axis(value: &str) -> Option<Vec<f64>> {
    if value.contains(':') {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 3 {
            return None;
        }
        let start: f64 = parts[0].parse().ok()?;
        let stop: f64 = parts[1].parse().ok()?;
        let count: usize = parts[2].parse().ok()?;
        if count == 0 {
            return None;
        }
        Some(linspace(start, stop, count))
    } else {
        value
            .split(',')
            .map(|part| part.trim().parse::<f64>().ok())
            .collect()
    }
}

fn split_pins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|pin| pin.trim().to_string())
        .filter(|pin| !pin.is_empty())
        .collect()
}
