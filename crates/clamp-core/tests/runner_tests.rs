use clamp_core::compartment::Compartment;
use clamp_core::engine::StepConfig;
use clamp_core::grid::{Condition, GridAxes};
use clamp_core::normalize::reference_index;
use clamp_core::result_store::{Catalog, KeySelector, ResultStore};
use clamp_core::runner::{PairedRunner, RunError, WorkerContext};
use tempfile::TempDir;

fn runner(dir: &TempDir) -> PairedRunner {
    let store = ResultStore::create(dir.path()).unwrap();
    PairedRunner::new(Compartment::default(), StepConfig::default(), store)
}

#[test]
fn phases_start_matched_at_the_reference_potential() {
    let dir = TempDir::new().unwrap();
    let condition = Condition {
        e_ref: -85.0,
        cl_in: 10.0,
        i_hold: 0.0,
        i_step: 0.03,
    };
    let identifier = runner(&dir).run_condition(condition).unwrap();

    let store = ResultStore::open(dir.path());
    let pair = store.get(&identifier).unwrap();

    // With no holding current both formulations must sit at the reference
    // potential when the step begins; this is what "matched" means.
    let t_ref = 3999.0;
    let ghk_index = reference_index(&pair.ghk.trace.t, t_ref).unwrap();
    let ohmic_index = reference_index(&pair.ohmic.trace.t, t_ref).unwrap();
    let v_ghk = pair.ghk.trace.v[ghk_index];
    let v_ohmic = pair.ohmic.trace.v[ohmic_index];
    assert!((v_ghk + 85.0).abs() < 1e-3, "v_ghk = {}", v_ghk);
    assert!((v_ohmic + 85.0).abs() < 1e-3, "v_ohmic = {}", v_ohmic);
    assert!(
        (v_ghk - v_ohmic).abs() < 1e-3,
        "phases diverge at reference: {} vs {}",
        v_ghk,
        v_ohmic
    );
}

#[test]
fn phases_are_recorded_independently() {
    let dir = TempDir::new().unwrap();
    let condition = Condition {
        e_ref: -85.0,
        cl_in: 10.0,
        i_hold: 0.3,
        i_step: 0.015,
    };
    let identifier = runner(&dir).run_condition(condition).unwrap();
    let pair = ResultStore::open(dir.path()).get(&identifier).unwrap();

    // Under a holding current the non-linear and linear leaks settle to
    // different potentials, so genuinely independent recordings must differ.
    let t_ref = 3999.0;
    let ghk_index = reference_index(&pair.ghk.trace.t, t_ref).unwrap();
    let ohmic_index = reference_index(&pair.ohmic.trace.t, t_ref).unwrap();
    let v_ghk = pair.ghk.trace.v[ghk_index];
    let v_ohmic = pair.ohmic.trace.v[ohmic_index];
    assert!(
        (v_ghk - v_ohmic).abs() > 0.5,
        "expected distinct steady states, got {} vs {}",
        v_ghk,
        v_ohmic
    );
    assert_ne!(pair.ghk.trace.v, pair.ohmic.trace.v);
}

#[test]
fn degenerate_condition_is_skipped_without_persisting() {
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir);
    let condition = Condition {
        e_ref: -40.0,
        cl_in: 10.0,
        i_hold: 0.0,
        i_step: 0.03,
    };
    match runner.run_condition(condition) {
        Err(RunError::Degenerate(_)) => {}
        other => panic!("expected degenerate configuration, got {:?}", other.map(|_| ())),
    }

    let store = ResultStore::open(dir.path());
    assert!(store.list().unwrap().is_empty());

    // The sweep as a whole carries on.
    let good = Condition {
        e_ref: -85.0,
        cl_in: 10.0,
        i_hold: 0.0,
        i_step: 0.03,
    };
    let summary = runner.run_partition(&[condition, good], WorkerContext::default());
    assert_eq!(summary.assigned, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn single_condition_sweep_writes_exactly_one_pair_and_rerun_overwrites() {
    let dir = TempDir::new().unwrap();
    let axes = GridAxes {
        e_ref: vec![-85.0],
        cl_in: vec![10.0],
        i_hold: vec![0.0],
        i_step: vec![0.03],
    };
    let conditions = axes.conditions();
    assert_eq!(conditions.len(), 1);

    let runner = runner(&dir);
    let summary = runner.run_partition(&conditions, WorkerContext::default());
    assert_eq!(summary.completed, 1);

    let store = ResultStore::open(dir.path());
    assert_eq!(store.list().unwrap().len(), 1);

    // Rerunning the same partition overwrites rather than accumulating.
    let summary = runner.run_partition(&conditions, WorkerContext::default());
    assert_eq!(summary.completed, 1);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn partitioned_workers_cover_the_grid_without_overlap() {
    let dir = TempDir::new().unwrap();
    let axes = GridAxes {
        e_ref: vec![-85.0],
        cl_in: vec![10.0],
        i_hold: vec![-0.3, 0.0, 0.3],
        i_step: vec![-0.015, 0.015],
    };
    let conditions = axes.conditions();
    let runner = runner(&dir);

    let mut completed = 0;
    for worker_id in 0..2 {
        let summary = runner.run_partition(
            &conditions,
            WorkerContext {
                worker_id,
                worker_count: 2,
            },
        );
        completed += summary.completed;
    }
    assert_eq!(completed, conditions.len());

    let store = ResultStore::open(dir.path());
    assert_eq!(store.list().unwrap().len(), conditions.len());

    // Every stored pair is retrievable through the catalog.
    let catalog = Catalog::scan(&store).unwrap();
    let entries = catalog.query(&KeySelector::default());
    let outcome = catalog.load(&entries);
    assert_eq!(outcome.pairs.len(), conditions.len());
    assert_eq!(outcome.skipped, 0);
}
