//! Paired-experiment runner: the per-condition state machine driving the
//! sweep.
//!
//! For each condition the runner configures the GHK leak, reinitializes the
//! membrane to the reference potential, stimulates and records; then repeats
//! with the matched ohmic leak under identical timing and initial potential,
//! so the only varying factor between the two recordings is the leak's
//! current-voltage relationship. Both phases are captured independently.
//!
//! Per-condition failures never abort the sweep: a degenerate configuration
//! or a failed store write is logged and the runner moves on.

use std::fmt;

use log::{debug, info, warn};

use crate::compartment::Compartment;
use crate::engine::{Engine, StepConfig};
use crate::grid::{partition, Condition};
use crate::mechanism::{ConfigError, GhkLeak, LeakConfig, OhmicLeak};
use crate::protocol::StimulusProtocol;
use crate::result_store::{
    DerivedParams, LeakSummary, RecordPair, ResultRecord, ResultStore, StoreError,
};

/// Phases of one paired experiment, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    ConfigureGhk,
    InitializeGhk,
    StimulateGhk,
    ConfigureOhmic,
    InitializeOhmic,
    StimulateOhmic,
    Persist,
    Done,
}

/// Per-condition failure. Recoverable at sweep granularity.
#[derive(Debug)]
pub enum RunError {
    Degenerate(ConfigError),
    Store(StoreError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Degenerate(err) => write!(f, "degenerate configuration: {}", err),
            RunError::Store(err) => write!(f, "store write failed: {}", err),
        }
    }
}

impl std::error::Error for RunError {}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        RunError::Degenerate(err)
    }
}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        RunError::Store(err)
    }
}

/// Worker identity within a statically partitioned sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    pub worker_id: usize,
    pub worker_count: usize,
}

impl Default for WorkerContext {
    fn default() -> Self {
        Self {
            worker_id: 0,
            worker_count: 1,
        }
    }
}

/// Outcome of one worker's share of the sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub assigned: usize,
    pub completed: usize,
    pub skipped: usize,
}

/// Drives paired experiments over a condition sequence and persists the
/// resulting record pairs.
pub struct PairedRunner {
    base: Compartment,
    step_config: StepConfig,
    settle: f64,
    store: ResultStore,
}

impl PairedRunner {
    pub fn new(base: Compartment, step_config: StepConfig, store: ResultStore) -> Self {
        Self {
            base,
            step_config,
            settle: crate::protocol::SETTLE,
            store,
        }
    }

    /// Override the settle margin appended after the step epoch.
    pub fn with_settle(mut self, settle: f64) -> Self {
        self.settle = settle;
        self
    }

    /// Run both phases for one condition and persist the pair. Returns the
    /// identifier written.
    pub fn run_condition(&self, condition: Condition) -> Result<String, RunError> {
        let mut phase = RunPhase::ConfigureGhk;
        debug!("condition {:?}: {:?}", condition, phase);

        let mut comp = self.base.clone();
        comp.cl.inside = condition.cl_in;
        let ghk = GhkLeak::matched(&comp, condition.e_ref, comp.g_leak_total())?;
        let g_matched = ghk.slope_conductance(condition.e_ref, &comp);
        let ghk_params = DerivedParams::capture(
            &comp,
            LeakSummary::Ghk {
                g_sum: ghk.g_sum,
                p_ratio: crate::result_store::round_to(ghk.p_ratio, 3),
                e_ref: condition.e_ref,
            },
        );
        let protocol = StimulusProtocol::two_stage(condition.i_hold, condition.i_step)
            .with_settle(self.settle);

        phase = RunPhase::InitializeGhk;
        debug!("condition {:?}: {:?}", condition, phase);
        let mut engine = Engine::new(
            comp.clone(),
            LeakConfig::Ghk(ghk),
            self.step_config.clone(),
        );
        engine.reinitialize(condition.e_ref);

        phase = RunPhase::StimulateGhk;
        debug!("condition {:?}: {:?}", condition, phase);
        let ghk_trace = engine.run_protocol(&protocol);

        phase = RunPhase::ConfigureOhmic;
        debug!("condition {:?}: {:?}", condition, phase);
        // Matched so the ohmic leak passes the same net current at the
        // reference potential and the same small-signal conductance.
        let ohmic = OhmicLeak {
            g: g_matched,
            e_rev: condition.e_ref,
        };
        let ohmic_params = DerivedParams::capture(
            &comp,
            LeakSummary::Ohmic {
                g: ohmic.g,
                e_rev: crate::result_store::round_to(ohmic.e_rev, 2),
            },
        );

        phase = RunPhase::InitializeOhmic;
        debug!("condition {:?}: {:?}", condition, phase);
        let mut engine = Engine::new(comp, LeakConfig::Ohmic(ohmic), self.step_config.clone());
        engine.reinitialize(condition.e_ref);

        phase = RunPhase::StimulateOhmic;
        debug!("condition {:?}: {:?}", condition, phase);
        let ohmic_trace = engine.run_protocol(&protocol);

        phase = RunPhase::Persist;
        debug!("condition {:?}: {:?}", condition, phase);
        let pair = RecordPair {
            ghk: ResultRecord {
                params: ghk_params,
                condition,
                trace: ghk_trace,
            },
            ohmic: ResultRecord {
                params: ohmic_params,
                condition,
                trace: ohmic_trace,
            },
        };
        let identifier = self.store.put(&pair)?;

        phase = RunPhase::Done;
        debug!("condition {:?}: {:?}", condition, phase);
        Ok(identifier)
    }

    /// Run this worker's statically assigned share of `conditions`.
    /// Per-condition failures are logged and skipped; the sweep continues.
    pub fn run_partition(&self, conditions: &[Condition], ctx: WorkerContext) -> SweepSummary {
        let indices = partition(conditions.len(), ctx.worker_id, ctx.worker_count);
        let mut summary = SweepSummary {
            assigned: indices.len(),
            ..SweepSummary::default()
        };
        for index in indices {
            match self.run_condition(conditions[index]) {
                Ok(identifier) => {
                    info!(
                        "worker {}/{}: condition {} -> {}",
                        ctx.worker_id, ctx.worker_count, index, identifier
                    );
                    summary.completed += 1;
                }
                Err(err) => {
                    warn!(
                        "worker {}/{}: condition {} skipped: {}",
                        ctx.worker_id, ctx.worker_count, index, err
                    );
                    summary.skipped += 1;
                }
            }
        }
        summary
    }
}
