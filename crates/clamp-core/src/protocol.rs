//! Two-epoch current-clamp stimulus protocol.
//!
//! A long holding epoch biases the membrane to a new steady state, then a
//! shorter step epoch probes it. Epoch edges are breakpoints for the
//! integrator so discontinuities are hit exactly. Times in ms, amplitudes
//! in nA.

/// Default holding epoch onset.
pub const HOLD_DELAY: f64 = 2000.0;
/// Default holding epoch duration; outlasts the whole simulation.
pub const HOLD_DUR: f64 = 100_000.0;
/// Default step epoch onset.
pub const STEP_DELAY: f64 = 4000.0;
/// Default step epoch duration.
pub const STEP_DUR: f64 = 2000.0;
/// Default settle margin after the step epoch ends.
pub const SETTLE: f64 = 1000.0;

/// One rectangular current-clamp epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    pub delay: f64,
    pub dur: f64,
    pub amp: f64,
}

impl Epoch {
    pub fn new(delay: f64, dur: f64, amp: f64) -> Self {
        Self { delay, dur, amp }
    }

    /// Injected current at time `t`, nA. Active on `[delay, delay + dur)`.
    pub fn current_at(&self, t: f64) -> f64 {
        if t >= self.delay && t < self.delay + self.dur {
            self.amp
        } else {
            0.0
        }
    }

    pub fn end(&self) -> f64 {
        self.delay + self.dur
    }
}

/// The two-stage protocol: holding epoch, step epoch, settle margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusProtocol {
    pub hold: Epoch,
    pub step: Epoch,
    pub settle: f64,
}

impl StimulusProtocol {
    /// Standard protocol timing with the given epoch amplitudes.
    pub fn two_stage(i_hold: f64, i_step: f64) -> Self {
        Self {
            hold: Epoch::new(HOLD_DELAY, HOLD_DUR, i_hold),
            step: Epoch::new(STEP_DELAY, STEP_DUR, i_step),
            settle: SETTLE,
        }
    }

    pub fn with_settle(mut self, settle: f64) -> Self {
        self.settle = settle;
        self
    }

    /// Total simulated duration: step epoch end plus the settle margin.
    pub fn total_duration(&self) -> f64 {
        self.step.end() + self.settle
    }

    /// Total injected current at `t`, nA.
    pub fn current_at(&self, t: f64) -> f64 {
        self.hold.current_at(t) + self.step.current_at(t)
    }

    /// The instant just before the step epoch begins; traces are
    /// baseline-corrected at this time.
    pub fn reference_time(&self) -> f64 {
        self.step.delay - 1.0
    }

    /// Epoch edges within `(0, tstop]`, sorted ascending, deduplicated.
    pub fn breakpoints(&self, tstop: f64) -> Vec<f64> {
        let mut edges = vec![
            self.hold.delay,
            self.hold.end(),
            self.step.delay,
            self.step.end(),
        ];
        edges.retain(|&t| t > 0.0 && t <= tstop);
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        edges.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        edges
    }
}
