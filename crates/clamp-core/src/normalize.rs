//! Baseline correction and sign rectification for recorded traces.
//!
//! Traces are referenced to the instant just before the step epoch begins,
//! so overlaid responses start from a common zero. Negative-going steps are
//! rectified to magnitude so hyperpolarizing and depolarizing responses
//! share one axis; those traces are flagged for dotted rendering.

use crate::result_store::RecordPair;

/// Index of the first sample with `t[i] >= t_ref`.
pub fn reference_index(t: &[f64], t_ref: f64) -> Option<usize> {
    t.iter().position(|&x| x >= t_ref)
}

/// Subtract the voltage at the reference time from every sample. `None`
/// when the trace never reaches `t_ref`.
pub fn baseline_at(t: &[f64], v: &[f64], t_ref: f64) -> Option<Vec<f64>> {
    let index = reference_index(t, t_ref)?;
    let v0 = *v.get(index)?;
    Some(v.iter().map(|x| x - v0).collect())
}

/// A baseline-corrected voltage trace ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrace {
    pub t: Vec<f64>,
    pub v: Vec<f64>,
    /// Render dotted: this trace was rectified from a negative-going step.
    pub dotted: bool,
}

/// Both phases of a pair, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTraces {
    pub ghk: NormalizedTrace,
    pub ohmic: NormalizedTrace,
}

/// Normalize both phases of a record pair at `t_ref`, independently.
/// For negative step currents both traces are rectified to magnitude.
/// `None` when either phase never reaches `t_ref`.
pub fn normalize_pair(pair: &RecordPair, t_ref: f64) -> Option<PairTraces> {
    let negative = pair.ghk.condition.i_step < 0.0;
    let ghk = normalize_phase(&pair.ghk.trace.t, &pair.ghk.trace.v, t_ref, negative)?;
    let ohmic = normalize_phase(&pair.ohmic.trace.t, &pair.ohmic.trace.v, t_ref, negative)?;
    Some(PairTraces { ghk, ohmic })
}

fn normalize_phase(t: &[f64], v: &[f64], t_ref: f64, rectify: bool) -> Option<NormalizedTrace> {
    let mut v = baseline_at(t, v, t_ref)?;
    if rectify {
        for x in &mut v {
            *x = x.abs();
        }
    }
    Some(NormalizedTrace {
        t: t.to_vec(),
        v,
        dotted: rectify,
    })
}
