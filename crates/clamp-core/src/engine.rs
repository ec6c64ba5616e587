//! Adaptive-step membrane integrator for a single compartment.
//!
//! The membrane equation `cm * dv/dt = i_stim - i_leak` is advanced with
//! classic RK4 and step-doubling error control: each step is taken once at
//! `dt` and twice at `dt/2`, the difference feeds a weighted error test, and
//! the step size follows the accepted/rejected outcome with a safety factor
//! clamped to [0.1, 2.0]. Stimulus epoch edges limit `dt` so discontinuities
//! are hit exactly; right after an edge the step size is knocked down to
//! resolve the transient.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::compartment::Compartment;
use crate::mechanism::{LeakConfig, LeakCurrents};
use crate::options::SimOptions;
use crate::protocol::StimulusProtocol;

/// Recorded time series for one stimulated phase, aligned to a shared time
/// vector. Voltages in mV, current densities in mA/cm^2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceBundle {
    pub t: Vec<f64>,
    pub v: Vec<f64>,
    pub i_k: Vec<f64>,
    pub i_cl: Vec<f64>,
    pub i_leak: Vec<f64>,
}

impl TraceBundle {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// All channels present and aligned to the time vector.
    pub fn is_complete(&self) -> bool {
        !self.t.is_empty()
            && self.v.len() == self.t.len()
            && self.i_k.len() == self.t.len()
            && self.i_cl.len() == self.t.len()
            && self.i_leak.len() == self.t.len()
    }

    fn push(&mut self, t: f64, v: f64, currents: &LeakCurrents) {
        self.t.push(t);
        self.v.push(v);
        self.i_k.push(currents.i_k);
        self.i_cl.push(currents.i_cl);
        self.i_leak.push(currents.i_leak);
    }
}

/// Integrator tolerances and step bounds. Times in ms, voltages in mV.
#[derive(Debug, Clone)]
pub struct StepConfig {
    pub abstol: f64,
    pub reltol: f64,
    pub dtmin: f64,
    pub dtmax: f64,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            abstol: 1e-4,
            reltol: 1e-4,
            dtmin: 1e-3,
            dtmax: 25.0,
        }
    }
}

impl StepConfig {
    pub fn from_options(options: &SimOptions) -> Self {
        Self {
            abstol: options.get_float("abstol"),
            reltol: options.get_float("reltol"),
            dtmin: options.get_float("dtmin"),
            dtmax: options.get_float("dtmax"),
        }
    }
}

/// Single-compartment simulation engine with one active leak formulation.
#[derive(Debug, Clone)]
pub struct Engine {
    pub compartment: Compartment,
    pub leak: LeakConfig,
    config: StepConfig,
    v: f64,
    t: f64,
}

impl Engine {
    pub fn new(compartment: Compartment, leak: LeakConfig, config: StepConfig) -> Self {
        let v0 = match &leak {
            LeakConfig::Ghk(ghk) => ghk.e_ref,
            LeakConfig::Ohmic(ohmic) => ohmic.e_rev,
        };
        Self {
            compartment,
            leak,
            config,
            v: v0,
            t: 0.0,
        }
    }

    /// Explicit reinitialization to a prescribed membrane potential. Resets
    /// the clock; any dependent state is re-evaluated on the next step.
    pub fn reinitialize(&mut self, v: f64) {
        self.v = v;
        self.t = 0.0;
    }

    pub fn membrane_potential(&self) -> f64 {
        self.v
    }

    fn dvdt(&self, v: f64, i_stim: f64) -> f64 {
        let i_leak = self.leak.channel_currents(v, &self.compartment).total();
        // (mA/cm^2) / (uF/cm^2) = 1e3 mV/ms
        1e3 * (i_stim - i_leak) / self.compartment.cm
    }

    fn rk4_step(&self, v: f64, dt: f64, i_stim: f64) -> f64 {
        let k1 = self.dvdt(v, i_stim);
        let k2 = self.dvdt(v + 0.5 * dt * k1, i_stim);
        let k3 = self.dvdt(v + 0.5 * dt * k2, i_stim);
        let k4 = self.dvdt(v + dt * k3, i_stim);
        v + dt / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
    }

    /// Run the stimulus protocol from the current state to its total
    /// duration, recording every accepted step.
    pub fn run_protocol(&mut self, protocol: &StimulusProtocol) -> TraceBundle {
        let tstop = protocol.total_duration();
        let breakpoints = protocol.breakpoints(tstop);
        let mut next_bp = 0usize;

        let mut trace = TraceBundle::default();
        let currents = self.leak.channel_currents(self.v, &self.compartment);
        trace.push(self.t, self.v, &currents);

        let mut dt = self.config.dtmin * 10.0;
        let mut accepted = 0usize;
        let mut rejected = 0usize;

        while self.t < tstop - 1e-9 {
            // Skip breakpoints already behind us, then limit dt to the next one.
            while next_bp < breakpoints.len() && breakpoints[next_bp] <= self.t + 1e-9 {
                next_bp += 1;
            }
            let mut hit_bp = false;
            if next_bp < breakpoints.len() && self.t + dt > breakpoints[next_bp] - 1e-9 {
                dt = breakpoints[next_bp] - self.t;
                hit_bp = true;
            }
            if self.t + dt > tstop {
                dt = tstop - self.t;
            }

            // The stimulus is rectangular and the step never straddles an
            // epoch edge, so its value at the interval midpoint holds for the
            // whole step.
            let i_stim =
                protocol.current_at(self.t + 0.5 * dt) * 1e-6 / self.compartment.area_cm2();

            // Step doubling: one full step against two half steps.
            let v_full = self.rk4_step(self.v, dt, i_stim);
            let v_mid = self.rk4_step(self.v, 0.5 * dt, i_stim);
            let v_half = self.rk4_step(v_mid, 0.5 * dt, i_stim);

            let err = (v_half - v_full).abs() / 15.0;
            let denom = self.config.abstol + self.config.reltol * self.v.abs().max(v_half.abs());
            let ratio = if denom > 0.0 { err / denom } else { 0.0 };

            if ratio <= 1.0 || dt <= self.config.dtmin {
                self.t += dt;
                self.v = v_half;
                let currents = self.leak.channel_currents(self.v, &self.compartment);
                trace.push(self.t, self.v, &currents);
                accepted += 1;

                if hit_bp {
                    // Resolve the transient right after the discontinuity.
                    dt = (dt * 0.1).max(self.config.dtmin);
                } else {
                    let factor = (0.9 * ratio.powf(-0.2)).clamp(0.1, 2.0);
                    dt = (dt * factor).clamp(self.config.dtmin, self.config.dtmax);
                }
            } else {
                rejected += 1;
                let factor = (0.9 * ratio.powf(-0.2)).clamp(0.1, 2.0);
                dt = (dt * factor).max(self.config.dtmin);
            }
        }

        debug!(
            "run_protocol: tstop={} accepted={} rejected={} samples={}",
            tstop,
            accepted,
            rejected,
            trace.len()
        );
        trace
    }
}
