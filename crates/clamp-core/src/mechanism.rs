//! Leak current formulations.
//!
//! Two interchangeable leak models act on a compartment: a non-linear
//! constant-field (GHK) leak carried by K+ and Cl-, and an ohmic leak linear
//! in voltage. The active formulation is a tagged variant, so the inactive
//! one cannot leave a stale contribution behind.
//!
//! Currents are densities in mA/cm^2, permeabilities in cm/s, conductances
//! in S/cm^2, potentials in mV.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compartment::{rt_over_f_mv, Compartment, IonPool, FARADAY};

/// Constant-field (GHK) current for one species at unit permeability
/// (1 cm/s), in mA/cm^2.
///
/// The flux term `xi * (ci - co*exp(-xi)) / (1 - exp(-xi))` is replaced by
/// its first-order expansion when `|xi|` is small, where
/// `xi = z*v*F/(R*T)`.
pub fn ghk_current_unit(v: f64, pool: &IonPool, celsius: f64) -> f64 {
    let z = pool.valence as f64;
    let xi = z * v / rt_over_f_mv(celsius);
    let flux = if xi.abs() < 1e-4 {
        (pool.inside - pool.outside) + 0.5 * xi * (pool.inside + pool.outside)
    } else {
        xi * (pool.inside - pool.outside * (-xi).exp()) / (1.0 - (-xi).exp())
    };
    1e-3 * z * FARADAY * flux
}

/// Failure to build a matched pair of leak formulations for a condition.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// No positive permeability ratio balances K+ and Cl- at the reference
    /// potential (it lies outside the interval spanned by the two species
    /// equilibria).
    DegenerateEquilibrium { e_ref: f64, p_ratio: f64 },
    /// The matched conductance came out non-finite or non-positive.
    BadConductance { e_ref: f64, g: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DegenerateEquilibrium { e_ref, p_ratio } => write!(
                f,
                "no positive permeability ratio balances the leak at {} mV (got {})",
                e_ref, p_ratio
            ),
            ConfigError::BadConductance { e_ref, g } => {
                write!(f, "matched conductance at {} mV is unusable: {}", e_ref, g)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// GHK leak with resolved K+ and Cl- permeabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhkLeak {
    /// K+ permeability, cm/s.
    pub p_k: f64,
    /// Cl- permeability, cm/s.
    pub p_cl: f64,
    /// PK/PCl ratio that zeroes the net leak at the reference potential.
    pub p_ratio: f64,
    /// Reference potential the leak was matched at, mV.
    pub e_ref: f64,
    /// Total slope conductance at `e_ref`, S/cm^2.
    pub g_sum: f64,
}

impl GhkLeak {
    /// Resolve a GHK leak for `comp` such that the net leak current is zero
    /// at `e_ref` and the slope conductance there equals `g_total`.
    pub fn matched(comp: &Compartment, e_ref: f64, g_total: f64) -> Result<Self, ConfigError> {
        let i_k_unit = ghk_current_unit(e_ref, &comp.k, comp.celsius);
        let i_cl_unit = ghk_current_unit(e_ref, &comp.cl, comp.celsius);
        let p_ratio = -i_cl_unit / i_k_unit;
        if !p_ratio.is_finite() || p_ratio <= 0.0 {
            return Err(ConfigError::DegenerateEquilibrium { e_ref, p_ratio });
        }

        // Unit-scale pair (PCl = 1, PK = p_ratio), then scale so the slope
        // conductance at e_ref hits the target.
        let unscaled = Self {
            p_k: p_ratio,
            p_cl: 1.0,
            p_ratio,
            e_ref,
            g_sum: g_total,
        };
        let slope = unscaled.slope_conductance(e_ref, comp);
        if !slope.is_finite() || slope <= 0.0 {
            return Err(ConfigError::BadConductance { e_ref, g: slope });
        }
        let scale = g_total / slope;
        Ok(Self {
            p_k: p_ratio * scale,
            p_cl: scale,
            ..unscaled
        })
    }

    /// Per-species current densities at `v`: `(i_k, i_cl)` in mA/cm^2.
    pub fn currents(&self, v: f64, comp: &Compartment) -> (f64, f64) {
        (
            self.p_k * ghk_current_unit(v, &comp.k, comp.celsius),
            self.p_cl * ghk_current_unit(v, &comp.cl, comp.celsius),
        )
    }

    /// Slope conductance d(i_k + i_cl)/dv at `v`, S/cm^2.
    pub fn slope_conductance(&self, v: f64, comp: &Compartment) -> f64 {
        const DV: f64 = 1e-3;
        let (ik_hi, icl_hi) = self.currents(v + DV, comp);
        let (ik_lo, icl_lo) = self.currents(v - DV, comp);
        ((ik_hi + icl_hi) - (ik_lo + icl_lo)) / (2.0 * DV)
    }
}

/// Ohmic leak, linear in voltage relative to a fixed reversal potential.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhmicLeak {
    /// Conductance, S/cm^2.
    pub g: f64,
    /// Reversal potential, mV.
    pub e_rev: f64,
}

impl OhmicLeak {
    pub fn current(&self, v: f64) -> f64 {
        self.g * (v - self.e_rev)
    }
}

/// Per-channel leak current breakdown at one instant, mA/cm^2.
///
/// The components of the inactive formulation are zero by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeakCurrents {
    pub i_k: f64,
    pub i_cl: f64,
    pub i_leak: f64,
}

impl LeakCurrents {
    pub fn total(&self) -> f64 {
        self.i_k + self.i_cl + self.i_leak
    }
}

/// The active leak formulation. Exactly one variant contributes current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeakConfig {
    Ghk(GhkLeak),
    Ohmic(OhmicLeak),
}

impl LeakConfig {
    /// Evaluate the active formulation's currents at `v`.
    pub fn channel_currents(&self, v: f64, comp: &Compartment) -> LeakCurrents {
        match self {
            LeakConfig::Ghk(ghk) => {
                let (i_k, i_cl) = ghk.currents(v, comp);
                LeakCurrents {
                    i_k,
                    i_cl,
                    i_leak: 0.0,
                }
            }
            LeakConfig::Ohmic(ohmic) => LeakCurrents {
                i_k: 0.0,
                i_cl: 0.0,
                i_leak: ohmic.current(v),
            },
        }
    }
}
