//! Single-compartment morphology and passive membrane properties.
//!
//! Geometry is in micrometers, specific capacitance in uF/cm^2, axial
//! resistance in ohm*cm, membrane resistance in ohm*cm^2, concentrations in
//! mM, potentials in mV.

use serde::{Deserialize, Serialize};

use crate::options::SimOptions;

/// Gas constant, J/(mol*K).
pub const GAS_CONSTANT: f64 = 8.3145;
/// Faraday constant, C/mol.
pub const FARADAY: f64 = 96485.332;

/// RT/F in millivolts at the given temperature in Celsius.
pub fn rt_over_f_mv(celsius: f64) -> f64 {
    1e3 * GAS_CONSTANT * (celsius + 273.15) / FARADAY
}

/// Intracellular/extracellular concentration pair for one ion species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IonPool {
    /// Intracellular concentration, mM.
    pub inside: f64,
    /// Extracellular concentration, mM.
    pub outside: f64,
    /// Valence: +1 for K+/Na+, -1 for Cl-.
    pub valence: i32,
}

impl IonPool {
    pub fn new(inside: f64, outside: f64, valence: i32) -> Self {
        Self {
            inside,
            outside,
            valence,
        }
    }

    /// Nernst equilibrium potential in mV at `celsius`.
    pub fn nernst(&self, celsius: f64) -> f64 {
        rt_over_f_mv(celsius) / self.valence as f64 * (self.outside / self.inside).ln()
    }
}

/// A cylindrical membrane section with passive properties and ion pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    /// Diameter, um.
    pub diam: f64,
    /// Length, um.
    pub length: f64,
    /// Specific membrane capacitance, uF/cm^2.
    pub cm: f64,
    /// Axial resistance, ohm*cm.
    pub ra: f64,
    /// Specific membrane resistance, ohm*cm^2. The total leak conductance
    /// target is its reciprocal.
    pub membrane_resist: f64,
    /// Temperature, Celsius.
    pub celsius: f64,
    pub k: IonPool,
    pub cl: IonPool,
    pub na: IonPool,
}

impl Default for Compartment {
    fn default() -> Self {
        Self {
            diam: 262.6117,
            length: 262.6117,
            cm: 0.8,
            ra: 140.0,
            membrane_resist: 120_000.0,
            celsius: 34.0,
            k: IonPool::new(150.0, 2.5, 1),
            cl: IonPool::new(10.0, 130.0, -1),
            na: IonPool::new(10.0, 150.0, 1),
        }
    }
}

impl Compartment {
    /// Build a soma-like section from user options, keeping default ion pools.
    pub fn from_options(options: &SimOptions) -> Self {
        Self {
            diam: options.get_float("diam"),
            length: options.get_float("length"),
            cm: options.get_float("membrane_cap"),
            ra: options.get_float("axial_resist"),
            membrane_resist: options.get_float("membrane_resist"),
            celsius: options.get_float("celsius"),
            ..Self::default()
        }
    }

    /// Lateral membrane area in cm^2.
    pub fn area_cm2(&self) -> f64 {
        std::f64::consts::PI * self.diam * self.length * 1e-8
    }

    /// Total leak conductance target, S/cm^2.
    pub fn g_leak_total(&self) -> f64 {
        1.0 / self.membrane_resist
    }

    pub fn e_k(&self) -> f64 {
        self.k.nernst(self.celsius)
    }

    pub fn e_cl(&self) -> f64 {
        self.cl.nernst(self.celsius)
    }

    pub fn e_na(&self) -> f64 {
        self.na.nernst(self.celsius)
    }
}
