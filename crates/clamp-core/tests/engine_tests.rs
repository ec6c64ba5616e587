use clamp_core::compartment::Compartment;
use clamp_core::engine::{Engine, StepConfig};
use clamp_core::mechanism::{ghk_current_unit, GhkLeak, LeakConfig, OhmicLeak};
use clamp_core::protocol::{StimulusProtocol, STEP_DELAY};

#[test]
fn nernst_potentials_match_standard_conditions() {
    let comp = Compartment::default();
    // cli = 10, clo = 130 at 34 C
    assert!((comp.e_cl() + 67.9).abs() < 0.1, "e_cl = {}", comp.e_cl());
    // ki = 150, ko = 2.5
    assert!((comp.e_k() + 108.4).abs() < 0.2, "e_k = {}", comp.e_k());
    // nai = 10, nao = 150
    assert!((comp.e_na() - 71.7).abs() < 0.2, "e_na = {}", comp.e_na());
}

#[test]
fn permeability_ratio_balances_leak_at_reference() {
    let comp = Compartment::default();
    let ghk = GhkLeak::matched(&comp, -85.0, comp.g_leak_total()).unwrap();
    assert!(
        (ghk.p_ratio - 1.341).abs() < 5e-3,
        "p_ratio = {}",
        ghk.p_ratio
    );

    // Net current vanishes at the reference potential.
    let (i_k, i_cl) = ghk.currents(-85.0, &comp);
    assert!((i_k + i_cl).abs() < 1e-12);
    // K+ flows outward and Cl- current is inward at -85 mV.
    assert!(i_k > 0.0);
    assert!(i_cl < 0.0);
}

#[test]
fn matched_slope_conductance_hits_target() {
    let comp = Compartment::default();
    let target = comp.g_leak_total();
    let ghk = GhkLeak::matched(&comp, -85.0, target).unwrap();
    let slope = ghk.slope_conductance(-85.0, &comp);
    assert!(
        (slope - target).abs() < 1e-9 * target.max(1.0),
        "slope = {} target = {}",
        slope,
        target
    );
}

#[test]
fn reference_outside_equilibria_is_degenerate() {
    let comp = Compartment::default();
    // -40 mV lies above both E_K and E_Cl, so both currents are outward and
    // no positive permeability ratio can balance them.
    assert!(GhkLeak::matched(&comp, -40.0, comp.g_leak_total()).is_err());
}

#[test]
fn unit_ghk_current_is_continuous_through_zero() {
    let comp = Compartment::default();
    let below = ghk_current_unit(-1e-5, &comp.k, comp.celsius);
    let above = ghk_current_unit(1e-5, &comp.k, comp.celsius);
    let at = ghk_current_unit(0.0, &comp.k, comp.celsius);
    assert!((below - at).abs() < 1e-3 * at.abs());
    assert!((above - at).abs() < 1e-3 * at.abs());
}

#[test]
fn zero_stimulus_holds_steady_state() {
    let comp = Compartment::default();
    let ghk = GhkLeak::matched(&comp, -85.0, comp.g_leak_total()).unwrap();
    let mut engine = Engine::new(comp, LeakConfig::Ghk(ghk), StepConfig::default());
    engine.reinitialize(-85.0);
    let trace = engine.run_protocol(&StimulusProtocol::two_stage(0.0, 0.0));
    assert!(trace.is_complete());
    for (t, v) in trace.t.iter().zip(trace.v.iter()) {
        assert!((v + 85.0).abs() < 1e-6, "v = {} at t = {}", v, t);
    }
}

#[test]
fn epoch_edges_are_hit_exactly() {
    let comp = Compartment::default();
    let leak = LeakConfig::Ohmic(OhmicLeak {
        g: comp.g_leak_total(),
        e_rev: -85.0,
    });
    let mut engine = Engine::new(comp, leak, StepConfig::default());
    engine.reinitialize(-85.0);
    let trace = engine.run_protocol(&StimulusProtocol::two_stage(0.1, 0.03));
    for edge in [2000.0, 4000.0, 6000.0, 7000.0] {
        assert!(
            trace.t.iter().any(|&t| (t - edge).abs() < 1e-6),
            "no sample at edge {}",
            edge
        );
    }
    assert!((trace.t.last().unwrap() - 7000.0).abs() < 1e-6);
}

#[test]
fn holding_current_depolarizes_before_step() {
    let comp = Compartment::default();
    let area = comp.area_cm2();
    let g = comp.g_leak_total();
    let leak = LeakConfig::Ohmic(OhmicLeak { g, e_rev: -85.0 });
    let mut engine = Engine::new(comp, leak, StepConfig::default());
    engine.reinitialize(-85.0);
    let trace = engine.run_protocol(&StimulusProtocol::two_stage(0.3, 0.0));

    // At the reference time the ohmic membrane sits at e_rev + I/g.
    let expected = -85.0 + 0.3e-6 / area / g;
    let index = trace
        .t
        .iter()
        .position(|&t| t >= STEP_DELAY - 1.0)
        .unwrap();
    assert!(
        (trace.v[index] - expected).abs() < 0.05,
        "v = {} expected = {}",
        trace.v[index],
        expected
    );
}

#[test]
fn ghk_phase_records_species_currents_ohmic_phase_does_not() {
    let comp = Compartment::default();
    let ghk = GhkLeak::matched(&comp, -85.0, comp.g_leak_total()).unwrap();
    let mut engine = Engine::new(comp.clone(), LeakConfig::Ghk(ghk), StepConfig::default());
    engine.reinitialize(-85.0);
    let trace = engine.run_protocol(&StimulusProtocol::two_stage(0.3, 0.0));
    assert!(trace.i_k.iter().any(|&i| i != 0.0));
    assert!(trace.i_cl.iter().any(|&i| i != 0.0));
    assert!(trace.i_leak.iter().all(|&i| i == 0.0));

    let leak = LeakConfig::Ohmic(OhmicLeak {
        g: comp.g_leak_total(),
        e_rev: -85.0,
    });
    let mut engine = Engine::new(comp, leak, StepConfig::default());
    engine.reinitialize(-85.0);
    let trace = engine.run_protocol(&StimulusProtocol::two_stage(0.3, 0.0));
    assert!(trace.i_k.iter().all(|&i| i == 0.0));
    assert!(trace.i_cl.iter().all(|&i| i == 0.0));
    assert!(trace.i_leak.iter().any(|&i| i != 0.0));
}
