use clamp_core::normalize::{baseline_at, reference_index};

#[test]
fn reference_index_is_first_sample_at_or_after() {
    let t = vec![0.0, 1.0, 2.0, 3.0, 4.0];
    assert_eq!(reference_index(&t, 2.0), Some(2));
    assert_eq!(reference_index(&t, 1.5), Some(2));
    assert_eq!(reference_index(&t, 0.0), Some(0));
    assert_eq!(reference_index(&t, 10.0), None);
}

#[test]
fn baseline_subtracts_reference_sample() {
    let t = vec![0.0, 1.0, 2.0, 3.0, 4.0];
    let v = vec![-70.0, -70.0, -70.0, -40.0, -10.0];
    let corrected = baseline_at(&t, &v, 2.0).unwrap();
    assert_eq!(corrected, vec![0.0, 0.0, 0.0, 30.0, 60.0]);
}

#[test]
fn baseline_none_when_trace_ends_before_reference() {
    let t = vec![0.0, 1.0];
    let v = vec![-70.0, -70.0];
    assert!(baseline_at(&t, &v, 5.0).is_none());
}

mod pair {
    use clamp_core::compartment::Compartment;
    use clamp_core::engine::TraceBundle;
    use clamp_core::grid::Condition;
    use clamp_core::normalize::normalize_pair;
    use clamp_core::result_store::{DerivedParams, LeakSummary, RecordPair, ResultRecord};

    fn trace(t: Vec<f64>, v: Vec<f64>) -> TraceBundle {
        let n = t.len();
        TraceBundle {
            t,
            v,
            i_k: vec![0.0; n],
            i_cl: vec![0.0; n],
            i_leak: vec![0.0; n],
        }
    }

    fn pair_with_step(i_step: f64, v: Vec<f64>) -> RecordPair {
        let comp = Compartment::default();
        let condition = Condition {
            e_ref: -85.0,
            cl_in: 10.0,
            i_hold: 0.0,
            i_step,
        };
        let t = (0..v.len()).map(|i| i as f64).collect::<Vec<_>>();
        let record = |leak| ResultRecord {
            params: DerivedParams::capture(&comp, leak),
            condition,
            trace: trace(t.clone(), v.clone()),
        };
        RecordPair {
            ghk: record(LeakSummary::Ghk {
                g_sum: 1.0 / 120_000.0,
                p_ratio: 1.341,
                e_ref: -85.0,
            }),
            ohmic: record(LeakSummary::Ohmic {
                g: 1.0 / 120_000.0,
                e_rev: -85.0,
            }),
        }
    }

    #[test]
    fn positive_step_keeps_sign_and_plain_style() {
        let pair = pair_with_step(0.03, vec![-70.0, -70.0, -70.0, -40.0, -10.0]);
        let traces = normalize_pair(&pair, 2.0).unwrap();
        assert_eq!(traces.ghk.v, vec![0.0, 0.0, 0.0, 30.0, 60.0]);
        assert!(!traces.ghk.dotted);
        assert!(!traces.ohmic.dotted);
    }

    #[test]
    fn negative_step_rectifies_to_magnitude_and_dots() {
        let pair = pair_with_step(-0.02, vec![-70.0, -70.0, -70.0, -100.0, -130.0]);
        let traces = normalize_pair(&pair, 2.0).unwrap();
        // Baseline gives [0, 0, 0, -30, -60]; rectification flips the sign.
        assert_eq!(traces.ghk.v, vec![0.0, 0.0, 0.0, 30.0, 60.0]);
        assert_eq!(traces.ohmic.v, vec![0.0, 0.0, 0.0, 30.0, 60.0]);
        assert!(traces.ghk.dotted);
        assert!(traces.ohmic.dotted);
    }

    #[test]
    fn negative_step_with_non_negative_excursion_is_unchanged() {
        let pair = pair_with_step(-0.02, vec![-70.0, -70.0, -70.0, -40.0, -10.0]);
        let traces = normalize_pair(&pair, 2.0).unwrap();
        assert_eq!(traces.ghk.v, vec![0.0, 0.0, 0.0, 30.0, 60.0]);
    }

    #[test]
    fn none_when_either_phase_misses_reference() {
        let mut pair = pair_with_step(0.03, vec![-70.0, -70.0, -70.0, -40.0, -10.0]);
        pair.ohmic.trace.t = vec![0.0, 1.0];
        pair.ohmic.trace.v = vec![-70.0, -70.0];
        assert!(normalize_pair(&pair, 2.0).is_none());
    }
}
