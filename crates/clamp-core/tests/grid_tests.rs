use clamp_core::grid::{linspace, partition, GridAxes};

fn axes() -> GridAxes {
    GridAxes {
        e_ref: vec![-85.0, -75.0],
        cl_in: vec![10.0, 20.0, 40.0],
        i_hold: vec![-0.3, 0.0, 0.3, 0.6],
        i_step: vec![-0.015, 0.015],
    }
}

#[test]
fn grid_length_is_axis_product() {
    let axes = axes();
    let conditions = axes.conditions();
    assert_eq!(conditions.len(), 2 * 3 * 4 * 2);
    assert_eq!(conditions.len(), axes.len());
}

#[test]
fn grid_first_element_takes_first_of_each_axis() {
    let first = axes().conditions()[0];
    assert_eq!(first.e_ref, -85.0);
    assert_eq!(first.cl_in, 10.0);
    assert_eq!(first.i_hold, -0.3);
    assert_eq!(first.i_step, -0.015);
}

#[test]
fn grid_innermost_axis_varies_fastest() {
    let conditions = axes().conditions();
    // Second element differs from the first only in step current.
    assert_eq!(conditions[1].e_ref, conditions[0].e_ref);
    assert_eq!(conditions[1].cl_in, conditions[0].cl_in);
    assert_eq!(conditions[1].i_hold, conditions[0].i_hold);
    assert_ne!(conditions[1].i_step, conditions[0].i_step);
    // The step axis wraps after its length.
    assert_ne!(conditions[2].i_hold, conditions[0].i_hold);
}

#[test]
fn grid_order_is_stable_across_calls() {
    let axes = axes();
    assert_eq!(axes.conditions(), axes.conditions());
}

#[test]
fn default_grid_matches_standard_protocol() {
    let axes = GridAxes::default();
    assert_eq!(axes.len(), 1 * 1 * 51 * 9);
    let conditions = axes.conditions();
    assert_eq!(conditions.len(), 459);
    assert!((conditions[0].i_hold + 0.5).abs() < 1e-12);
    assert!((conditions[0].i_step + 0.06).abs() < 1e-12);
}

#[test]
fn partition_covers_every_index_exactly_once() {
    for &(n, workers) in &[(0usize, 3usize), (1, 1), (10, 3), (459, 8), (7, 16)] {
        let mut seen = vec![0usize; n];
        for worker_id in 0..workers {
            for index in partition(n, worker_id, workers) {
                seen[index] += 1;
            }
        }
        assert!(
            seen.iter().all(|&count| count == 1),
            "n={} workers={}: {:?}",
            n,
            workers,
            seen
        );
    }
}

#[test]
fn partition_is_round_robin() {
    assert_eq!(partition(10, 1, 3), vec![1, 4, 7]);
    assert_eq!(partition(10, 0, 1), (0..10).collect::<Vec<_>>());
}

#[test]
#[should_panic]
fn partition_rejects_out_of_range_worker() {
    partition(10, 3, 3);
}

#[test]
fn linspace_endpoints_and_spacing() {
    let values = linspace(-0.5, 2.0, 51);
    assert_eq!(values.len(), 51);
    assert!((values[0] + 0.5).abs() < 1e-12);
    assert!((values[50] - 2.0).abs() < 1e-12);
    assert!((values[1] - values[0] - 0.05).abs() < 1e-12);

    assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
    assert!(linspace(1.0, 2.0, 0).is_empty());
}
