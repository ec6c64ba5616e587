//! Multi-panel comparison figure.
//!
//! One row per query group, two columns: ohmic phase on the left (blue),
//! GHK phase on the right (orange). All panels share fixed axis limits so
//! the two current-voltage relationships can be compared directly.
//! Rendering is purely a function of already-normalized traces; nothing is
//! re-simulated here.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::normalize::{NormalizedTrace, PairTraces};

pub const X_MIN: f64 = 3500.0;
pub const X_MAX: f64 = 7000.0;
pub const Y_MIN: f64 = 0.0;
pub const Y_MAX: f64 = 3.0;

pub const GHK_COLOR: RGBColor = RGBColor(255, 165, 0);
pub const OHMIC_COLOR: RGBColor = RGBColor(0, 0, 255);

const PANEL_WIDTH: u32 = 550;
const PANEL_HEIGHT: u32 = 300;

/// One figure row: the normalized pairs matched by a single query.
#[derive(Debug, Clone)]
pub struct PanelRow {
    pub label: String,
    pub pairs: Vec<PairTraces>,
}

/// Render the grouped overlay figure to `path`. Rows with no matched pairs
/// produce empty panels rather than failing.
pub fn render_figure(path: &Path, rows: &[PanelRow]) -> Result<(), Box<dyn Error>> {
    let row_count = rows.len().max(1);
    let root = BitMapBackend::new(
        path,
        (2 * PANEL_WIDTH, PANEL_HEIGHT * row_count as u32),
    )
    .into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((row_count, 2));
    for (row_index, row) in rows.iter().enumerate() {
        let ohmic: Vec<&NormalizedTrace> = row.pairs.iter().map(|p| &p.ohmic).collect();
        let ghk: Vec<&NormalizedTrace> = row.pairs.iter().map(|p| &p.ghk).collect();
        draw_panel(
            &panels[2 * row_index],
            &format!("{} (ohmic)", row.label),
            &ohmic,
            OHMIC_COLOR,
        )?;
        draw_panel(
            &panels[2 * row_index + 1],
            &format!("{} (GHK)", row.label),
            &ghk,
            GHK_COLOR,
        )?;
    }

    root.present()?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    caption: &str,
    traces: &[&NormalizedTrace],
    color: RGBColor,
) -> Result<(), Box<dyn Error>> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(8)
        .x_label_area_size(32)
        .y_label_area_size(44)
        .build_cartesian_2d(X_MIN..X_MAX, Y_MIN..Y_MAX)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Delta V (mV)")
        .draw()?;

    for trace in traces {
        let points = trace.t.iter().zip(trace.v.iter()).map(|(&t, &v)| (t, v));
        let style = color.stroke_width(2);
        if trace.dotted {
            chart.draw_series(DashedLineSeries::new(points, 3, 5, style))?;
        } else {
            chart.draw_series(LineSeries::new(points, style))?;
        }
    }

    Ok(())
}
