//! Core library for rustclamp: a paired current-clamp sweep driver.
//!
//! For every condition in a parameter grid, the runner simulates a
//! single-compartment membrane twice — once with a non-linear constant-field
//! (GHK) leak, once with an ohmic leak matched to the same resting state —
//! and persists both recorded responses under a parameter-derived identifier.
//! The catalog side of the crate reloads, filters, baseline-corrects and
//! renders the stored pairs into a multi-panel comparison figure.

pub mod compartment;
pub mod csv_export;
pub mod engine;
pub mod grid;
pub mod mechanism;
pub mod normalize;
pub mod options;
pub mod plot;
pub mod protocol;
pub mod result_store;
pub mod runner;
