//! Result persistence and retrieval.
//!
//! Each condition produces a pair of result records (GHK phase + ohmic
//! phase) persisted together in one JSON file under a flat store directory.
//! The filename is a deterministic identifier rendered from rounded
//! parameter values; both the write path and the query path derive it from
//! the same structured `RecordKey`, so rounding cannot diverge between the
//! two. Identifiers are write-once; a rerun with a colliding identifier
//! silently overwrites the previous pair.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::compartment::Compartment;
use crate::engine::TraceBundle;
use crate::grid::Condition;

/// Round to a fixed number of decimal places.
pub fn round_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale).round() / scale
}

/// `%g`-style rendering: six significant digits, trailing zeros trimmed.
pub fn fmt_g(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let magnitude = x.abs().log10().floor() as i32;
    if !(-4..6).contains(&magnitude) {
        return format!("{:e}", x);
    }
    let decimals = (5 - magnitude).max(0) as usize;
    let mut s = format!("{:.*}", decimals, x);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// Summary of the active leak formulation at configure time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LeakSummary {
    Ghk {
        /// Total leak conductance, S/cm^2.
        g_sum: f64,
        /// PK/PCl permeability ratio, rounded to 3 decimals.
        p_ratio: f64,
        /// Reference potential, mV.
        e_ref: f64,
    },
    Ohmic {
        /// Conductance, S/cm^2.
        g: f64,
        /// Reversal potential, mV, rounded to 2 decimals.
        e_rev: f64,
    },
}

/// Rounded model-state summary captured when a phase is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParams {
    pub diam: f64,
    pub length: f64,
    pub ra: f64,
    pub cm: f64,
    /// Equilibrium potentials, mV, rounded to 2 decimals.
    pub e_k: f64,
    pub e_cl: f64,
    pub e_na: f64,
    /// Concentrations, mM, rounded to 1 decimal.
    pub k_o: f64,
    pub k_i: f64,
    pub cl_o: f64,
    pub cl_i: f64,
    pub na_o: f64,
    pub na_i: f64,
    pub leak: LeakSummary,
}

impl DerivedParams {
    /// Capture the compartment state with the active leak summary.
    pub fn capture(comp: &Compartment, leak: LeakSummary) -> Self {
        Self {
            diam: comp.diam,
            length: comp.length,
            ra: comp.ra,
            cm: comp.cm,
            e_k: round_to(comp.e_k(), 2),
            e_cl: round_to(comp.e_cl(), 2),
            e_na: round_to(comp.e_na(), 2),
            k_o: round_to(comp.k.outside, 1),
            k_i: round_to(comp.k.inside, 1),
            cl_o: round_to(comp.cl.outside, 1),
            cl_i: round_to(comp.cl.inside, 1),
            na_o: round_to(comp.na.outside, 1),
            na_i: round_to(comp.na.inside, 1),
            leak,
        }
    }
}

/// One phase of a paired experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub params: DerivedParams,
    pub condition: Condition,
    pub trace: TraceBundle,
}

/// Both phases of one condition, persisted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPair {
    pub ghk: ResultRecord,
    pub ohmic: ResultRecord,
}

impl RecordPair {
    /// Storage/query key derived from the GHK-phase parameters. `None` when
    /// the GHK record does not actually carry a GHK leak summary.
    pub fn key(&self) -> Option<RecordKey> {
        match self.ghk.params.leak {
            LeakSummary::Ghk { p_ratio, e_ref, .. } => Some(RecordKey::new(
                p_ratio,
                self.ghk.params.e_cl,
                self.ghk.condition.cl_in,
                e_ref,
                self.ghk.condition.i_hold,
                self.ghk.condition.i_step,
            )),
            LeakSummary::Ohmic { .. } => None,
        }
    }

    /// Both traces recorded and internally aligned.
    pub fn is_complete(&self) -> bool {
        self.ghk.trace.is_complete() && self.ohmic.trace.is_complete()
    }
}

/// Structured storage/query key of rounded parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordKey {
    pub p_ratio: f64,
    pub e_cl: f64,
    pub cl_in: f64,
    pub e_ref: f64,
    pub i_hold: f64,
    pub i_step: f64,
}

impl RecordKey {
    /// Build a key, applying the store's rounding conventions.
    pub fn new(
        p_ratio: f64,
        e_cl: f64,
        cl_in: f64,
        e_ref: f64,
        i_hold: f64,
        i_step: f64,
    ) -> Self {
        Self {
            p_ratio: round_to(p_ratio, 3),
            e_cl: round_to(e_cl, 1),
            cl_in: round_to(cl_in, 1),
            e_ref,
            i_hold,
            i_step,
        }
    }

    /// Render the identifier used as the storage filename stem.
    pub fn identifier(&self) -> String {
        format!(
            "Pr_{}_ecl_{}_CONC_{}_EL_{}_IHOLD_{}_ISTEP_{}",
            fmt_g(self.p_ratio),
            fmt_g(self.e_cl),
            fmt_g(self.cl_in),
            fmt_g(self.e_ref),
            fmt_g(self.i_hold),
            fmt_g(self.i_step)
        )
    }

    /// Parse an identifier back into a structured key.
    pub fn parse(identifier: &str) -> Option<Self> {
        let tokens: Vec<&str> = identifier.split('_').collect();
        if tokens.len() != 12 {
            return None;
        }
        let labels = ["Pr", "ecl", "CONC", "EL", "IHOLD", "ISTEP"];
        let mut values = [0f64; 6];
        for (i, label) in labels.iter().enumerate() {
            if tokens[2 * i] != *label {
                return None;
            }
            values[i] = tokens[2 * i + 1].parse().ok()?;
        }
        Some(Self {
            p_ratio: values[0],
            e_cl: values[1],
            cl_in: values[2],
            e_ref: values[3],
            i_hold: values[4],
            i_step: values[5],
        })
    }

    /// True when every pinned axis of `selector` matches this key.
    pub fn matches(&self, selector: &KeySelector) -> bool {
        let axes = [
            (selector.p_ratio.map(|x| round_to(x, 3)), self.p_ratio),
            (selector.e_cl.map(|x| round_to(x, 1)), self.e_cl),
            (selector.cl_in.map(|x| round_to(x, 1)), self.cl_in),
            (selector.e_ref, self.e_ref),
            (selector.i_hold, self.i_hold),
            (selector.i_step, self.i_step),
        ];
        axes.iter()
            .all(|&(pin, actual)| pin.map_or(true, |p| close(p, actual)))
    }
}

/// Partial key: `None` axes are unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeySelector {
    pub p_ratio: Option<f64>,
    pub e_cl: Option<f64>,
    pub cl_in: Option<f64>,
    pub e_ref: Option<f64>,
    pub i_hold: Option<f64>,
    pub i_step: Option<f64>,
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Errors raised while reading records back from the store.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    /// The record cannot be serialized or does not deserialize into a
    /// complete pair.
    Malformed { path: PathBuf, detail: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "store I/O error: {}", err),
            StoreError::Malformed { path, detail } => {
                write!(f, "malformed record {}: {}", path.display(), detail)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Flat directory of record pairs keyed by identifier.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open the store root for writing, creating the directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open an existing store root for reading.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, identifier: &str) -> PathBuf {
        // Identifiers contain dots, so `with_extension` would mangle them.
        self.root.join(format!("{}.json", identifier))
    }

    /// Write both records of a pair under the pair's identifier.
    ///
    /// The pair is serialized to `<identifier>.json.tmp` and renamed into
    /// place, so a reader never observes a single-phase record. Returns the
    /// identifier written.
    pub fn put(&self, pair: &RecordPair) -> Result<String, StoreError> {
        let key = pair.key().ok_or_else(|| StoreError::Malformed {
            path: self.root.clone(),
            detail: "pair's GHK record carries no GHK leak summary".to_string(),
        })?;
        let identifier = key.identifier();
        let bytes = serde_json::to_vec(pair).map_err(|e| StoreError::Malformed {
            path: self.path_for(&identifier),
            detail: e.to_string(),
        })?;
        let tmp = self.root.join(format!("{}.json.tmp", identifier));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.path_for(&identifier))?;
        Ok(identifier)
    }

    /// Load one pair by identifier, verifying completeness.
    pub fn get(&self, identifier: &str) -> Result<RecordPair, StoreError> {
        let path = self.path_for(identifier);
        let bytes = fs::read(&path)?;
        let pair: RecordPair = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Malformed {
                path: path.clone(),
                detail: e.to_string(),
            }
        })?;
        if !pair.is_complete() {
            return Err(StoreError::Malformed {
                path,
                detail: "record pair has missing or misaligned traces".to_string(),
            });
        }
        Ok(pair)
    }

    /// Identifiers of all stored pairs, in directory enumeration order.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let mut identifiers = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                identifiers.push(stem.to_string());
            }
        }
        Ok(identifiers)
    }
}

/// One scanned store entry: raw identifier plus its parsed key.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub identifier: String,
    pub key: RecordKey,
}

/// Load-time index over a store: parsed keys per identifier, in the store's
/// natural enumeration order. Match order across entries carries no meaning.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    entries: Vec<CatalogEntry>,
}

/// Result of loading a set of catalog entries; malformed records are
/// skipped, not fatal.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub pairs: Vec<RecordPair>,
    pub skipped: usize,
}

impl Catalog {
    /// Scan the store, parsing each filename into a structured key.
    /// Filenames that do not parse as identifiers are ignored.
    pub fn scan(store: &ResultStore) -> io::Result<Self> {
        let mut entries = Vec::new();
        for identifier in store.list()? {
            match RecordKey::parse(&identifier) {
                Some(key) => entries.push(CatalogEntry { identifier, key }),
                None => warn!("ignoring unrecognized store entry '{}'", identifier),
            }
        }
        Ok(Self {
            root: store.root().to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries whose key matches every pinned axis of the selector.
    pub fn query(&self, selector: &KeySelector) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.key.matches(selector))
            .collect()
    }

    /// Entries whose raw identifier contains every given substring.
    pub fn query_substrings(&self, pins: &[String]) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| pins.iter().all(|pin| e.identifier.contains(pin.as_str())))
            .collect()
    }

    /// Load the pairs for the given entries. Records that fail to load are
    /// skipped and counted in the outcome.
    pub fn load(&self, entries: &[&CatalogEntry]) -> LoadOutcome {
        let store = ResultStore::open(&self.root);
        let mut outcome = LoadOutcome::default();
        for entry in entries {
            match store.get(&entry.identifier) {
                Ok(pair) => outcome.pairs.push(pair),
                Err(err) => {
                    warn!("skipping record '{}': {}", entry.identifier, err);
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }
}
