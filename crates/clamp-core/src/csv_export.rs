//! CSV output for stored record pairs.

use std::fs;
use std::io;
use std::path::Path;

use crate::result_store::RecordPair;

/// Write both phases of a record pair as long-format CSV rows.
pub fn write_csv_pair(pair: &RecordPair, path: &Path, precision: usize) -> io::Result<()> {
    let mut out = String::new();
    out.push_str("phase,time,v,i_k,i_cl,i_leak\n");

    for (name, record) in [("ghk", &pair.ghk), ("ohmic", &pair.ohmic)] {
        let trace = &record.trace;
        for i in 0..trace.len() {
            out.push_str(&format!(
                "{},{:.prec$e},{:.prec$e},{:.prec$e},{:.prec$e},{:.prec$e}\n",
                name,
                trace.t[i],
                trace.v[i],
                trace.i_k[i],
                trace.i_cl[i],
                trace.i_leak[i],
                prec = precision
            ));
        }
    }

    fs::write(path, out)
}
