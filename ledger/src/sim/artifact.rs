//! Artifact writers.
//!
//! Summaries are pretty-printed JSON; event streams are newline-delimited
//! compact JSON. Serialization follows struct field order, so identical
//! runs produce byte-identical files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::SimError;

/// File name of the local-cluster run summary.
pub const SIMULATION_SUMMARY: &str = "simulation-summary.json";
/// File name of the per-node cluster event stream.
pub const ROUND_EVENTS: &str = "round-events.ndjson";
/// File name of the per-round cluster summary stream.
pub const ROUND_SUMMARY: &str = "round-summary.ndjson";
/// File name of the queue-pressure summary.
pub const QUEUE_SUMMARY: &str = "queue-pressure-summary.json";
/// File name of the queue-pressure diagnostics.
pub const QUEUE_DIAGNOSTICS: &str = "queue-pressure-diagnostics.json";
/// File name of the experiment-matrix summary.
pub const MATRIX_SUMMARY: &str = "matrix-summary.json";

/// Writes a value as pretty JSON under `dir/name`.
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, SimError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    fs::write(&path, body)?;
    Ok(path)
}

/// Writes an iterator of records as NDJSON under `dir/name`, one compact
/// JSON document per line, in iteration order.
pub fn write_ndjson<'a, T, I>(dir: &Path, name: &str, records: I) -> Result<PathBuf, SimError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    let mut file = fs::File::create(&path)?;
    file.write_all(&out)?;
    Ok(path)
}
