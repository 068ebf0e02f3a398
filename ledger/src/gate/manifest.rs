//! Fixture manifests: SHA-256 pins over artifact directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::sha256;

use super::GateError;

/// File name of the fixture manifest inside an artifact directory.
pub const FIXTURE_MANIFEST: &str = "fixture-manifest.json";

/// SHA-256 pins for every fixture file, keyed by name in sorted order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureManifest {
    pub schema_version: u32,
    pub manifest_type: String,
    pub files: BTreeMap<String, String>,
}

/// Uppercase SHA-256 of a file's contents.
pub fn sha256_file_hex(path: &Path) -> Result<String, GateError> {
    let body = fs::read(path)?;
    Ok(hex::encode_upper(sha256(&body)))
}

/// Pins every regular file in `dir` (except the manifest itself and the
/// gate report) into a manifest. `BTreeMap` keeps the file order sorted,
/// so the manifest serialization is deterministic.
pub fn pin_directory(dir: &Path, manifest_type: &str) -> Result<FixtureManifest, GateError> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == FIXTURE_MANIFEST || name == super::report::GATE_REPORT {
            continue;
        }
        files.insert(name, sha256_file_hex(&entry.path())?);
    }

    Ok(FixtureManifest {
        schema_version: 1,
        manifest_type: manifest_type.to_string(),
        files,
    })
}

/// Writes a manifest into its directory.
pub fn write_manifest(manifest: &FixtureManifest, dir: &Path) -> Result<(), GateError> {
    let mut body = serde_json::to_vec_pretty(manifest)?;
    body.push(b'\n');
    fs::write(dir.join(FIXTURE_MANIFEST), body)?;
    Ok(())
}

/// Reads the manifest pinned in `dir`.
pub fn read_manifest(dir: &Path) -> Result<FixtureManifest, GateError> {
    let body = fs::read(dir.join(FIXTURE_MANIFEST))?;
    Ok(serde_json::from_slice(&body)?)
}

/// Recomputes every pinned hash and compares. Any difference is fixture
/// drift and fails with a single-line reason naming the first file.
pub fn verify(manifest: &FixtureManifest, dir: &Path) -> Result<(), String> {
    if manifest.schema_version != 1 {
        return Err(format!(
            "SchemaMismatch: manifest schema_version {} != 1",
            manifest.schema_version
        ));
    }
    for (name, pinned) in &manifest.files {
        let path = dir.join(name);
        if !path.is_file() {
            return Err(format!("FixtureDrift: {name} missing"));
        }
        let recomputed =
            sha256_file_hex(&path).map_err(|e| format!("FixtureDrift: {name} unreadable: {e}"))?;
        if &recomputed != pinned {
            return Err(format!(
                "FixtureDrift: {name} expected {pinned} got {recomputed}"
            ));
        }
    }
    Ok(())
}
