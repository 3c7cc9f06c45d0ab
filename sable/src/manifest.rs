#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use sable_core::CheckerConfig;
use thiserror::Error;

pub const MANIFEST_FILE: &str = "Sable.toml";

/// Written by `sable init`.
pub const TEMPLATE: &str = r#"[checker]
# strict | not-specified-restricted | not-specified-unrestricted | none
access-check-mode = "not-specified-unrestricted"
attachments-enabled = false

[program]
sources = ["src"]
"#;

#[derive(Debug, Error, Diagnostic)]
#[error("manifest error: {message}")]
#[diagnostic(code(sable::manifest))]
pub struct ManifestError {
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Manifest {
    pub checker: CheckerConfig,
    pub program: ProgramSection,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProgramSection {
    pub sources: Vec<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedManifest {
    pub path: Option<PathBuf>,
    pub checker: CheckerConfig,
    /// Source roots, relative to the manifest directory.
    pub sources: Vec<PathBuf>,
}

pub fn parse_manifest(raw: &str) -> Result<Manifest, toml::de::Error> {
    toml::from_str(raw)
}

/// Walks up from `start` looking for `Sable.toml`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };
    loop {
        let candidate = dir.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

pub fn load_manifest(path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|e| ManifestError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let manifest = parse_manifest(&raw).map_err(|e| ManifestError {
        message: format!("failed to parse {}: {e}", path.display()),
    })?;
    let base = path.parent().unwrap_or(Path::new("."));
    let mut sources: Vec<PathBuf> = manifest
        .program
        .sources
        .iter()
        .map(|p| resolve_path(base, p))
        .collect();
    dedup_paths(&mut sources);
    Ok(ResolvedManifest {
        path: Some(path.to_path_buf()),
        checker: manifest.checker,
        sources,
    })
}

/// Uses `explicit` when given, otherwise the nearest manifest above `start`.
/// No manifest at all means defaults.
pub fn load_resolved_manifest(
    explicit: Option<&Path>,
    start: &Path,
) -> Result<ResolvedManifest, ManifestError> {
    match explicit {
        Some(path) => load_manifest(path),
        None => match find_manifest(start) {
            Some(path) => load_manifest(&path),
            None => Ok(ResolvedManifest::default()),
        },
    }
}

fn resolve_path(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn dedup_paths(paths: &mut Vec<PathBuf>) {
    let mut seen = std::collections::BTreeSet::new();
    paths.retain(|p| seen.insert(p.clone()));
}
