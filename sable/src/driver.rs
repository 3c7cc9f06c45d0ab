#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use sable_ast::{ImportLocation, Program};
use sable_core::{
    Checked, Checker, CheckerConfig, Location, MapImportResolver, StandardLibrary,
};

/// A parsed source file waiting to be checked.
pub struct Unit {
    pub path: PathBuf,
    pub src: String,
    pub location: Location,
    pub program: Program,
}

pub struct CheckedUnit {
    pub path: PathBuf,
    pub src: String,
    pub checked: Checked,
}

/// Files import each other by stem: `import A from "token"` reads
/// `token.sable`.
pub fn location_for(path: &Path) -> Location {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    Location::named(stem)
}

/// Groups units into waves; every unit comes after the units it imports.
/// Units caught in an import cycle share the last wave and report their
/// imports as unresolved.
pub fn waves(units: &[Unit]) -> Vec<Vec<usize>> {
    let by_location: FxHashMap<&Location, usize> = units
        .iter()
        .enumerate()
        .map(|(i, u)| (&u.location, i))
        .collect();

    let deps: Vec<Vec<usize>> = units
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let mut out: Vec<usize> = unit
                .program
                .imports
                .iter()
                .filter_map(|import| match &import.location {
                    ImportLocation::Path(p) => {
                        let loc = Location::named(p.node.clone());
                        by_location.get(&loc).copied()
                    }
                    ImportLocation::Address(_) => None,
                })
                .filter(|&dep| dep != i)
                .collect();
            out.sort_unstable();
            out.dedup();
            out
        })
        .collect();

    let mut done = vec![false; units.len()];
    let mut remaining = units.len();
    let mut out = Vec::new();
    while remaining > 0 {
        let wave: Vec<usize> = (0..units.len())
            .filter(|&i| !done[i] && deps[i].iter().all(|&d| done[d]))
            .collect();
        if wave.is_empty() {
            out.push((0..units.len()).filter(|&i| !done[i]).collect());
            break;
        }
        for &i in &wave {
            done[i] = true;
        }
        remaining -= wave.len();
        out.push(wave);
    }
    out
}

/// Checks every unit, in parallel within each wave. Results come back in
/// input order.
pub fn check_units(units: Vec<Unit>, config: &CheckerConfig) -> Vec<CheckedUnit> {
    let plan = waves(&units);
    let mut resolver = MapImportResolver::new();
    let mut results: Vec<Option<Checked>> = (0..units.len()).map(|_| None).collect();

    for (n, wave) in plan.iter().enumerate() {
        tracing::debug!(wave = n, files = wave.len(), "checking wave");
        let checked: Vec<(usize, Checked)> = wave
            .par_iter()
            .map(|&i| {
                let unit = &units[i];
                let config = config.clone().with_location(unit.location.clone());
                let checked = Checker::new(config)
                    .with_standard_library(StandardLibrary::base())
                    .with_import_resolver(&resolver)
                    .check_program(&unit.program);
                tracing::debug!(
                    file = %unit.path.display(),
                    diagnostics = checked.diagnostics.len(),
                    "checked"
                );
                (i, checked)
            })
            .collect();
        for (i, checked) in checked {
            resolver.insert(Arc::new(checked.elaboration.clone()));
            results[i] = Some(checked);
        }
    }

    units
        .into_iter()
        .zip(results)
        .filter_map(|(unit, checked)| {
            checked.map(|checked| CheckedUnit {
                path: unit.path,
                src: unit.src,
                checked,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::ErrorKind;

    fn unit(name: &str, src: &str) -> Unit {
        let path = PathBuf::from(format!("{name}.sable"));
        Unit {
            location: location_for(&path),
            program: sable_parse::parse_source(src).unwrap(),
            src: src.to_string(),
            path,
        }
    }

    #[test]
    fn importers_wait_for_their_imports() {
        let units = vec![
            unit("app", "import Token from \"token\"\nimport Vault from \"vault\""),
            unit("vault", "import Token from \"token\"\naccess(all) resource Vault {}"),
            unit("token", "access(all) resource Token {}"),
        ];
        assert_eq!(waves(&units), vec![vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn cycles_land_in_the_last_wave() {
        let units = vec![
            unit("a", "import B from \"b\"\naccess(all) struct A {}"),
            unit("b", "import A from \"a\"\naccess(all) struct B {}"),
            unit("c", "access(all) struct C {}"),
        ];
        assert_eq!(waves(&units), vec![vec![2], vec![0, 1]]);
    }

    #[test]
    fn checked_files_resolve_each_other() {
        let units = vec![
            unit(
                "app",
                "import Token from \"token\"\naccess(all) fun mint(): @Token {\n return <-create Token()\n}",
            ),
            unit("token", "access(all) resource Token {}"),
        ];
        let checked = check_units(units, &CheckerConfig::default());
        assert_eq!(checked.len(), 2);
        assert_eq!(checked[0].path, PathBuf::from("app.sable"));
        assert!(checked.iter().all(|c| c.checked.is_ok()));
    }

    #[test]
    fn broken_imports_are_reported_by_the_importer() {
        let units = vec![
            unit("lib", "access(all) let x: Int = \"nope\""),
            unit("app", "import x from \"lib\""),
        ];
        let checked = check_units(units, &CheckerConfig::default());
        assert_eq!(checked[0].checked.kinds(), vec![ErrorKind::TypeMismatch]);
        assert_eq!(checked[1].checked.kinds(), vec![ErrorKind::ImportedProgram]);
    }
}
