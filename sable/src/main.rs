#![forbid(unsafe_code)]

mod driver;
mod manifest;
mod report;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use rayon::prelude::*;
use sable_core::{AccessCheckMode, CheckerConfig};

use crate::driver::Unit;
use crate::report::FileReport;

#[derive(Parser, Debug)]
#[command(name = "sable", version, about = "Semantic checker for resource-oriented programs")]
struct Cli {
    /// Log at debug level (otherwise `SABLE_LOG` decides).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    /// Every declaration needs an access modifier.
    Strict,
    /// A missing modifier means `access(self)`.
    NotSpecifiedRestricted,
    /// A missing modifier means `access(all)`.
    NotSpecifiedUnrestricted,
    /// Skip access checks.
    None,
}

impl From<ModeArg> for AccessCheckMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => AccessCheckMode::Strict,
            ModeArg::NotSpecifiedRestricted => AccessCheckMode::NotSpecifiedRestricted,
            ModeArg::NotSpecifiedUnrestricted => AccessCheckMode::NotSpecifiedUnrestricted,
            ModeArg::None => AccessCheckMode::None,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Rendered diagnostics on stderr.
    Human,
    /// One JSON document on stdout.
    Json,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check source files or directories.
    Check {
        /// Files or directories; defaults to the manifest's sources.
        paths: Vec<PathBuf>,

        #[arg(long, value_enum)]
        access_check_mode: Option<ModeArg>,

        /// Allow attachment declarations.
        #[arg(long)]
        attachments: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,

        /// Use this manifest instead of searching for `Sable.toml`.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print the global values a file declares.
    Types {
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },
    /// Write a template `Sable.toml`.
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing manifest.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Check {
            paths,
            access_check_mode,
            attachments,
            format,
            manifest,
        } => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            let start = paths.first().cloned().unwrap_or(cwd);
            let resolved = manifest::load_resolved_manifest(manifest.as_deref(), &start)?;
            if let Some(path) = &resolved.path {
                tracing::debug!(manifest = %path.display(), "using manifest");
            }

            let mut config = resolved.checker;
            if let Some(mode) = access_check_mode {
                config = config.with_mode(mode.into());
            }
            if attachments {
                config = config.with_attachments(true);
            }

            let roots = if paths.is_empty() {
                resolved.sources
            } else {
                paths
            };
            if roots.is_empty() {
                return Err(miette::miette!(
                    "no input files (pass paths or list sources in Sable.toml)"
                ));
            }
            check_paths(&roots, &config, format)
        }
        Cmd::Types { path, format } => print_types(&path, format),
        Cmd::Init { dir, force } => {
            let target = dir.join(manifest::MANIFEST_FILE);
            if target.exists() && !force {
                return Err(miette::miette!(
                    "{} already exists (use --force to overwrite)",
                    display_path(&target)
                ));
            }
            fs::create_dir_all(&dir).into_diagnostic()?;
            fs::write(&target, manifest::TEMPLATE).into_diagnostic()?;
            println!("wrote {}", display_path(&target));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SABLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn check_paths(roots: &[PathBuf], config: &CheckerConfig, format: OutputFormat) -> miette::Result<()> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            collect_sable_files(root, &mut files)?;
        } else {
            files.push(root.clone());
        }
    }
    files.sort();
    files.dedup();
    tracing::info!(files = files.len(), mode = %config.access_check_mode, "checking");

    let parsed: Vec<miette::Result<Unit>> = files.par_iter().map(|path| parse_file(path)).collect();
    let mut units = Vec::with_capacity(parsed.len());
    let mut parse_failures = 0usize;
    for result in parsed {
        match result {
            Ok(unit) => units.push(unit),
            Err(report) => {
                parse_failures += 1;
                eprintln!("{report:?}");
            }
        }
    }

    let checked = driver::check_units(units, config);
    let diagnostics: usize = checked.iter().map(|c| c.checked.diagnostics.len()).sum();

    match format {
        OutputFormat::Human => {
            for unit in &checked {
                report::render_human(
                    &display_path(&unit.path),
                    &unit.src,
                    &unit.checked.diagnostics,
                );
            }
        }
        OutputFormat::Json => {
            let reports: Vec<FileReport> = checked
                .iter()
                .map(|unit| {
                    FileReport::new(
                        display_path(&unit.path),
                        &unit.checked.elaboration,
                        &unit.checked.diagnostics,
                    )
                })
                .collect();
            let json = serde_json::to_string_pretty(&reports).into_diagnostic()?;
            println!("{json}");
        }
    }

    if parse_failures > 0 || diagnostics > 0 {
        return Err(miette::miette!(
            "{diagnostics} diagnostic(s), {parse_failures} file(s) failed to parse"
        ));
    }
    if format == OutputFormat::Human {
        eprintln!("checked {} file(s), no diagnostics", checked.len());
    }
    Ok(())
}

fn parse_file(path: &Path) -> miette::Result<Unit> {
    let src = fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("failed to read {}", display_path(path))))?;
    let source = NamedSource::new(display_path(path), src.clone());
    let program = sable_parse::parse_source(&src).map_err(|e| e.with_source_code(source))?;
    Ok(Unit {
        location: driver::location_for(path),
        path: path.to_path_buf(),
        src,
        program,
    })
}

fn print_types(path: &Path, format: OutputFormat) -> miette::Result<()> {
    let unit = parse_file(path)?;
    let display = display_path(&unit.path);
    let config = CheckerConfig::default().with_location(unit.location.clone());
    let checked = sable_core::check(&unit.program, config);
    report::render_human(&display, &unit.src, &checked.diagnostics);

    let records = report::global_value_records(&checked.elaboration);
    match format {
        OutputFormat::Human => {
            for r in &records {
                println!("{} {}: {} [{}]", r.kind, r.name, r.ty, r.access);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&records).into_diagnostic()?;
            println!("{json}");
        }
    }
    Ok(())
}

fn collect_sable_files(dir: &Path, out: &mut Vec<PathBuf>) -> miette::Result<()> {
    for entry in fs::read_dir(dir).into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        let p = entry.path();
        if p.is_dir() {
            collect_sable_files(&p, out)?;
        } else if p.extension().and_then(|e| e.to_str()) == Some("sable") {
            out.push(p);
        }
    }
    Ok(())
}

fn display_path(p: &Path) -> String {
    p.to_string_lossy().to_string()
}
