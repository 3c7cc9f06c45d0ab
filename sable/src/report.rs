#![forbid(unsafe_code)]

use miette::{Diagnostic, NamedSource};
use sable_ast::Span;
use sable_core::{Elaboration, SemanticError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SpanRange {
    pub offset: usize,
    pub len: usize,
}

impl From<Span> for SpanRange {
    fn from(s: Span) -> Self {
        Self {
            offset: s.offset(),
            len: s.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRecord {
    pub code: String,
    pub message: String,
    pub warning: bool,
    pub offset: usize,
    pub length: usize,
}

impl From<&SemanticError> for DiagnosticRecord {
    fn from(err: &SemanticError) -> Self {
        let span = SpanRange::from(err.span());
        Self {
            code: err
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "sable::check".to_string()),
            message: err.to_string(),
            warning: err.is_warning(),
            offset: span.offset,
            length: span.len,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub location: String,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl FileReport {
    pub fn new(file: String, elaboration: &Elaboration, diagnostics: &[SemanticError]) -> Self {
        Self {
            file,
            location: elaboration.location.to_string(),
            diagnostics: diagnostics.iter().map(DiagnosticRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalValueRecord {
    pub name: String,
    pub kind: &'static str,
    pub access: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub span: SpanRange,
}

pub fn global_value_records(elaboration: &Elaboration) -> Vec<GlobalValueRecord> {
    let registry = elaboration.registry();
    elaboration
        .global_values()
        .map(|(name, value)| GlobalValueRecord {
            name: name.clone(),
            kind: value.kind.name(),
            access: value.access.describe(registry),
            ty: elaboration.type_name(&value.ty),
            span: value.span.into(),
        })
        .collect()
}

/// Prints each diagnostic against its file with miette's graphical handler.
pub fn render_human(file: &str, src: &str, diagnostics: &[SemanticError]) {
    let source = NamedSource::new(file, src.to_string());
    for err in diagnostics {
        let report = miette::Report::new(err.clone()).with_source_code(source.clone());
        eprintln!("{report:?}");
    }
}
