#![forbid(unsafe_code)]

mod error;
mod parser;

use miette::IntoDiagnostic;
use sable_lex::Lexer;

pub use error::ParseError;
pub use parser::Parser;

pub fn parse_source(src: &str) -> miette::Result<sable_ast::Program> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_program().into_diagnostic()
}

/// Parse a source file while attempting to recover from errors.
///
/// Returns a best-effort AST and a list of encountered `ParseError`s.
pub fn parse_source_with_recovery(
    src: &str,
) -> miette::Result<(sable_ast::Program, Vec<ParseError>)> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    Ok(parser.parse_program_with_recovery())
}

pub fn parse_expr(src: &str) -> miette::Result<sable_ast::Expr> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_expr_eof().into_diagnostic()
}
