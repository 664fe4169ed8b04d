//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `lexer` performs lexical analysis, including the indentation layout
//!   tokens the grammar is built on.
//! - `parser` owns all syntactic knowledge and produces the program AST,
//!   accumulating diagnostics instead of stopping at the first problem.
//! - `codegen` lowers the AST into C++ source text, mangling identifiers as
//!   it goes.
//! - `symbols` and `error` hold the structures the other stages share.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod symbols;

pub use error::{CompileError, CompileResult};

/// Compile Peregrine source text into a C++ translation unit.
///
/// `filename` feeds both diagnostics and the per-file mangle prefix, so the
/// same source compiled under two names yields two distinct symbol sets.
pub fn compile(source: &str, filename: &str) -> Result<String, Vec<CompileError>> {
  let tokens = lexer::tokenize(source, filename).map_err(|err| vec![err])?;
  let program = parser::Parser::new(tokens, filename).parse()?;
  codegen::Codegen::new(filename)
    .generate(&program)
    .map_err(|err| vec![err])
}

/// Parse only, for AST inspection.
pub fn parse_source(source: &str, filename: &str) -> Result<ast::AstNode, Vec<CompileError>> {
  let tokens = lexer::tokenize(source, filename).map_err(|err| vec![err])?;
  parser::Parser::new(tokens, filename).parse()
}
