//! Shared diagnostics used across the compilation pipeline.
//!
//! Parsing problems are accumulated rather than thrown: the parser records
//! every error it sees and keeps going, so a single run reports all of them.
//! Each diagnostic carries the offending line and points at the column with
//! a caret.

use snafu::Snafu;

use crate::lexer::Token;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, Snafu)]
pub enum CompileError {
  #[snafu(display("{file}:{line}:{column}: {message}\n    {statement}\n    {marker}"))]
  Lex {
    file: String,
    line: usize,
    column: usize,
    statement: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{file}:{line}:{column}: {message}\n    {statement}\n    {marker}"))]
  Syntax {
    file: String,
    line: usize,
    column: usize,
    statement: String,
    marker: String,
    message: String,
  },

  #[snafu(display("internal error: {message}"))]
  Internal { message: String },
}

impl CompileError {
  /// Lexical error anchored at an explicit position.
  pub fn lex(
    file: &str,
    line: usize,
    column: usize,
    statement: &str,
    message: impl Into<String>,
  ) -> Self {
    Self::Lex {
      file: file.to_string(),
      line,
      column,
      statement: statement.to_string(),
      marker: caret(column),
      message: message.into(),
    }
  }

  /// Syntax error anchored at the token that triggered it.
  pub fn syntax(file: &str, token: &Token, message: impl Into<String>) -> Self {
    Self::Syntax {
      file: file.to_string(),
      line: token.line,
      column: token.column,
      statement: token.statement.clone(),
      marker: caret(token.column),
      message: message.into(),
    }
  }

  /// Bug in the compiler itself, not in the program being compiled.
  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal {
      message: message.into(),
    }
  }
}

fn caret(column: usize) -> String {
  format!("{}^", " ".repeat(column.saturating_sub(1)))
}
