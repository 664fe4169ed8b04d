// Lexer and parser tests.
//
// These exercise the front half of the pipeline: layout token emission,
// the Pratt precedence ladder, the statement grammar, and the
// accumulate-don't-throw diagnostic policy.

use peregrine::ast::AstNode;
use peregrine::lexer::{tokenize, TokenKind};
use peregrine::parse_source;

fn parse(source: &str) -> AstNode {
  parse_source(source, "test.pe").expect("parsing should succeed")
}

fn kinds(source: &str) -> Vec<TokenKind> {
  tokenize(source, "test.pe")
    .expect("lexing should succeed")
    .into_iter()
    .map(|token| token.kind)
    .collect()
}

#[test]
fn layout_tokens_delimit_blocks() {
  assert_eq!(
    kinds("if x:\n    pass\ny = 1\n"),
    vec![
      TokenKind::If,
      TokenKind::Identifier,
      TokenKind::Colon,
      TokenKind::Indent,
      TokenKind::Pass,
      TokenKind::Newline,
      TokenKind::Dedent,
      TokenKind::Identifier,
      TokenKind::Assign,
      TokenKind::Integer,
      TokenKind::Newline,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn blank_and_comment_lines_produce_no_tokens() {
  assert_eq!(
    kinds("x = 1\n\n# a comment\ny = 2\n"),
    vec![
      TokenKind::Identifier,
      TokenKind::Assign,
      TokenKind::Integer,
      TokenKind::Newline,
      TokenKind::Identifier,
      TokenKind::Assign,
      TokenKind::Integer,
      TokenKind::Newline,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn every_open_block_is_closed_at_eof() {
  let kinds = kinds("while a:\n    if b:\n        pass\n");
  let dedents = kinds
    .iter()
    .filter(|kind| **kind == TokenKind::Dedent)
    .count();
  assert_eq!(dedents, 2);
  assert_eq!(kinds.last(), Some(&TokenKind::Eof));
}

#[test]
fn lines_join_implicitly_inside_brackets() {
  assert_eq!(
    kinds("x = (1 +\n    2)\n"),
    vec![
      TokenKind::Identifier,
      TokenKind::Assign,
      TokenKind::LParen,
      TokenKind::Integer,
      TokenKind::Plus,
      TokenKind::Integer,
      TokenKind::RParen,
      TokenKind::Newline,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn compound_comparison_keywords_merge() {
  assert!(kinds("x = a not in b\n").contains(&TokenKind::NotIn));
  assert!(kinds("x = a is not b\n").contains(&TokenKind::IsNot));
}

#[test]
fn format_and_raw_markers_precede_the_string() {
  let kinds = kinds("x = f\"hi\"\ny = r\"raw\"\n");
  let format_at = kinds
    .iter()
    .position(|kind| *kind == TokenKind::Format)
    .unwrap();
  assert_eq!(kinds[format_at + 1], TokenKind::String);
  let raw_at = kinds.iter().position(|kind| *kind == TokenKind::Raw).unwrap();
  assert_eq!(kinds[raw_at + 1], TokenKind::String);
}

#[test]
fn tabs_in_indentation_are_rejected() {
  assert!(tokenize("if x:\n\tpass\n", "test.pe").is_err());
}

#[test]
fn multiplication_binds_tighter_than_addition() {
  let program = parse("x = 1 + 2 * 3\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::VariableStatement { value, .. } = &statements[0] else {
    panic!("expected a variable statement");
  };
  let AstNode::BinaryOp { tok, left, right } = value.as_ref() else {
    panic!("expected a binary operation");
  };
  assert_eq!(tok.lexeme, "+");
  assert!(matches!(left.as_ref(), AstNode::Integer { .. }));
  let AstNode::BinaryOp { tok: inner, .. } = right.as_ref() else {
    panic!("expected the multiplication below the addition");
  };
  assert_eq!(inner.lexeme, "*");
}

#[test]
fn equal_precedence_is_left_associative() {
  let program = parse("x = 1 - 2 - 3\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::VariableStatement { value, .. } = &statements[0] else {
    panic!("expected a variable statement");
  };
  // (1 - 2) - 3
  let AstNode::BinaryOp { left, right, .. } = value.as_ref() else {
    panic!("expected a binary operation");
  };
  assert!(matches!(left.as_ref(), AstNode::BinaryOp { .. }));
  assert!(matches!(right.as_ref(), AstNode::Integer { .. }));
}

#[test]
fn formatted_string_records_its_flags() {
  let program = parse("x = f\"hi\"\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::VariableStatement { value, .. } = &statements[0] else {
    panic!("expected a variable statement");
  };
  let AstNode::StringLiteral { formatted, raw, .. } = value.as_ref() else {
    panic!("expected a string literal");
  };
  assert!(*formatted);
  assert!(!*raw);
}

#[test]
fn variable_statement_carries_name_then_type() {
  let program = parse("count int = 0\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::VariableStatement {
    var_type, name, ..
  } = &statements[0]
  else {
    panic!("expected a variable statement");
  };
  assert_eq!(name.identifier_name(), Some("count"));
  let AstNode::TypeExpr { name: type_name, .. } = var_type.as_ref() else {
    panic!("expected a type expression");
  };
  assert_eq!(type_name, "int");
}

#[test]
fn function_def_supports_defaults_and_tuple_returns() {
  let program = parse("def pair(x int = 3) -> (int, int):\n    return x, x\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::FunctionDef {
    parameters,
    return_type,
    body,
    ..
  } = &statements[0]
  else {
    panic!("expected a function definition");
  };
  assert_eq!(parameters.len(), 1);
  assert!(!parameters[0].default.is_no_literal());
  let AstNode::ListLiteral { elements, .. } = return_type.as_ref() else {
    panic!("expected a tuple return type");
  };
  assert_eq!(elements.len(), 2);

  let AstNode::Block { statements, .. } = body.as_ref() else {
    panic!("expected a block body");
  };
  let AstNode::Return { value, .. } = &statements[0] else {
    panic!("expected a return");
  };
  assert!(matches!(value.as_ref(), AstNode::ListLiteral { .. }));
}

#[test]
fn match_wildcard_patterns_become_the_sentinel() {
  let program = parse("match x, y:\n    case 1, 2:\n        pass\n    case _:\n        pass\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::Match {
    subjects, cases, ..
  } = &statements[0]
  else {
    panic!("expected a match statement");
  };
  assert_eq!(subjects.len(), 2);
  assert_eq!(cases.len(), 2);
  assert_eq!(cases[0].0.len(), 2);
  assert_eq!(cases[1].0.len(), 1);
  assert!(cases[1].0[0].is_no_literal());
}

#[test]
fn decorators_collect_in_source_order() {
  let program = parse("@outer\n@inner\ndef f():\n    pass\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::Decorator { items, body, .. } = &statements[0] else {
    panic!("expected a decorator statement");
  };
  assert_eq!(items.len(), 2);
  assert_eq!(items[0].identifier_name(), Some("outer"));
  assert_eq!(items[1].identifier_name(), Some("inner"));
  assert!(matches!(body.as_ref(), AstNode::FunctionDef { .. }));
}

#[test]
fn from_import_populates_symbols() {
  let program = parse("from os import path, sep as separator\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::Import { symbols, .. } = &statements[0] else {
    panic!("expected an import statement");
  };
  assert_eq!(symbols.len(), 2);
  assert!(symbols[0].1.is_no_literal());
  assert_eq!(symbols[1].1.identifier_name(), Some("separator"));

  let plain = parse("import os\n");
  let AstNode::Program { statements } = plain else {
    panic!("expected a program");
  };
  let AstNode::Import { symbols, .. } = &statements[0] else {
    panic!("expected an import statement");
  };
  assert!(symbols.is_empty());
}

#[test]
fn try_except_collects_clauses_and_else() {
  let program = parse(
    "try:\n    pass\nexcept A, B as e:\n    pass\nexcept C:\n    pass\nelse:\n    pass\n",
  );
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::TryExcept {
    clauses, else_body, ..
  } = &statements[0]
  else {
    panic!("expected a try statement");
  };
  assert_eq!(clauses.len(), 2);
  assert_eq!(clauses[0].types.len(), 2);
  assert_eq!(clauses[0].bind.identifier_name(), Some("e"));
  assert!(clauses[1].bind.is_no_literal());
  assert!(!else_body.is_no_literal());
}

#[test]
fn subscript_assignment_rewrites_to_a_variable_statement() {
  let program = parse("a[0] = 5\n");
  let AstNode::Program { statements } = program else {
    panic!("expected a program");
  };
  let AstNode::VariableStatement { name, value, .. } = &statements[0] else {
    panic!("expected a variable statement");
  };
  assert!(matches!(name.as_ref(), AstNode::ListOrDictAccess { .. }));
  assert!(matches!(value.as_ref(), AstNode::Integer { .. }));
}

#[test]
fn dot_rhs_must_be_a_name_or_call() {
  assert!(parse_source("x = a.(b + c)\n", "test.pe").is_err());
  assert!(parse_source("x = a.b\n", "test.pe").is_ok());
  assert!(parse_source("x = a.b(1)\n", "test.pe").is_ok());
  // the subscript applies to the whole member expression
  assert!(parse_source("x = a.b[0]\n", "test.pe").is_ok());
}

#[test]
fn parsing_is_deterministic() {
  let source = "def f(x int) int:\n    for i in x:\n        pass\n    return x\n";
  let first = format!("{:?}", parse(source));
  let second = format!("{:?}", parse(source));
  assert_eq!(first, second);
}

#[test]
fn errors_accumulate_instead_of_stopping() {
  let errors = parse_source("def main(:\n    pass\nwhile :\n    pass\n", "test.pe")
    .expect_err("both statements are malformed");
  assert!(errors.len() >= 2);
}

#[test]
fn unterminated_blocks_are_reported() {
  assert!(parse_source("if x:\n", "test.pe").is_err());
}

#[test]
fn expression_position_keyword_is_rejected() {
  let errors = parse_source("x = import\n", "test.pe").expect_err("import is not an expression");
  let rendered = format!("{}", errors[0]);
  assert!(rendered.contains("is not an expression"));
}
