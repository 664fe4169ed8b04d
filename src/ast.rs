//! The abstract syntax tree produced by the parser.
//!
//! Nodes form a closed family: lowering matches on the enum exhaustively, so
//! a new construct cannot be forgotten in the code generator. Every optional
//! child slot holds the `NoLiteral` sentinel rather than an `Option`, which
//! keeps child traversal uniform. Ownership is a strict tree; tokens are
//! stored by value for diagnostics.

use crate::lexer::Token;

/// A function or method parameter: `name`, `name type` or `name type = default`.
#[derive(Debug, Clone)]
pub struct Parameter {
  pub p_type: AstNode,
  pub name: AstNode,
  pub default: AstNode,
}

/// One `except` clause: the matched error expressions, the optional bound
/// name and the handler body.
#[derive(Debug, Clone)]
pub struct ExceptClause {
  pub types: Vec<AstNode>,
  pub bind: AstNode,
  pub body: AstNode,
}

#[derive(Debug, Clone)]
pub enum AstNode {
  Program {
    statements: Vec<AstNode>,
  },
  Block {
    tok: Token,
    statements: Vec<AstNode>,
  },

  // ----- Declarations -----
  VariableStatement {
    tok: Token,
    var_type: Box<AstNode>,
    name: Box<AstNode>,
    value: Box<AstNode>,
  },
  ConstDeclaration {
    tok: Token,
    const_type: Box<AstNode>,
    name: Box<AstNode>,
    value: Box<AstNode>,
  },
  TypeDefinition {
    tok: Token,
    name: Box<AstNode>,
    base_type: Box<AstNode>,
  },
  FunctionDef {
    tok: Token,
    return_type: Box<AstNode>,
    name: Box<AstNode>,
    parameters: Vec<Parameter>,
    body: Box<AstNode>,
  },
  ClassDef {
    tok: Token,
    name: Box<AstNode>,
    parents: Vec<AstNode>,
    attributes: Vec<AstNode>,
    methods: Vec<AstNode>,
    other: Vec<AstNode>,
  },
  UnionDef {
    tok: Token,
    name: Box<AstNode>,
    fields: Vec<(AstNode, AstNode)>,
  },
  EnumDef {
    tok: Token,
    name: Box<AstNode>,
    fields: Vec<(AstNode, AstNode)>,
  },
  LambdaType {
    tok: Token,
    arg_types: Vec<AstNode>,
    return_types: Vec<AstNode>,
  },

  // ----- Control flow -----
  If {
    tok: Token,
    condition: Box<AstNode>,
    body: Box<AstNode>,
    elifs: Vec<(AstNode, AstNode)>,
    else_body: Box<AstNode>,
  },
  While {
    tok: Token,
    condition: Box<AstNode>,
    body: Box<AstNode>,
  },
  For {
    tok: Token,
    variables: Vec<AstNode>,
    sequence: Box<AstNode>,
    body: Box<AstNode>,
  },
  Match {
    tok: Token,
    subjects: Vec<AstNode>,
    cases: Vec<(Vec<AstNode>, AstNode)>,
    default_body: Box<AstNode>,
  },
  Scope {
    tok: Token,
    body: Box<AstNode>,
  },
  With {
    tok: Token,
    bindings: Vec<(AstNode, AstNode)>,
    body: Box<AstNode>,
  },
  TryExcept {
    tok: Token,
    body: Box<AstNode>,
    clauses: Vec<ExceptClause>,
    else_body: Box<AstNode>,
  },
  Return {
    tok: Token,
    value: Box<AstNode>,
  },
  Break {
    tok: Token,
  },
  Continue {
    tok: Token,
  },
  Pass {
    tok: Token,
  },
  Raise {
    tok: Token,
    value: Box<AstNode>,
  },
  Assert {
    tok: Token,
    condition: Box<AstNode>,
  },
  CppCode {
    tok: Token,
    code: String,
  },

  // ----- Expressions -----
  Integer {
    tok: Token,
    value: String,
  },
  Decimal {
    tok: Token,
    value: String,
  },
  StringLiteral {
    tok: Token,
    value: String,
    formatted: bool,
    raw: bool,
  },
  BoolLiteral {
    tok: Token,
    value: bool,
  },
  NoneLiteral {
    tok: Token,
  },
  Identifier {
    tok: Token,
    name: String,
  },
  TypeExpr {
    tok: Token,
    name: String,
    generics: Vec<AstNode>,
  },
  BinaryOp {
    tok: Token,
    left: Box<AstNode>,
    right: Box<AstNode>,
  },
  PrefixOp {
    tok: Token,
    right: Box<AstNode>,
  },
  PostfixOp {
    tok: Token,
    left: Box<AstNode>,
  },
  FunctionCall {
    tok: Token,
    callee: Box<AstNode>,
    arguments: Vec<AstNode>,
  },
  ListOrDictAccess {
    tok: Token,
    container: Box<AstNode>,
    keys: Vec<AstNode>,
  },
  DotExpression {
    tok: Token,
    owner: Box<AstNode>,
    referenced: Box<AstNode>,
  },
  ArrowExpression {
    tok: Token,
    owner: Box<AstNode>,
    referenced: Box<AstNode>,
  },
  ListLiteral {
    tok: Token,
    elements: Vec<AstNode>,
  },
  DictLiteral {
    tok: Token,
    entries: Vec<(AstNode, AstNode)>,
  },
  TernaryIf {
    tok: Token,
    condition: Box<AstNode>,
    if_value: Box<AstNode>,
    else_value: Box<AstNode>,
  },
  Cast {
    tok: Token,
    target_type: Box<AstNode>,
    value: Box<AstNode>,
  },
  PointerType {
    tok: Token,
    base: Box<AstNode>,
  },
  RefType {
    tok: Token,
    base: Box<AstNode>,
  },
  DefaultArg {
    tok: Token,
    name: Box<AstNode>,
    value: Box<AstNode>,
  },

  // ----- Modifiers -----
  Decorator {
    tok: Token,
    items: Vec<AstNode>,
    body: Box<AstNode>,
  },
  Static {
    tok: Token,
    body: Box<AstNode>,
  },
  Inline {
    tok: Token,
    body: Box<AstNode>,
  },
  Export {
    tok: Token,
    body: Box<AstNode>,
  },

  // ----- Assignment forms -----
  MultipleAssign {
    tok: Token,
    names: Vec<AstNode>,
    values: Vec<AstNode>,
  },
  AugAssign {
    tok: Token,
    name: Box<AstNode>,
    value: Box<AstNode>,
  },

  Import {
    tok: Token,
    module: (Box<AstNode>, Box<AstNode>),
    symbols: Vec<(AstNode, AstNode)>,
  },

  /// Canonical representation of an absent child slot.
  NoLiteral,
}

impl AstNode {
  pub fn no_literal() -> Self {
    AstNode::NoLiteral
  }

  pub fn is_no_literal(&self) -> bool {
    matches!(self, AstNode::NoLiteral)
  }

  /// The token the node was built from. `Program` and `NoLiteral` are
  /// synthesized and have none.
  pub fn token(&self) -> Option<&Token> {
    match self {
      AstNode::Program { .. } | AstNode::NoLiteral => None,
      AstNode::Block { tok, .. }
      | AstNode::VariableStatement { tok, .. }
      | AstNode::ConstDeclaration { tok, .. }
      | AstNode::TypeDefinition { tok, .. }
      | AstNode::FunctionDef { tok, .. }
      | AstNode::ClassDef { tok, .. }
      | AstNode::UnionDef { tok, .. }
      | AstNode::EnumDef { tok, .. }
      | AstNode::LambdaType { tok, .. }
      | AstNode::If { tok, .. }
      | AstNode::While { tok, .. }
      | AstNode::For { tok, .. }
      | AstNode::Match { tok, .. }
      | AstNode::Scope { tok, .. }
      | AstNode::With { tok, .. }
      | AstNode::TryExcept { tok, .. }
      | AstNode::Return { tok, .. }
      | AstNode::Break { tok }
      | AstNode::Continue { tok }
      | AstNode::Pass { tok }
      | AstNode::Raise { tok, .. }
      | AstNode::Assert { tok, .. }
      | AstNode::CppCode { tok, .. }
      | AstNode::Integer { tok, .. }
      | AstNode::Decimal { tok, .. }
      | AstNode::StringLiteral { tok, .. }
      | AstNode::BoolLiteral { tok, .. }
      | AstNode::NoneLiteral { tok }
      | AstNode::Identifier { tok, .. }
      | AstNode::TypeExpr { tok, .. }
      | AstNode::BinaryOp { tok, .. }
      | AstNode::PrefixOp { tok, .. }
      | AstNode::PostfixOp { tok, .. }
      | AstNode::FunctionCall { tok, .. }
      | AstNode::ListOrDictAccess { tok, .. }
      | AstNode::DotExpression { tok, .. }
      | AstNode::ArrowExpression { tok, .. }
      | AstNode::ListLiteral { tok, .. }
      | AstNode::DictLiteral { tok, .. }
      | AstNode::TernaryIf { tok, .. }
      | AstNode::Cast { tok, .. }
      | AstNode::PointerType { tok, .. }
      | AstNode::RefType { tok, .. }
      | AstNode::DefaultArg { tok, .. }
      | AstNode::Decorator { tok, .. }
      | AstNode::Static { tok, .. }
      | AstNode::Inline { tok, .. }
      | AstNode::Export { tok, .. }
      | AstNode::MultipleAssign { tok, .. }
      | AstNode::AugAssign { tok, .. }
      | AstNode::Import { tok, .. } => Some(tok),
    }
  }

  /// Name of an `Identifier` node, if that is what this is.
  pub fn identifier_name(&self) -> Option<&str> {
    match self {
      AstNode::Identifier { name, .. } => Some(name),
      _ => None,
    }
  }
}
