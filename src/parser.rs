//! Recursive-descent parser producing the program AST.
//!
//! Statements are dispatched on the current token kind; expressions use a
//! Pratt precedence ladder driven by a single token-to-precedence table.
//! Errors are accumulated, not thrown: `expect` records a diagnostic on a
//! mismatch and still advances, so one run surfaces every problem it can.
//!
//! Newline handling follows one rule: expression parsing never consumes a
//! `Newline`; every statement parser ends with a single `advance_on_newline`.

use crate::ast::{AstNode, ExceptClause, Parameter};
use crate::error::CompileError;
use crate::lexer::{describe_token, Token, TokenKind};

/// Binding strength classes, weakest first. The `Ord` derive is what the
/// Pratt loop compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
  Lowest,
  AndOr,
  Not,
  Compare,
  BitOr,
  BitXor,
  BitAnd,
  BitShift,
  SumMinus,
  MulDiv,
  Expo,
  Prefix,
  DotRef,
  ListAccess,
  Call,
}

/// Infix binding strength for a token kind; anything absent parses no
/// further as an infix and reads as `Lowest`.
pub fn precedence_of(kind: TokenKind) -> Precedence {
  match kind {
    TokenKind::And | TokenKind::Or => Precedence::AndOr,
    TokenKind::Not => Precedence::Not,
    TokenKind::EqEq
    | TokenKind::NotEq
    | TokenKind::Less
    | TokenKind::Greater
    | TokenKind::LessEq
    | TokenKind::GreaterEq
    | TokenKind::Is
    | TokenKind::IsNot
    | TokenKind::In
    | TokenKind::NotIn => Precedence::Compare,
    TokenKind::BitOr => Precedence::BitOr,
    TokenKind::BitXor => Precedence::BitXor,
    TokenKind::BitAnd => Precedence::BitAnd,
    TokenKind::ShiftLeft | TokenKind::ShiftRight => Precedence::BitShift,
    TokenKind::Plus | TokenKind::Minus => Precedence::SumMinus,
    TokenKind::Star | TokenKind::Slash | TokenKind::Percent | TokenKind::FloorDiv => {
      Precedence::MulDiv
    }
    TokenKind::Power => Precedence::Expo,
    TokenKind::BitNot | TokenKind::Increment | TokenKind::Decrement => Precedence::Prefix,
    TokenKind::Dot | TokenKind::Arrow => Precedence::DotRef,
    TokenKind::ListOpen => Precedence::ListAccess,
    TokenKind::LParen => Precedence::Call,
    _ => Precedence::Lowest,
  }
}

fn describe_kind(kind: TokenKind) -> &'static str {
  match kind {
    TokenKind::Identifier => "an identifier",
    TokenKind::Colon => "':'",
    TokenKind::Assign => "'='",
    TokenKind::LParen => "'('",
    TokenKind::RParen => "')'",
    TokenKind::ListClose => "']'",
    TokenKind::Less => "'<'",
    TokenKind::Greater => "'>'",
    TokenKind::Import => "'import'",
    TokenKind::In => "'in'",
    TokenKind::Else => "'else'",
    TokenKind::String => "a string literal",
    TokenKind::Indent => "an indented block",
    TokenKind::Dedent => "the end of an indented block",
    TokenKind::Newline => "the end of the line",
    _ => "a token",
  }
}

pub struct Parser {
  tokens: Vec<Token>,
  index: usize,
  filename: String,
  errors: Vec<CompileError>,
}

impl Parser {
  pub fn new(mut tokens: Vec<Token>, filename: &str) -> Self {
    if tokens.is_empty() {
      tokens.push(Token::new(TokenKind::Eof, "", 1, 1, ""));
    }
    Self {
      tokens,
      index: 0,
      filename: filename.to_string(),
      errors: Vec::new(),
    }
  }

  /// Parse the whole token stream into a `Program`, or hand back every
  /// diagnostic that was recorded along the way.
  pub fn parse(mut self) -> Result<AstNode, Vec<CompileError>> {
    let mut statements = Vec::new();
    while self.current().kind != TokenKind::Eof {
      statements.push(self.parse_statement());
      self.advance();
    }

    if self.errors.is_empty() {
      Ok(AstNode::Program { statements })
    } else {
      Err(self.errors)
    }
  }

  // ----- Cursor helpers -----

  fn current(&self) -> &Token {
    &self.tokens[self.index.min(self.tokens.len() - 1)]
  }

  fn next(&self) -> &Token {
    let last = self.tokens.len() - 1;
    &self.tokens[(self.index + 1).min(last)]
  }

  fn advance(&mut self) {
    if self.index < self.tokens.len() - 1 {
      self.index += 1;
    }
  }

  fn advance_on_newline(&mut self) {
    if self.next().kind == TokenKind::Newline {
      self.advance();
    }
  }

  fn next_precedence(&self) -> Precedence {
    precedence_of(self.next().kind)
  }

  fn error(&mut self, token: &Token, message: impl Into<String>) {
    self
      .errors
      .push(CompileError::syntax(&self.filename, token, message));
  }

  fn error_at_current(&mut self, message: impl Into<String>) {
    let token = self.current().clone();
    self.error(&token, message);
  }

  /// Record a diagnostic unless the upcoming token has the expected kind,
  /// then advance either way so parsing can recover.
  fn expect(&mut self, kind: TokenKind) {
    if self.next().kind != kind {
      let token = self.next().clone();
      self.error(
        &token,
        format!(
          "expected {}, got \"{}\" instead",
          describe_kind(kind),
          describe_token(&token)
        ),
      );
    }
    self.advance();
  }

  // ----- Statements -----

  fn parse_statement(&mut self) -> AstNode {
    match self.current().kind {
      TokenKind::Const => self.parse_const_declaration(),
      TokenKind::At => self.parse_decorator(),
      TokenKind::If => self.parse_if(),
      TokenKind::While => self.parse_while(),
      TokenKind::For => self.parse_for(),
      TokenKind::From | TokenKind::Import => self.parse_import(),
      TokenKind::Def => self.parse_function_def(),
      TokenKind::Break => self.parse_leaf(|tok| AstNode::Break { tok }),
      TokenKind::Pass => self.parse_leaf(|tok| AstNode::Pass { tok }),
      TokenKind::Continue => self.parse_leaf(|tok| AstNode::Continue { tok }),
      TokenKind::Match => self.parse_match(),
      TokenKind::Return => self.parse_return(),
      TokenKind::Scope => self.parse_scope(),
      TokenKind::Cppcode => self.parse_cppcode(),
      TokenKind::Type => self.parse_typedef(),
      TokenKind::Class => self.parse_class(),
      TokenKind::Union => self.parse_union(),
      TokenKind::Enum => self.parse_enum(),
      TokenKind::With => self.parse_with(),
      TokenKind::Try => self.parse_try_except(),
      TokenKind::Raise => self.parse_raise(),
      TokenKind::Assert => self.parse_assert(),
      TokenKind::Static => self.parse_modifier(|tok, body| AstNode::Static { tok, body }),
      TokenKind::Inline => self.parse_modifier(|tok, body| AstNode::Inline { tok, body }),
      TokenKind::Export => self.parse_modifier(|tok, body| AstNode::Export { tok, body }),
      TokenKind::Identifier => match self.next().kind {
        TokenKind::Identifier | TokenKind::Assign => self.parse_variable_statement(),
        TokenKind::Comma => self.parse_multiple_assign(),
        TokenKind::PlusEq
        | TokenKind::MinusEq
        | TokenKind::StarEq
        | TokenKind::SlashEq
        | TokenKind::PercentEq => self.parse_aug_assign(),
        _ => self.parse_expression_statement(),
      },
      _ => self.parse_expression_statement(),
    }
  }

  fn parse_leaf(&mut self, build: fn(Token) -> AstNode) -> AstNode {
    let tok = self.current().clone();
    self.advance_on_newline();
    build(tok)
  }

  fn parse_expression_statement(&mut self) -> AstNode {
    let expr = self.parse_expression(Precedence::Lowest);

    // member assignment: `a.b = value` reuses the variable-statement shape,
    // the same rewrite the subscript form gets
    let stmt = if self.next().kind == TokenKind::Assign
      && matches!(
        expr,
        AstNode::DotExpression { .. } | AstNode::ArrowExpression { .. }
      ) {
      let tok = expr.token().cloned().unwrap_or_else(|| self.current().clone());
      self.advance();
      self.advance();
      let value = self.parse_expression(Precedence::Lowest);
      AstNode::VariableStatement {
        tok,
        var_type: Box::new(AstNode::no_literal()),
        name: Box::new(expr),
        value: Box::new(value),
      }
    } else {
      expr
    };

    self.advance_on_newline();
    stmt
  }

  /// A block is introduced by `Indent` and runs until the matching
  /// `Dedent`. Reaching EOF first is an error.
  fn parse_block(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();

    let mut statements = Vec::new();
    while self.current().kind != TokenKind::Dedent {
      if self.current().kind == TokenKind::Eof {
        self.error_at_current("expected the end of an indented block, got EOF instead");
        break;
      }
      statements.push(self.parse_statement());
      self.advance();
    }

    AstNode::Block { tok, statements }
  }

  fn parse_variable_statement(&mut self) -> AstNode {
    let tok = self.current().clone();
    let name = self.parse_name();

    let mut var_type = AstNode::no_literal();
    if matches!(
      self.next().kind,
      TokenKind::Identifier | TokenKind::Star | TokenKind::BitAnd
    ) {
      self.advance();
      var_type = self.parse_type();
    }

    let mut value = AstNode::no_literal();
    if self.next().kind == TokenKind::Assign {
      self.advance();
      self.advance();
      value = self.parse_expression(Precedence::Lowest);
    }
    self.advance_on_newline();

    AstNode::VariableStatement {
      tok,
      var_type: Box::new(var_type),
      name: Box::new(name),
      value: Box::new(value),
    }
  }

  fn parse_const_declaration(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Identifier);
    let name = self.parse_name();

    let mut const_type = AstNode::no_literal();
    if matches!(
      self.next().kind,
      TokenKind::Identifier | TokenKind::Star | TokenKind::BitAnd
    ) {
      self.advance();
      const_type = self.parse_type();
    }

    self.expect(TokenKind::Assign);
    self.advance();
    let value = self.parse_expression(Precedence::Lowest);
    self.advance_on_newline();

    AstNode::ConstDeclaration {
      tok,
      const_type: Box::new(const_type),
      name: Box::new(name),
      value: Box::new(value),
    }
  }

  fn parse_multiple_assign(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut names = vec![self.parse_name()];
    while self.next().kind == TokenKind::Comma {
      self.advance();
      self.advance();
      names.push(self.parse_name());
    }

    self.expect(TokenKind::Assign);
    let mut values = Vec::new();
    loop {
      self.advance();
      values.push(self.parse_expression(Precedence::Lowest));
      if self.next().kind == TokenKind::Comma {
        self.advance();
      } else {
        break;
      }
    }
    self.advance_on_newline();

    AstNode::MultipleAssign { tok, names, values }
  }

  fn parse_aug_assign(&mut self) -> AstNode {
    let name = self.parse_name();
    self.advance();
    let tok = self.current().clone();
    self.advance();
    let value = self.parse_expression(Precedence::Lowest);
    self.advance_on_newline();

    AstNode::AugAssign {
      tok,
      name: Box::new(name),
      value: Box::new(value),
    }
  }

  fn parse_if(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();

    let condition = self.parse_expression(Precedence::Lowest);
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    let mut elifs = Vec::new();
    while self.next().kind == TokenKind::Elif {
      self.advance();
      self.advance();
      let elif_condition = self.parse_expression(Precedence::Lowest);
      self.expect(TokenKind::Colon);
      self.expect(TokenKind::Indent);
      let elif_body = self.parse_block();
      elifs.push((elif_condition, elif_body));
    }

    let mut else_body = AstNode::no_literal();
    if self.next().kind == TokenKind::Else {
      self.advance();
      self.expect(TokenKind::Colon);
      self.expect(TokenKind::Indent);
      else_body = self.parse_block();
    }

    AstNode::If {
      tok,
      condition: Box::new(condition),
      body: Box::new(body),
      elifs,
      else_body: Box::new(else_body),
    }
  }

  fn parse_while(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();

    let condition = self.parse_expression(Precedence::Lowest);
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    AstNode::While {
      tok,
      condition: Box::new(condition),
      body: Box::new(body),
    }
  }

  fn parse_for(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();

    let mut variables = vec![self.parse_name()];
    while self.next().kind == TokenKind::Comma {
      self.advance();
      self.advance();
      variables.push(self.parse_name());
    }

    self.expect(TokenKind::In);
    self.advance();
    let sequence = self.parse_expression(Precedence::Lowest);
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    AstNode::For {
      tok,
      variables,
      sequence: Box::new(sequence),
      body: Box::new(body),
    }
  }

  fn parse_scope(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    AstNode::Scope {
      tok,
      body: Box::new(body),
    }
  }

  fn parse_return(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut value = AstNode::no_literal();

    if self.next().kind != TokenKind::Newline && self.next().kind != TokenKind::Eof {
      self.advance();
      value = self.parse_expression(Precedence::Lowest);
      // `return a, b` forms a tuple
      if self.next().kind == TokenKind::Comma {
        let mut elements = vec![value];
        while self.next().kind == TokenKind::Comma {
          self.advance();
          self.advance();
          elements.push(self.parse_expression(Precedence::Lowest));
        }
        value = AstNode::ListLiteral {
          tok: tok.clone(),
          elements,
        };
      }
    }
    self.advance_on_newline();

    AstNode::Return {
      tok,
      value: Box::new(value),
    }
  }

  fn parse_raise(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut value = AstNode::no_literal();
    if self.next().kind != TokenKind::Newline && self.next().kind != TokenKind::Eof {
      self.advance();
      value = self.parse_expression(Precedence::Lowest);
    }
    self.advance_on_newline();

    AstNode::Raise {
      tok,
      value: Box::new(value),
    }
  }

  fn parse_assert(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    let condition = self.parse_expression(Precedence::Lowest);
    self.advance_on_newline();

    AstNode::Assert {
      tok,
      condition: Box::new(condition),
    }
  }

  fn parse_cppcode(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    let code = if self.current().kind == TokenKind::String {
      self.current().lexeme.clone()
    } else {
      self.error_at_current("expected a string of target code after 'cppcode'");
      String::new()
    };
    self.advance_on_newline();

    AstNode::CppCode { tok, code }
  }

  fn parse_modifier(&mut self, build: fn(Token, Box<AstNode>) -> AstNode) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    let body = self.parse_statement();
    build(tok, Box::new(body))
  }

  fn parse_import(&mut self) -> AstNode {
    let tok = self.current().clone();
    let has_from = tok.kind == TokenKind::From;
    self.advance();

    let module_name = self.parse_module_name();
    let mut module_alias = AstNode::no_literal();
    let mut symbols = Vec::new();

    if !has_from {
      if self.next().kind == TokenKind::As {
        self.advance();
        self.advance();
        module_alias = self.parse_name();
      }
      self.advance_on_newline();
      return AstNode::Import {
        tok,
        module: (Box::new(module_name), Box::new(module_alias)),
        symbols,
      };
    }

    self.expect(TokenKind::Import);
    loop {
      self.advance();
      let symbol = self.parse_name();
      let mut alias = AstNode::no_literal();
      if self.next().kind == TokenKind::As {
        self.advance();
        self.advance();
        alias = self.parse_name();
      }
      symbols.push((symbol, alias));
      if self.next().kind == TokenKind::Comma {
        self.advance();
      } else {
        break;
      }
    }
    self.advance_on_newline();

    AstNode::Import {
      tok,
      module: (Box::new(module_name), Box::new(module_alias)),
      symbols,
    }
  }

  /// A module path: `name` or `pkg.sub.name`.
  fn parse_module_name(&mut self) -> AstNode {
    let mut name = self.parse_name();
    while self.next().kind == TokenKind::Dot {
      self.advance();
      let tok = self.current().clone();
      self.advance();
      let part = self.parse_name();
      name = AstNode::DotExpression {
        tok,
        owner: Box::new(name),
        referenced: Box::new(part),
      };
    }
    name
  }

  fn parse_function_def(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Identifier);
    let name = self.parse_name();

    self.expect(TokenKind::LParen);
    let mut parameters = Vec::new();
    if self.next().kind != TokenKind::RParen {
      loop {
        self.advance();
        if self.current().kind != TokenKind::Identifier {
          self.error_at_current(format!(
            "expected a parameter name, got \"{}\" instead",
            describe_token(self.current())
          ));
        }
        let p_name = self.parse_name();

        let mut p_type = AstNode::no_literal();
        if matches!(
          self.next().kind,
          TokenKind::Identifier | TokenKind::Star | TokenKind::BitAnd
        ) {
          self.advance();
          p_type = self.parse_type();
        }

        let mut default = AstNode::no_literal();
        if self.next().kind == TokenKind::Assign {
          self.advance();
          self.advance();
          default = self.parse_expression(Precedence::Lowest);
        }

        parameters.push(Parameter {
          p_type,
          name: p_name,
          default,
        });

        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
    } else {
      self.advance();
    }

    if self.current().kind != TokenKind::RParen {
      self.error_at_current(format!(
        "expected ')', got \"{}\" instead",
        describe_token(self.current())
      ));
    }

    // functions return void unless the definition says otherwise
    let mut return_type = AstNode::TypeExpr {
      tok: self.current().clone(),
      name: "void".to_string(),
      generics: Vec::new(),
    };
    if self.next().kind == TokenKind::Arrow {
      self.advance();
      if self.next().kind == TokenKind::LParen {
        self.advance();
        return_type = self.parse_tuple_type();
      } else {
        self.expect(TokenKind::Identifier);
        return_type = self.parse_type();
      }
    } else if self.next().kind == TokenKind::Identifier {
      self.advance();
      return_type = self.parse_type();
    }

    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    AstNode::FunctionDef {
      tok,
      return_type: Box::new(return_type),
      name: Box::new(name),
      parameters,
      body: Box::new(body),
    }
  }

  fn parse_decorator(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut items = Vec::new();

    while self.current().kind == TokenKind::At {
      self.advance();
      items.push(self.parse_expression(Precedence::Lowest));
      self.advance_on_newline();
      self.advance();
    }

    let body = match self.current().kind {
      TokenKind::Def => self.parse_function_def(),
      TokenKind::Static => self.parse_modifier(|tok, body| AstNode::Static { tok, body }),
      _ => {
        self.error_at_current("decorators must be followed by a function definition");
        AstNode::no_literal()
      }
    };

    AstNode::Decorator {
      tok,
      items,
      body: Box::new(body),
    }
  }

  fn parse_typedef(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    let name = self.parse_name();

    self.expect(TokenKind::Assign);
    self.advance();
    let base_type = match self.current().kind {
      TokenKind::Identifier | TokenKind::Star | TokenKind::BitAnd => self.parse_type(),
      TokenKind::Def => self.parse_lambda_type(),
      _ => {
        self.error_at_current("expected a type");
        AstNode::no_literal()
      }
    };
    self.advance_on_newline();

    AstNode::TypeDefinition {
      tok,
      name: Box::new(name),
      base_type: Box::new(base_type),
    }
  }

  /// Function type used in aliases: `def (int, str) -> bool`.
  fn parse_lambda_type(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::LParen);

    let mut arg_types = Vec::new();
    if self.next().kind != TokenKind::RParen {
      loop {
        self.advance();
        arg_types.push(self.parse_type());
        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
    } else {
      self.advance();
    }
    if self.current().kind != TokenKind::RParen {
      self.error_at_current(format!(
        "expected ')', got \"{}\" instead",
        describe_token(self.current())
      ));
    }

    let mut return_types = Vec::new();
    if self.next().kind == TokenKind::Arrow {
      self.advance();
      if self.next().kind == TokenKind::LParen {
        self.advance();
        if let AstNode::ListLiteral { elements, .. } = self.parse_tuple_type() {
          return_types = elements;
        }
      } else {
        self.expect(TokenKind::Identifier);
        return_types.push(self.parse_type());
      }
    }

    AstNode::LambdaType {
      tok,
      arg_types,
      return_types,
    }
  }

  /// `(T1, T2, …)` — a parenthesized type list, used for tuple returns.
  fn parse_tuple_type(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut elements = Vec::new();

    if self.next().kind != TokenKind::RParen {
      loop {
        self.advance();
        elements.push(self.parse_type());
        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
    } else {
      self.advance();
    }
    if self.current().kind != TokenKind::RParen {
      self.error_at_current(format!(
        "expected ')', got \"{}\" instead",
        describe_token(self.current())
      ));
    }

    AstNode::ListLiteral { tok, elements }
  }

  fn parse_class(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Identifier);
    let name = self.parse_name();

    let mut parents = Vec::new();
    if self.next().kind == TokenKind::LParen {
      self.advance();
      if self.next().kind != TokenKind::RParen {
        loop {
          self.advance();
          parents.push(self.parse_type());
          self.advance();
          if self.current().kind != TokenKind::Comma {
            break;
          }
        }
      } else {
        self.advance();
      }
      if self.current().kind != TokenKind::RParen {
        self.error_at_current(format!(
          "expected ')', got \"{}\" instead",
          describe_token(self.current())
        ));
      }
    }

    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);

    // class bodies are ordinary statements routed into the three buckets
    // the lowering emits separately
    self.advance();
    let mut attributes = Vec::new();
    let mut methods = Vec::new();
    let mut other = Vec::new();
    while self.current().kind != TokenKind::Dedent {
      if self.current().kind == TokenKind::Eof {
        self.error_at_current("expected the end of an indented block, got EOF instead");
        break;
      }
      let stmt = self.parse_statement();
      match &stmt {
        AstNode::VariableStatement { .. } | AstNode::ConstDeclaration { .. } => {
          attributes.push(stmt)
        }
        AstNode::FunctionDef { .. }
        | AstNode::Decorator { .. }
        | AstNode::Static { .. }
        | AstNode::Inline { .. } => methods.push(stmt),
        _ => other.push(stmt),
      }
      self.advance();
    }

    AstNode::ClassDef {
      tok,
      name: Box::new(name),
      parents,
      attributes,
      methods,
      other,
    }
  }

  fn parse_union(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Identifier);
    let name = self.parse_name();
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);

    self.advance();
    let mut fields = Vec::new();
    while self.current().kind != TokenKind::Dedent {
      if self.current().kind == TokenKind::Eof {
        self.error_at_current("expected the end of an indented block, got EOF instead");
        break;
      }
      let field_name = self.parse_name();
      self.advance();
      let field_type = self.parse_type();
      fields.push((field_type, field_name));
      self.advance_on_newline();
      self.advance();
    }

    AstNode::UnionDef {
      tok,
      name: Box::new(name),
      fields,
    }
  }

  fn parse_enum(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Identifier);
    let name = self.parse_name();
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);

    self.advance();
    let mut fields = Vec::new();
    while self.current().kind != TokenKind::Dedent {
      if self.current().kind == TokenKind::Eof {
        self.error_at_current("expected the end of an indented block, got EOF instead");
        break;
      }
      let field_name = self.parse_name();
      let mut value = AstNode::no_literal();
      if self.next().kind == TokenKind::Assign {
        self.advance();
        self.advance();
        value = self.parse_expression(Precedence::Lowest);
      }
      fields.push((field_name, value));
      self.advance_on_newline();
      self.advance();
    }

    AstNode::EnumDef {
      tok,
      name: Box::new(name),
      fields,
    }
  }

  fn parse_with(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut bindings = Vec::new();

    loop {
      self.advance();
      let value = self.parse_expression(Precedence::Lowest);
      let mut variable = AstNode::no_literal();
      if self.next().kind == TokenKind::As {
        self.advance();
        self.advance();
        variable = self.parse_name();
      }
      bindings.push((variable, value));
      self.advance();
      if self.current().kind != TokenKind::Comma {
        break;
      }
    }

    if self.current().kind != TokenKind::Colon {
      self.error_at_current(format!(
        "expected ':', got \"{}\" instead",
        describe_token(self.current())
      ));
    }
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    AstNode::With {
      tok,
      bindings,
      body: Box::new(body),
    }
  }

  fn parse_try_except(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Colon);
    self.expect(TokenKind::Indent);
    let body = self.parse_block();

    let mut clauses = Vec::new();
    while self.next().kind == TokenKind::Except {
      self.advance();
      let mut types = Vec::new();
      let mut bind = AstNode::no_literal();
      loop {
        self.advance();
        if self.current().kind == TokenKind::Colon {
          break;
        }
        types.push(self.parse_expression(Precedence::Lowest));
        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
      if self.current().kind == TokenKind::As {
        self.advance();
        bind = self.parse_name();
        self.advance();
      }
      if self.current().kind != TokenKind::Colon {
        self.error_at_current(format!(
          "expected ':', got \"{}\" instead",
          describe_token(self.current())
        ));
      }
      self.expect(TokenKind::Indent);
      let clause_body = self.parse_block();
      clauses.push(ExceptClause {
        types,
        bind,
        body: clause_body,
      });
    }

    let mut else_body = AstNode::no_literal();
    if self.next().kind == TokenKind::Else {
      self.advance();
      self.expect(TokenKind::Colon);
      self.expect(TokenKind::Indent);
      else_body = self.parse_block();
    }

    AstNode::TryExcept {
      tok,
      body: Box::new(body),
      clauses,
      else_body: Box::new(else_body),
    }
  }

  fn parse_match(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();

    let mut subjects = Vec::new();
    while self.current().kind != TokenKind::Colon {
      if self.current().kind == TokenKind::Eof {
        self.error_at_current("expected ':' after the match subjects, got EOF instead");
        break;
      }
      subjects.push(self.parse_expression(Precedence::Lowest));
      self.advance();
      if self.current().kind != TokenKind::Colon {
        self.advance();
      }
    }
    self.expect(TokenKind::Indent);

    let mut cases = Vec::new();
    while self.next().kind == TokenKind::Case {
      self.advance();
      self.advance();
      let mut patterns = Vec::new();
      while self.current().kind != TokenKind::Colon {
        if self.current().kind == TokenKind::Eof {
          self.error_at_current("expected ':' after the case patterns, got EOF instead");
          break;
        }
        if self.current().kind == TokenKind::Underscore {
          patterns.push(AstNode::no_literal());
        } else {
          patterns.push(self.parse_expression(Precedence::Lowest));
        }
        self.advance();
        if self.current().kind != TokenKind::Colon {
          self.advance();
        }
      }
      self.expect(TokenKind::Indent);
      let body = self.parse_block();
      cases.push((patterns, body));
    }

    let mut default_body = AstNode::no_literal();
    if self.next().kind == TokenKind::Default {
      self.advance();
      self.expect(TokenKind::Colon);
      self.expect(TokenKind::Indent);
      default_body = self.parse_block();
    }
    self.expect(TokenKind::Dedent);

    AstNode::Match {
      tok,
      subjects,
      cases,
      default_body: Box::new(default_body),
    }
  }

  // ----- Expressions -----

  fn parse_expression(&mut self, precedence: Precedence) -> AstNode {
    let mut left = match self.current().kind {
      TokenKind::Integer => AstNode::Integer {
        tok: self.current().clone(),
        value: self.current().lexeme.clone(),
      },
      TokenKind::Decimal => AstNode::Decimal {
        tok: self.current().clone(),
        value: self.current().lexeme.clone(),
      },
      TokenKind::None => AstNode::NoneLiteral {
        tok: self.current().clone(),
      },
      TokenKind::Format => {
        self.advance();
        self.parse_string(true, false)
      }
      TokenKind::Raw => {
        self.advance();
        self.parse_string(false, true)
      }
      TokenKind::String => self.parse_string(false, false),
      TokenKind::True | TokenKind::False => AstNode::BoolLiteral {
        tok: self.current().clone(),
        value: self.current().kind == TokenKind::True,
      },
      TokenKind::Identifier => AstNode::Identifier {
        tok: self.current().clone(),
        name: self.current().lexeme.clone(),
      },
      TokenKind::Cast => self.parse_cast(),
      TokenKind::LParen => self.parse_grouped(),
      TokenKind::ListOpen => self.parse_list(),
      TokenKind::DictOpen => self.parse_dict(),
      TokenKind::Minus | TokenKind::Not | TokenKind::BitNot => self.parse_prefix(),
      _ => {
        let token = self.current().clone();
        self.error(
          &token,
          format!("\"{}\" is not an expression", describe_token(&token)),
        );
        AstNode::no_literal()
      }
    };

    while self.next_precedence() > precedence {
      self.advance();
      left = match self.current().kind {
        TokenKind::LParen => self.parse_function_call(left),
        TokenKind::ListOpen => self.parse_subscript(left),
        TokenKind::Dot => self.parse_member(left, false),
        TokenKind::Arrow => self.parse_member(left, true),
        TokenKind::Increment | TokenKind::Decrement => AstNode::PostfixOp {
          tok: self.current().clone(),
          left: Box::new(left),
        },
        _ => self.parse_binary_operation(left),
      };
    }

    if precedence == Precedence::Lowest && self.next().kind == TokenKind::If {
      self.advance();
      left = self.parse_ternary(left);
    }

    left
  }

  fn parse_string(&mut self, formatted: bool, raw: bool) -> AstNode {
    AstNode::StringLiteral {
      tok: self.current().clone(),
      value: self.current().lexeme.clone(),
      formatted,
      raw,
    }
  }

  fn parse_prefix(&mut self) -> AstNode {
    let tok = self.current().clone();
    let precedence = if tok.kind == TokenKind::Not {
      Precedence::Not
    } else {
      Precedence::Prefix
    };
    self.advance();
    let right = self.parse_expression(precedence);

    AstNode::PrefixOp {
      tok,
      right: Box::new(right),
    }
  }

  fn parse_binary_operation(&mut self, left: AstNode) -> AstNode {
    let tok = self.current().clone();
    let precedence = precedence_of(tok.kind);
    self.advance();
    let right = self.parse_expression(precedence);

    AstNode::BinaryOp {
      tok,
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  fn parse_grouped(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    let mut expr = self.parse_expression(Precedence::Lowest);

    // `(a, b)` groups into a tuple
    if self.next().kind == TokenKind::Comma {
      let mut elements = vec![expr];
      while self.next().kind == TokenKind::Comma {
        self.advance();
        self.advance();
        elements.push(self.parse_expression(Precedence::Lowest));
      }
      expr = AstNode::ListLiteral { tok, elements };
    }

    self.expect(TokenKind::RParen);
    expr
  }

  fn parse_list(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut elements = Vec::new();

    if self.next().kind != TokenKind::ListClose {
      loop {
        self.advance();
        elements.push(self.parse_expression(Precedence::Lowest));
        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
    } else {
      self.advance();
    }
    if self.current().kind != TokenKind::ListClose {
      self.error_at_current(format!(
        "expected ']', got \"{}\" instead",
        describe_token(self.current())
      ));
    }

    AstNode::ListLiteral { tok, elements }
  }

  fn parse_dict(&mut self) -> AstNode {
    let tok = self.current().clone();
    let mut entries = Vec::new();

    if self.next().kind != TokenKind::DictClose {
      loop {
        self.advance();
        let key = self.parse_expression(Precedence::Lowest);
        self.expect(TokenKind::Colon);
        self.advance();
        let value = self.parse_expression(Precedence::Lowest);
        entries.push((key, value));
        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
    } else {
      self.advance();
    }
    if self.current().kind != TokenKind::DictClose {
      self.error_at_current(format!(
        "expected '}}', got \"{}\" instead",
        describe_token(self.current())
      ));
    }

    AstNode::DictLiteral { tok, entries }
  }

  fn parse_function_call(&mut self, callee: AstNode) -> AstNode {
    let tok = self.current().clone();
    let mut arguments = Vec::new();

    if self.next().kind != TokenKind::RParen {
      loop {
        self.advance();
        arguments.push(self.parse_call_argument());
        self.advance();
        if self.current().kind != TokenKind::Comma {
          break;
        }
      }
    } else {
      self.advance();
    }
    if self.current().kind != TokenKind::RParen {
      self.error_at_current(format!(
        "expected ')', got \"{}\" instead",
        describe_token(self.current())
      ));
    }

    AstNode::FunctionCall {
      tok,
      callee: Box::new(callee),
      arguments,
    }
  }

  /// A call argument is an expression, or `name = expr` for a keyword
  /// argument.
  fn parse_call_argument(&mut self) -> AstNode {
    if self.current().kind == TokenKind::Identifier && self.next().kind == TokenKind::Assign {
      let tok = self.current().clone();
      let name = self.parse_name();
      self.advance();
      self.advance();
      let value = self.parse_expression(Precedence::Lowest);
      return AstNode::DefaultArg {
        tok,
        name: Box::new(name),
        value: Box::new(value),
      };
    }
    self.parse_expression(Precedence::Lowest)
  }

  fn parse_subscript(&mut self, container: AstNode) -> AstNode {
    let tok = self.current().clone();
    self.advance();

    let mut keys = vec![self.parse_expression(Precedence::Lowest)];
    if self.next().kind == TokenKind::Colon {
      self.advance();
      self.advance();
      keys.push(self.parse_expression(Precedence::Lowest));
    }
    self.expect(TokenKind::ListClose);

    let node = AstNode::ListOrDictAccess {
      tok: tok.clone(),
      container: Box::new(container),
      keys,
    };

    if self.next().kind != TokenKind::Assign {
      return node;
    }

    // `a[k] = v` re-reads the subscript as an in-place assignment
    self.advance();
    self.advance();
    let value = self.parse_expression(Precedence::Lowest);

    AstNode::VariableStatement {
      tok,
      var_type: Box::new(AstNode::no_literal()),
      name: Box::new(node),
      value: Box::new(value),
    }
  }

  fn parse_member(&mut self, owner: AstNode, arrow: bool) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    // parse above subscript strength so `a.b[0]` subscripts the whole
    // member expression rather than burying the index in the RHS
    let referenced = self.parse_expression(Precedence::ListAccess);

    let valid = match &referenced {
      AstNode::Identifier { .. } => true,
      AstNode::FunctionCall { callee, .. } => {
        matches!(callee.as_ref(), AstNode::Identifier { .. })
      }
      _ => false,
    };
    if !valid {
      self.error(
        &tok,
        "the right-hand side of a member access must be a name or a method call",
      );
    }

    if arrow {
      AstNode::ArrowExpression {
        tok,
        owner: Box::new(owner),
        referenced: Box::new(referenced),
      }
    } else {
      AstNode::DotExpression {
        tok,
        owner: Box::new(owner),
        referenced: Box::new(referenced),
      }
    }
  }

  fn parse_ternary(&mut self, if_value: AstNode) -> AstNode {
    let tok = self.current().clone();
    self.advance();
    let condition = self.parse_expression(Precedence::Lowest);
    self.expect(TokenKind::Else);
    self.advance();
    let else_value = self.parse_expression(Precedence::Lowest);

    AstNode::TernaryIf {
      tok,
      condition: Box::new(condition),
      if_value: Box::new(if_value),
      else_value: Box::new(else_value),
    }
  }

  fn parse_cast(&mut self) -> AstNode {
    let tok = self.current().clone();
    self.expect(TokenKind::Less);
    self.advance();
    let target_type = self.parse_type();
    self.expect(TokenKind::Greater);
    self.expect(TokenKind::LParen);
    self.advance();
    let value = self.parse_expression(Precedence::Lowest);
    self.expect(TokenKind::RParen);

    AstNode::Cast {
      tok,
      target_type: Box::new(target_type),
      value: Box::new(value),
    }
  }

  fn parse_name(&mut self) -> AstNode {
    if self.current().kind != TokenKind::Identifier {
      self.error_at_current(format!(
        "expected an identifier, got \"{}\" instead",
        describe_token(self.current())
      ));
    }
    AstNode::Identifier {
      tok: self.current().clone(),
      name: self.current().lexeme.clone(),
    }
  }

  /// A type: `name`, `name[T…]`, `*T` or `&T`.
  fn parse_type(&mut self) -> AstNode {
    let tok = self.current().clone();
    match tok.kind {
      TokenKind::Star => {
        self.advance();
        AstNode::PointerType {
          tok,
          base: Box::new(self.parse_type()),
        }
      }
      TokenKind::BitAnd => {
        self.advance();
        AstNode::RefType {
          tok,
          base: Box::new(self.parse_type()),
        }
      }
      TokenKind::Identifier => {
        let name = tok.lexeme.clone();
        let mut generics = Vec::new();
        if self.next().kind == TokenKind::ListOpen {
          self.advance();
          loop {
            self.advance();
            generics.push(self.parse_type());
            self.advance();
            if self.current().kind != TokenKind::Comma {
              break;
            }
          }
          if self.current().kind != TokenKind::ListClose {
            self.error_at_current(format!(
              "expected ']', got \"{}\" instead",
              describe_token(self.current())
            ));
          }
        }
        AstNode::TypeExpr {
          tok,
          name,
          generics,
        }
      }
      _ => {
        self.error(
          &tok,
          format!("expected a type, got \"{}\" instead", describe_token(&tok)),
        );
        AstNode::no_literal()
      }
    }
  }
}
