//! Lexical analysis: turns Peregrine source into a flat vector of tokens.
//!
//! The language is indentation-sensitive, so the lexer owns the layout
//! bookkeeping the parser relies on: an indent-width stack produces
//! `Indent`/`Dedent` tokens, and a block opener swallows its line break so
//! the parser sees `:` followed directly by `Indent`. Inside brackets lines
//! join implicitly and no layout tokens are produced.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  // Keywords
  Def,
  Pass,
  Break,
  Continue,
  Return,
  If,
  Elif,
  Else,
  While,
  For,
  In,
  NotIn,
  Is,
  IsNot,
  Match,
  Case,
  Default,
  Scope,
  Const,
  Import,
  From,
  As,
  Type,
  Class,
  Union,
  Enum,
  With,
  Try,
  Except,
  Raise,
  Assert,
  Static,
  Inline,
  Export,
  Cppcode,
  Cast,
  And,
  Or,
  Not,
  True,
  False,
  None,
  Underscore,
  // Punctuation
  LParen,
  RParen,
  ListOpen,
  ListClose,
  DictOpen,
  DictClose,
  Colon,
  Comma,
  Dot,
  Arrow,
  Assign,
  At,
  // Operators
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  FloorDiv,
  Power,
  ShiftLeft,
  ShiftRight,
  BitAnd,
  BitOr,
  BitXor,
  BitNot,
  Less,
  Greater,
  LessEq,
  GreaterEq,
  EqEq,
  NotEq,
  PlusEq,
  MinusEq,
  StarEq,
  SlashEq,
  PercentEq,
  Increment,
  Decrement,
  // Literals
  Integer,
  Decimal,
  String,
  Format,
  Raw,
  Identifier,
  // Layout
  Newline,
  Indent,
  Dedent,
  Eof,
}

/// A lexical unit together with everything diagnostics need to render it.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub lexeme: String,
  pub line: usize,
  pub column: usize,
  pub statement: String,
}

impl Token {
  pub fn new(
    kind: TokenKind,
    lexeme: impl Into<String>,
    line: usize,
    column: usize,
    statement: impl Into<String>,
  ) -> Self {
    Self {
      kind,
      lexeme: lexeme.into(),
      line,
      column,
      statement: statement.into(),
    }
  }
}

/// Human-friendly token description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    TokenKind::Newline => "end of line".to_string(),
    TokenKind::Indent => "start of an indented block".to_string(),
    TokenKind::Dedent => "end of an indented block".to_string(),
    _ => token.lexeme.clone(),
  }
}

fn keyword_kind(ident: &str) -> Option<TokenKind> {
  let kind = match ident {
    "def" => TokenKind::Def,
    "pass" => TokenKind::Pass,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "elif" => TokenKind::Elif,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "in" => TokenKind::In,
    "is" => TokenKind::Is,
    "match" => TokenKind::Match,
    "case" => TokenKind::Case,
    "default" => TokenKind::Default,
    "scope" => TokenKind::Scope,
    "const" => TokenKind::Const,
    "import" => TokenKind::Import,
    "from" => TokenKind::From,
    "as" => TokenKind::As,
    "type" => TokenKind::Type,
    "class" => TokenKind::Class,
    "union" => TokenKind::Union,
    "enum" => TokenKind::Enum,
    "with" => TokenKind::With,
    "try" => TokenKind::Try,
    "except" => TokenKind::Except,
    "raise" => TokenKind::Raise,
    "assert" => TokenKind::Assert,
    "static" => TokenKind::Static,
    "inline" => TokenKind::Inline,
    "export" => TokenKind::Export,
    "cppcode" => TokenKind::Cppcode,
    "cast" => TokenKind::Cast,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "True" => TokenKind::True,
    "False" => TokenKind::False,
    "None" => TokenKind::None,
    "_" => TokenKind::Underscore,
    _ => return None,
  };
  Some(kind)
}

const TWO_CHAR_OPS: [(&str, TokenKind); 16] = [
  ("**", TokenKind::Power),
  ("//", TokenKind::FloorDiv),
  ("->", TokenKind::Arrow),
  ("<<", TokenKind::ShiftLeft),
  (">>", TokenKind::ShiftRight),
  ("<=", TokenKind::LessEq),
  (">=", TokenKind::GreaterEq),
  ("==", TokenKind::EqEq),
  ("!=", TokenKind::NotEq),
  ("+=", TokenKind::PlusEq),
  ("-=", TokenKind::MinusEq),
  ("*=", TokenKind::StarEq),
  ("/=", TokenKind::SlashEq),
  ("%=", TokenKind::PercentEq),
  ("++", TokenKind::Increment),
  ("--", TokenKind::Decrement),
];

fn single_char_op(c: char) -> Option<TokenKind> {
  let kind = match c {
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '%' => TokenKind::Percent,
    '<' => TokenKind::Less,
    '>' => TokenKind::Greater,
    '=' => TokenKind::Assign,
    '(' => TokenKind::LParen,
    ')' => TokenKind::RParen,
    '[' => TokenKind::ListOpen,
    ']' => TokenKind::ListClose,
    '{' => TokenKind::DictOpen,
    '}' => TokenKind::DictClose,
    ':' => TokenKind::Colon,
    ',' => TokenKind::Comma,
    '.' => TokenKind::Dot,
    '@' => TokenKind::At,
    '&' => TokenKind::BitAnd,
    '|' => TokenKind::BitOr,
    '^' => TokenKind::BitXor,
    '~' => TokenKind::BitNot,
    _ => return None,
  };
  Some(kind)
}

struct Lexer<'a> {
  filename: &'a str,
  tokens: Vec<Token>,
  indents: Vec<usize>,
  bracket_depth: usize,
  // position of the most recent line break, for Newline tokens
  prev_line: usize,
  prev_column: usize,
  prev_statement: String,
}

/// Lex the whole source into a token vector terminated by an `Eof` marker.
pub fn tokenize(source: &str, filename: &str) -> CompileResult<Vec<Token>> {
  let mut lexer = Lexer {
    filename,
    tokens: Vec::new(),
    indents: vec![0],
    bracket_depth: 0,
    prev_line: 1,
    prev_column: 1,
    prev_statement: String::new(),
  };

  for (index, line) in source.lines().enumerate() {
    lexer.lex_line(index + 1, line)?;
  }
  lexer.finish();

  Ok(merge_compound_keywords(lexer.tokens))
}

impl<'a> Lexer<'a> {
  fn lex_line(&mut self, line_no: usize, line: &str) -> CompileResult<()> {
    let chars: Vec<char> = line.chars().collect();

    let mut indent = 0;
    while indent < chars.len() && chars[indent] == ' ' {
      indent += 1;
    }
    if indent < chars.len() && chars[indent] == '\t' {
      return Err(CompileError::lex(
        self.filename,
        line_no,
        indent + 1,
        line,
        "tab characters are not allowed in indentation",
      ));
    }
    let blank = indent >= chars.len() || chars[indent] == '#';

    if self.bracket_depth == 0 && !blank {
      self.handle_layout(line_no, line, indent)?;
    }
    if blank {
      return Ok(());
    }

    let mut i = indent;
    while i < chars.len() {
      let c = chars[i];

      if c == ' ' || c == '\t' {
        i += 1;
        continue;
      }
      if c == '#' {
        break;
      }

      if c.is_ascii_digit() {
        i = self.read_number(line_no, line, &chars, i)?;
        continue;
      }

      // f"…" and r"…" markers precede the string token itself
      if (c == 'f' || c == 'r')
        && i + 1 < chars.len()
        && (chars[i + 1] == '"' || chars[i + 1] == '\'')
      {
        let kind = if c == 'f' {
          TokenKind::Format
        } else {
          TokenKind::Raw
        };
        self.push(kind, c.to_string(), line_no, i + 1, line);
        i += 1;
        continue;
      }

      if c.is_ascii_alphabetic() || c == '_' {
        i = self.read_identifier(line_no, line, &chars, i);
        continue;
      }

      if c == '"' || c == '\'' {
        i = self.read_string(line_no, line, &chars, i)?;
        continue;
      }

      if i + 1 < chars.len() {
        let pair: String = [c, chars[i + 1]].iter().collect();
        if let Some(&(op, kind)) = TWO_CHAR_OPS.iter().find(|&&(op, _)| op == pair.as_str()) {
          self.push(kind, op, line_no, i + 1, line);
          i += 2;
          continue;
        }
      }

      if let Some(kind) = single_char_op(c) {
        match kind {
          TokenKind::LParen | TokenKind::ListOpen | TokenKind::DictOpen => {
            self.bracket_depth += 1;
          }
          TokenKind::RParen | TokenKind::ListClose | TokenKind::DictClose => {
            self.bracket_depth = self.bracket_depth.saturating_sub(1);
          }
          _ => {}
        }
        self.push(kind, c.to_string(), line_no, i + 1, line);
        i += 1;
        continue;
      }

      return Err(CompileError::lex(
        self.filename,
        line_no,
        i + 1,
        line,
        format!("invalid character '{c}'"),
      ));
    }

    self.prev_line = line_no;
    self.prev_column = chars.len() + 1;
    self.prev_statement = line.to_string();
    Ok(())
  }

  /// Compare the new line's indentation against the stack and emit layout
  /// tokens. An increase replaces the pending line break with `Indent`; a
  /// decrease emits the line break followed by one `Dedent` per closed
  /// level; an unchanged width emits just the line break.
  fn handle_layout(&mut self, line_no: usize, line: &str, indent: usize) -> CompileResult<()> {
    let first = self.tokens.is_empty();
    let top = *self.indents.last().unwrap_or(&0);

    if indent > top {
      self.indents.push(indent);
      if !first {
        self.push(TokenKind::Indent, "", line_no, 1, line);
      }
      return Ok(());
    }

    if !first {
      self.push_newline();
    }
    while indent < *self.indents.last().unwrap_or(&0) {
      self.indents.pop();
      self.push(TokenKind::Dedent, "", line_no, 1, line);
    }
    if indent != *self.indents.last().unwrap_or(&0) {
      return Err(CompileError::lex(
        self.filename,
        line_no,
        indent + 1,
        line,
        "unindent does not match any outer indentation level",
      ));
    }
    Ok(())
  }

  fn finish(&mut self) {
    if !self.tokens.is_empty() {
      self.push_newline();
    }
    while self.indents.len() > 1 {
      self.indents.pop();
      let (line, statement) = (self.prev_line, self.prev_statement.clone());
      self.push(TokenKind::Dedent, "", line, 1, statement);
    }
    let (line, column, statement) = (self.prev_line, self.prev_column, self.prev_statement.clone());
    self.push(TokenKind::Eof, "", line, column, statement);
  }

  fn read_number(
    &mut self,
    line_no: usize,
    line: &str,
    chars: &[char],
    start: usize,
  ) -> CompileResult<usize> {
    let mut i = start;
    let mut text = String::new();
    let mut is_decimal = false;

    if chars[i] == '0' && i + 1 < chars.len() && matches!(chars[i + 1], 'x' | 'X' | 'b' | 'B') {
      text.push(chars[i]);
      text.push(chars[i + 1]);
      i += 2;
      while i < chars.len() && chars[i].is_ascii_alphanumeric() {
        text.push(chars[i]);
        i += 1;
      }
    } else {
      while i < chars.len() && chars[i].is_ascii_digit() {
        text.push(chars[i]);
        i += 1;
      }
      // a dot is part of the number only when a digit follows; `1.x` is a
      // member access on an integer
      if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        is_decimal = true;
        text.push('.');
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
          text.push(chars[i]);
          i += 1;
        }
      }
    }

    if i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
      return Err(CompileError::lex(
        self.filename,
        line_no,
        i + 1,
        line,
        format!("invalid character '{}' in a number literal", chars[i]),
      ));
    }

    let kind = if is_decimal {
      TokenKind::Decimal
    } else {
      TokenKind::Integer
    };
    self.push(kind, text, line_no, start + 1, line);
    Ok(i)
  }

  fn read_identifier(&mut self, line_no: usize, line: &str, chars: &[char], start: usize) -> usize {
    let mut i = start;
    let mut ident = String::new();
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
      ident.push(chars[i]);
      i += 1;
    }
    let kind = keyword_kind(&ident).unwrap_or(TokenKind::Identifier);
    self.push(kind, ident, line_no, start + 1, line);
    i
  }

  /// Read a quoted literal. Escape sequences are carried through verbatim;
  /// the code generator re-quotes the text unchanged.
  fn read_string(
    &mut self,
    line_no: usize,
    line: &str,
    chars: &[char],
    start: usize,
  ) -> CompileResult<usize> {
    let quote = chars[start];
    let mut i = start + 1;
    let mut text = String::new();

    while i < chars.len() {
      if chars[i] == quote {
        self.push(TokenKind::String, text, line_no, start + 1, line);
        return Ok(i + 1);
      }
      if chars[i] == '\\' && i + 1 < chars.len() {
        text.push('\\');
        text.push(chars[i + 1]);
        i += 2;
        continue;
      }
      text.push(chars[i]);
      i += 1;
    }

    Err(CompileError::lex(
      self.filename,
      line_no,
      start + 1,
      line,
      "unterminated string literal",
    ))
  }

  fn push(
    &mut self,
    kind: TokenKind,
    lexeme: impl Into<String>,
    line: usize,
    column: usize,
    statement: impl Into<String>,
  ) {
    self
      .tokens
      .push(Token::new(kind, lexeme, line, column, statement));
  }

  fn push_newline(&mut self) {
    let (line, column, statement) = (self.prev_line, self.prev_column, self.prev_statement.clone());
    self.push(TokenKind::Newline, "", line, column, statement);
  }
}

/// Fold the two-word operators `is not` and `not in` into single tokens so
/// the precedence table can treat them as ordinary comparison operators.
fn merge_compound_keywords(tokens: Vec<Token>) -> Vec<Token> {
  let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());
  for token in tokens {
    if let Some(prev) = merged.last_mut() {
      if prev.kind == TokenKind::Is && token.kind == TokenKind::Not {
        prev.kind = TokenKind::IsNot;
        prev.lexeme = "is not".to_string();
        continue;
      }
      if prev.kind == TokenKind::Not && token.kind == TokenKind::In {
        prev.kind = TokenKind::NotIn;
        prev.lexeme = "not in".to_string();
        continue;
      }
    }
    merged.push(token);
  }
  merged
}
