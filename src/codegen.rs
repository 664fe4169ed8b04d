//! Code generation: lower the parsed AST into C++ source text.
//!
//! The generator is a depth-first tree walker; emission order is the output
//! order. It carries the mangle map plus a handful of context flags. Three
//! of those are scoped resources with strict save/restore discipline: the
//! `{local, mangler}` pair snapshotted around every function and class body,
//! the reference flag suspended inside call and subscript argument lists,
//! and the save-buffer pair `{save, res}` used by decorator folding.

use crate::ast::{AstNode, ExceptClause, Parameter};
use crate::error::{CompileError, CompileResult};
use crate::lexer::{Token, TokenKind};
use crate::symbols::{global_name, MangleName, ScopeTable, SymbolKind, LOCAL_PREFIX};

const PREAMBLE: &str = "#include <cstdio>\n#include <functional>\ntypedef enum{error________PEREGRINE____PEREGRINE____AssertionError,error________PEREGRINE____PEREGRINE____ZeroDivisionError} error;\n";

/// Snapshot of the mangle state taken on entry to a nested scope.
struct MangleSnapshot {
  local: bool,
  mangler: MangleName,
}

pub struct Codegen {
  out: String,
  filename: String,
  global_prefix: String,
  mangler: MangleName,
  scopes: ScopeTable<SymbolKind>,
  local: bool,
  is_func_def: bool,
  is_class: bool,
  is_ref: bool,
  is_define: bool,
  save: bool,
  res: String,
  enum_context: Option<String>,
  // tuple element types of the function currently being lowered
  ret_types: Vec<AstNode>,
}

impl Codegen {
  pub fn new(filename: &str) -> Self {
    Self {
      out: String::new(),
      filename: filename.to_string(),
      global_prefix: global_name(filename),
      mangler: MangleName::new(),
      scopes: ScopeTable::new(),
      local: false,
      is_func_def: false,
      is_class: false,
      is_ref: false,
      is_define: false,
      save: false,
      res: String::new(),
      enum_context: None,
      ret_types: Vec::new(),
    }
  }

  /// Lower a `Program` into a complete translation unit.
  pub fn generate(mut self, program: &AstNode) -> CompileResult<String> {
    let AstNode::Program { statements } = program else {
      return Err(CompileError::internal(
        "code generation expects a Program node at the root",
      ));
    };

    self.out.push_str(PREAMBLE);
    for stmt in statements {
      self.emit(stmt)?;
      self.write(";\n");
    }
    Ok(self.out)
  }

  fn write(&mut self, code: &str) {
    if self.save {
      self.res.push_str(code);
    } else {
      self.out.push_str(code);
    }
  }

  fn begin_local(&mut self) -> MangleSnapshot {
    let snapshot = MangleSnapshot {
      local: self.local,
      mangler: self.mangler.clone(),
    };
    self.local = true;
    snapshot
  }

  fn end_local(&mut self, snapshot: MangleSnapshot) {
    self.local = snapshot.local;
    self.mangler = snapshot.mangler;
  }

  fn emit(&mut self, node: &AstNode) -> CompileResult<()> {
    match node {
      AstNode::Program { .. } => {
        return Err(CompileError::internal("a Program node cannot be nested"));
      }

      AstNode::Block { statements, .. } => {
        for stmt in statements {
          self.write("    ");
          self.emit(stmt)?;
          self.write(";\n");
        }
      }

      // ----- Declarations -----
      AstNode::VariableStatement {
        var_type,
        name,
        value,
        ..
      } => {
        if !var_type.is_no_literal() {
          self.emit(var_type)?;
          self.is_define = true;
          self.write(" ");
        }
        self.emit(name)?;
        self.is_define = false;
        if !value.is_no_literal() {
          self.write(" = ");
          self.emit(value)?;
        }
      }

      AstNode::ConstDeclaration {
        const_type,
        name,
        value,
        ..
      } => {
        self.write("const ");
        if !const_type.is_no_literal() {
          self.emit(const_type)?;
        }
        self.write(" ");
        self.is_define = true;
        self.emit(name)?;
        self.is_define = false;
        self.write("=");
        self.emit(value)?;
      }

      AstNode::TypeDefinition {
        name, base_type, ..
      } => {
        self.write("typedef ");
        self.emit(base_type)?;
        self.write(" ");
        self.is_define = true;
        self.emit(name)?;
        self.is_define = false;
      }

      AstNode::FunctionDef {
        return_type,
        name,
        parameters,
        body,
        ..
      } => self.emit_function_def(return_type, name, parameters, body)?,

      AstNode::ClassDef {
        name,
        parents,
        attributes,
        methods,
        other,
        ..
      } => self.emit_class(name, parents, attributes, methods, other)?,

      AstNode::UnionDef { name, fields, .. } => {
        self.write("typedef union{\n");
        let snapshot = self.begin_local();
        for (field_type, field_name) in fields {
          self.emit(field_type)?;
          self.write(" ");
          self.is_define = true;
          self.emit(field_name)?;
          self.is_define = false;
          self.write(";\n");
        }
        self.write("\n}");
        self.end_local(snapshot);
        self.is_define = true;
        self.emit(name)?;
        self.is_define = false;
      }

      AstNode::EnumDef { name, fields, .. } => self.emit_enum(name, fields)?,

      AstNode::LambdaType {
        arg_types,
        return_types,
        ..
      } => {
        self.write("std::function<");
        let multi = return_types.len() > 1;
        if multi || return_types.is_empty() {
          self.write("void(");
        } else {
          self.emit(&return_types[0])?;
          self.write("(");
        }
        for (i, arg) in arg_types.iter().enumerate() {
          if i > 0 {
            self.write(",");
          }
          self.emit(arg)?;
        }
        if multi {
          if !arg_types.is_empty() {
            self.write(",");
          }
          for (i, ret) in return_types.iter().enumerate() {
            self.emit(ret)?;
            self.write("*");
            if i < return_types.len() - 1 {
              self.write(",");
            }
          }
        }
        self.write(")>");
      }

      // ----- Control flow -----
      AstNode::If {
        condition,
        body,
        elifs,
        else_body,
        ..
      } => {
        self.write("if (");
        self.emit(condition)?;
        self.write(") {\n");
        self.emit(body)?;
        self.write("}");

        if !elifs.is_empty() {
          self.write("\n");
          for (elif_condition, elif_body) in elifs {
            self.write("else if (");
            self.emit(elif_condition)?;
            self.write(") {\n");
            self.emit(elif_body)?;
            self.write("}");
          }
        }

        if matches!(else_body.as_ref(), AstNode::Block { .. }) {
          self.write("\nelse {\n");
          self.emit(else_body)?;
          self.write("}");
        }
      }

      AstNode::While {
        condition, body, ..
      } => {
        self.write("while (");
        self.emit(condition)?;
        self.write(") {\n");
        self.emit(body)?;
        self.write("}");
      }

      AstNode::For {
        variables,
        sequence,
        body,
        ..
      } => {
        self.write("{\nauto ____PEREGRINE____VALUE=");
        self.emit(sequence)?;
        self.write(";\n");
        self.write(&format!(
          "for (size_t ____PEREGRINE____i=0;____PEREGRINE____i<____PEREGRINE____VALUE.{LOCAL_PREFIX}__iter__();++____PEREGRINE____i){{\n"
        ));
        if variables.len() == 1 {
          self.write("auto ");
          self.emit(&variables[0])?;
          self.write(&format!(
            "=____PEREGRINE____VALUE.{LOCAL_PREFIX}__iterate__();\n"
          ));
        } else {
          self.write(&format!(
            "auto ____PEREGRINE____TEMP=____PEREGRINE____VALUE.{LOCAL_PREFIX}__iterate__();\n"
          ));
          for (i, variable) in variables.iter().enumerate() {
            self.write("auto ");
            self.emit(variable)?;
            self.write(&format!(
              "=____PEREGRINE____TEMP.{LOCAL_PREFIX}__getitem__("
            ));
            self.write(&i.to_string());
            self.write(");\n");
          }
        }
        self.emit(body)?;
        self.write("\n}\n}");
      }

      AstNode::Match {
        subjects,
        cases,
        default_body,
        ..
      } => {
        self.write("\nwhile (true) {\n");
        for (i, (patterns, body)) in cases.iter().enumerate() {
          if patterns.len() == 1 && patterns[0].is_no_literal() {
            // `case _` always matches
            if i == 0 {
              self.emit(body)?;
              self.write("\n");
            } else {
              self.write("else {\n");
              self.emit(body)?;
              self.write("\n}\n");
            }
          } else {
            self.write(if i == 0 { "if (" } else { "else if (" });
            self.emit_match_condition(subjects, patterns)?;
            self.write(") {\n");
            self.emit(body)?;
            self.write("\n}\n");
          }
        }
        if !default_body.is_no_literal() {
          self.emit(default_body)?;
        }
        self.write("\nbreak;\n}");
      }

      AstNode::Scope { body, .. } => {
        self.write("{\n");
        self.emit(body)?;
        self.write("\n}");
      }

      AstNode::With { bindings, body, .. } => {
        self.write("{\n");
        for (i, (variable, value)) in bindings.iter().enumerate() {
          self.write(&format!("auto CONTEXT____MANAGER____PEREGRINE____{i}="));
          self.emit(value)?;
          self.write(";\n");
          if !variable.is_no_literal() {
            self.write("auto ");
            self.emit(variable)?;
            self.write("=");
          }
          self.write(&format!("CONTEXT____MANAGER____PEREGRINE____{i}"));
          self.write(&format!(".{LOCAL_PREFIX}__enter__()"));
          self.write(";\n");
        }
        self.emit(body)?;
        for i in 0..bindings.len() {
          self.write(&format!("CONTEXT____MANAGER____PEREGRINE____{i}"));
          self.write(&format!(".{LOCAL_PREFIX}__end__();\n"));
        }
        self.write("\n}\n");
      }

      AstNode::TryExcept {
        body,
        clauses,
        else_body,
        ..
      } => {
        self.write("try{\n");
        self.emit(body)?;
        self.write("}\ncatch(error __PEREGRINE__exception){\n");
        for (i, clause) in clauses.iter().enumerate() {
          self.write(if i == 0 { "if (" } else { "else if (" });
          self.emit_except_clause(clause)?;
        }
        if !else_body.is_no_literal() {
          if !clauses.is_empty() {
            self.write("else{");
            self.emit(else_body)?;
            self.write("}\n");
          } else {
            self.emit(else_body)?;
          }
        } else if !clauses.is_empty() {
          self.write("else{");
          self.write("throw __PEREGRINE__exception;\n");
          self.write("}\n");
        } else {
          self.write("throw __PEREGRINE__exception;\n");
        }
        self.write("}");
      }

      AstNode::Return { value, .. } => {
        if !value.is_no_literal() {
          let values = self.tuple_return_values(value);
          if values.is_empty() {
            self.write("return ");
            self.emit(value)?;
          } else {
            self.write("if (____PEREGRINE____RETURN____0!=NULL){\n");
            for (i, element) in values.iter().enumerate() {
              self.write("    ");
              self.write(&format!("*____PEREGRINE____RETURN____{i}="));
              self.emit(element)?;
              self.write(";\n");
            }
            self.write("}\n");
          }
        } else {
          self.write("return ");
        }
      }

      AstNode::Break { .. } => self.write("break"),
      AstNode::Continue { .. } => self.write("continue"),

      AstNode::Pass { .. } => {
        // the caller appends the statement terminator, so a lone `;` would
        // come out doubled; a comment keeps the line visible instead
        self.write("\n//pass");
      }

      AstNode::Raise { value, .. } => {
        self.write("throw ");
        if !value.is_no_literal() {
          self.emit(value)?;
        } else {
          self.write("0");
        }
      }

      AstNode::Assert { tok, condition } => {
        self.write("if(not ");
        self.emit(condition)?;
        self.write("){\n");
        let report = format!(
          "printf(\"AssertionError : in line {} in file {}\\n   {}\\n\");fflush(stdout);throw error________PEREGRINE____PEREGRINE____AssertionError;",
          tok.line, self.filename, tok.statement
        );
        self.write(&report);
        self.write("\n}");
      }

      AstNode::CppCode { code, .. } => self.write(code),

      // ----- Expressions -----
      AstNode::Integer { value, .. } | AstNode::Decimal { value, .. } => self.write(value),

      AstNode::StringLiteral { value, .. } => {
        self.write(&format!("\"{value}\""));
      }

      AstNode::BoolLiteral { value, .. } => {
        self.write(if *value { "true" } else { "false" });
      }

      AstNode::NoneLiteral { .. } => self.write("NULL"),

      AstNode::Identifier { name, .. } => self.emit_identifier(name),

      AstNode::TypeExpr { name, generics, .. } => {
        if !self.mangler.contains(name) {
          self.write(name);
        } else {
          let mangled = self.mangler.lookup(name);
          self.write(&mangled);
        }
        if !generics.is_empty() {
          self.write("<");
          for (i, generic) in generics.iter().enumerate() {
            if i > 0 {
              self.write(",");
            }
            self.emit(generic)?;
          }
          self.write(">");
        }
      }

      AstNode::BinaryOp { tok, left, right } => self.emit_binary(tok, left, right)?,

      AstNode::PrefixOp { tok, right } => {
        self.write(&format!("({} ", tok.lexeme));
        self.emit(right)?;
        self.write(")");
      }

      AstNode::PostfixOp { tok, left } => {
        self.emit(left)?;
        let op = tok.lexeme.clone();
        self.write(&op);
      }

      AstNode::FunctionCall {
        callee, arguments, ..
      } => {
        self.emit(callee)?;
        self.write("(");
        let saved_ref = self.is_ref;
        self.is_ref = false;
        for (i, argument) in arguments.iter().enumerate() {
          if i > 0 {
            self.write(", ");
          }
          self.emit(argument)?;
        }
        self.is_ref = saved_ref;
        self.write(")");
      }

      AstNode::ListOrDictAccess {
        container, keys, ..
      } => {
        self.emit(container)?;
        self.write(&format!(".{LOCAL_PREFIX}__getitem__("));
        let saved_ref = self.is_ref;
        self.is_ref = false;
        self.emit(&keys[0])?;
        if keys.len() == 2 {
          self.write(",");
          self.emit(&keys[1])?;
        }
        self.is_ref = saved_ref;
        self.write(")");
      }

      AstNode::DotExpression {
        owner, referenced, ..
      } => self.emit_member(owner, referenced, false)?,

      AstNode::ArrowExpression {
        owner, referenced, ..
      } => self.emit_member(owner, referenced, true)?,

      AstNode::ListLiteral { elements, .. } => {
        self.write("{");
        for (i, element) in elements.iter().enumerate() {
          self.emit(element)?;
          if i < elements.len() - 1 {
            self.write(",");
          }
        }
        self.write("}");
      }

      // dict literals have no C++ counterpart yet; the runtime library is
      // expected to grow one
      AstNode::DictLiteral { .. } => {}

      AstNode::TernaryIf {
        condition,
        if_value,
        else_value,
        ..
      } => {
        self.write("(");
        self.emit(condition)?;
        self.write(")?");
        self.emit(if_value)?;
        self.write(":");
        self.emit(else_value)?;
      }

      AstNode::Cast {
        target_type, value, ..
      } => {
        self.write("(");
        self.emit(target_type)?;
        self.write(")(");
        self.emit(value)?;
        self.write(")");
      }

      AstNode::PointerType { base, .. } => {
        self.emit(base)?;
        self.write("*");
      }

      AstNode::RefType { base, .. } => {
        self.emit(base)?;
        self.write("&");
      }

      AstNode::DefaultArg { value, .. } => {
        self.emit(value)?;
      }

      // ----- Modifiers -----
      AstNode::Decorator { items, body, .. } => self.emit_decorator(items, body)?,

      AstNode::Static { body, .. } => {
        self.write("static ");
        self.emit(body)?;
      }

      AstNode::Inline { body, .. } => {
        self.write("inline ");
        self.emit(body)?;
      }

      AstNode::Export { body, .. } => {
        self.write("extern \"C\" ");
        let AstNode::FunctionDef { name, .. } = body.as_ref() else {
          return Err(CompileError::internal(
            "'export' expects a function definition body",
          ));
        };
        if let Some(exported) = name.identifier_name() {
          self.mangler.set_global(exported, exported);
        }
        self.emit(body)?;
      }

      // ----- Assignment forms -----
      AstNode::MultipleAssign { names, values, .. } => {
        self.write("{");
        for (i, value) in values.iter().enumerate() {
          self.write(&format!("auto _____PEREGRINE____temp____{i}="));
          self.emit(value)?;
          self.write(";");
        }
        for (i, name) in names.iter().enumerate() {
          self.emit(name)?;
          self.write(&format!("=_____PEREGRINE____temp____{i}"));
          self.write(";");
        }
        self.write("}");
      }

      AstNode::AugAssign { tok, name, value } => {
        self.emit(name)?;
        let op = tok.lexeme.clone();
        self.write(&op);
        self.emit(value)?;
      }

      // imports are resolved by the driver, nothing is emitted here
      AstNode::Import { .. } => {}

      AstNode::NoLiteral => {}
    }
    Ok(())
  }

  // ----- Functions -----

  fn emit_function_def(
    &mut self,
    return_type: &AstNode,
    name: &AstNode,
    parameters: &[Parameter],
    body: &AstNode,
  ) -> CompileResult<()> {
    let ret = tuple_types(return_type);
    let func_name = name.identifier_name().unwrap_or_default().to_string();

    if !self.is_func_def {
      self.is_func_def = true;
      if func_name == "main" && !self.is_class {
        // main always reports success
        self.write("int main (");
        self.mangler.set_global("main", "main");
        let snapshot = self.begin_local();
        self.scopes.push_frame();
        let saved_ret = std::mem::take(&mut self.ret_types);
        self.emit_func_params(parameters)?;
        self.write(") {\n");
        self.emit(body)?;
        self.write("return 0;\n}");
        self.ret_types = saved_ret;
        self.scopes.pop_frame();
        self.end_local(snapshot);
      } else {
        if ret.is_empty() {
          self.emit(return_type)?;
        } else {
          self.write("void");
        }
        self.write(" ");
        self.is_define = true;
        self.emit(name)?;
        self.is_define = false;
        self.write("(");
        let snapshot = self.begin_local();
        self.scopes.push_frame();
        let saved_ret = std::mem::replace(&mut self.ret_types, ret.clone());
        self.emit_func_params(parameters)?;
        self.emit_return_out_params(&ret, !parameters.is_empty())?;
        self.write(") {\n");
        self.emit(body)?;
        self.write("\n}");
        self.ret_types = saved_ret;
        self.scopes.pop_frame();
        self.end_local(snapshot);
      }
      self.is_func_def = false;
    } else {
      // a nested definition becomes a capturing closure
      let snapshot = self.begin_local();
      self.scopes.push_frame();
      let saved_ret = std::mem::replace(&mut self.ret_types, ret.clone());
      self.write("auto ");
      self.is_define = true;
      self.emit(name)?;
      self.is_define = false;
      self.write("=[=](");
      self.emit_func_params(parameters)?;
      self.emit_return_out_params(&ret, !parameters.is_empty())?;
      self.write(")mutable->");
      if ret.is_empty() {
        self.emit(return_type)?;
      } else {
        self.write("void");
      }
      self.write(" {\n");
      self.emit(body)?;
      self.write("\n}");
      self.ret_types = saved_ret;
      self.scopes.pop_frame();
      self.end_local(snapshot);
    }
    Ok(())
  }

  fn emit_func_params(&mut self, parameters: &[Parameter]) -> CompileResult<()> {
    for (i, parameter) in parameters.iter().enumerate() {
      if i > 0 {
        self.write(", ");
      }
      if parameter.p_type.is_no_literal() {
        self.write("auto");
      } else {
        self.emit(&parameter.p_type)?;
      }
      self.write(" ");
      self.is_define = true;
      self.emit(&parameter.name)?;
      self.is_define = false;
      if !parameter.default.is_no_literal() {
        self.write("=");
        self.emit(&parameter.default)?;
      }
    }
    Ok(())
  }

  /// A tuple-returning function takes one out-pointer per element.
  fn emit_return_out_params(&mut self, ret: &[AstNode], has_params: bool) -> CompileResult<()> {
    if !ret.is_empty() && has_params {
      self.write(",");
    }
    for (i, ret_type) in ret.iter().enumerate() {
      self.emit(ret_type)?;
      self.write(&format!("*____PEREGRINE____RETURN____{i}=NULL"));
      if i < ret.len() - 1 {
        self.write(",");
      }
    }
    Ok(())
  }

  fn tuple_return_values(&self, value: &AstNode) -> Vec<AstNode> {
    if self.ret_types.is_empty() {
      return Vec::new();
    }
    match value {
      AstNode::ListLiteral { elements, .. } => elements.clone(),
      _ => Vec::new(),
    }
  }

  // ----- Decorators -----

  /// Capture the lowered function into the save-buffer, then fold the
  /// decorator expressions around it innermost-first.
  fn emit_decorator(&mut self, items: &[AstNode], body: &AstNode) -> CompileResult<()> {
    let prev = std::mem::take(&mut self.res);
    self.save = true;

    let function = match body {
      AstNode::Static { body: inner, .. } => {
        self.write("static ");
        inner.as_ref()
      }
      _ => body,
    };
    let AstNode::FunctionDef {
      return_type,
      name,
      parameters,
      body: function_body,
      ..
    } = function
    else {
      return Err(CompileError::internal(
        "a Decorator node must wrap a function definition",
      ));
    };

    self.write("auto ");
    self.is_define = true;
    self.emit(name)?;
    self.is_define = false;
    self.write("=");
    let binding = std::mem::take(&mut self.res);

    if self.is_func_def {
      self.write("[=](");
    } else {
      self.write("[](");
    }
    let ret = tuple_types(return_type);
    let snapshot = self.begin_local();
    self.scopes.push_frame();
    let saved_ret = std::mem::replace(&mut self.ret_types, ret.clone());
    self.emit_func_params(parameters)?;
    self.emit_return_out_params(&ret, !parameters.is_empty())?;
    self.write(")mutable->");
    if ret.is_empty() {
      self.emit(return_type)?;
    } else {
      self.write("void");
    }
    self.write("{\n");
    if !self.is_func_def {
      self.is_func_def = true;
      self.emit(function_body)?;
      self.is_func_def = false;
    } else {
      self.emit(function_body)?;
    }
    self.write("\n}");
    self.ret_types = saved_ret;
    self.scopes.pop_frame();
    self.end_local(snapshot);

    let mut contains = std::mem::take(&mut self.res);
    for item in items.iter().rev() {
      contains = self.wrap(item, contains)?;
    }

    if prev.is_empty() {
      self.save = false;
      self.write(&format!("{binding}{contains}"));
    } else {
      self.res = format!("{prev}{binding}{contains}");
    }
    Ok(())
  }

  /// Render one decorator application, `decorator(wrapped)`.
  fn wrap(&mut self, item: &AstNode, contains: String) -> CompileResult<String> {
    self.emit(item)?;
    let callee = std::mem::take(&mut self.res);
    Ok(format!("{callee}({contains})"))
  }

  // ----- Classes and enums -----

  fn emit_class(
    &mut self,
    name: &AstNode,
    parents: &[AstNode],
    attributes: &[AstNode],
    methods: &[AstNode],
    other: &[AstNode],
  ) -> CompileResult<()> {
    self.write("class ");
    self.is_define = true;
    self.emit(name)?;
    self.is_define = false;
    let class_name = name.identifier_name().unwrap_or_default().to_string();
    self.scopes.define(&class_name, SymbolKind::Class);

    if !parents.is_empty() {
      self.write(":");
    }
    for (i, parent) in parents.iter().enumerate() {
      self.write("public ");
      self.emit(parent)?;
      if i < parents.len() - 1 {
        self.write(",");
      }
    }
    self.write("\n{");

    let snapshot = self.begin_local();
    self.scopes.push_frame();
    for node in other {
      self.emit(node)?;
      self.write(";\n");
    }
    self.write("public:\n");

    let saved_class = self.is_class;
    self.is_class = true;
    for attribute in attributes {
      self.emit(attribute)?;
      self.write(";\n");
    }
    for method in methods {
      self.emit_method(method)?;
      self.write(";\n");
    }
    self.is_class = saved_class;

    self.write("\n}");
    self.scopes.pop_frame();
    self.end_local(snapshot);
    Ok(())
  }

  /// Magic methods keep their double-underscore name under the local
  /// prefix, so `obj.__enter__()` call sites resolve to them.
  fn emit_method(&mut self, method: &AstNode) -> CompileResult<()> {
    if let AstNode::FunctionDef { name, .. } = method {
      if let Some(method_name) = name.identifier_name() {
        if method_name.starts_with("__") && method_name.ends_with("__") {
          self.mangler.set_local(method_name);
        }
      }
    }
    self.emit(method)
  }

  fn emit_enum(&mut self, name: &AstNode, fields: &[(AstNode, AstNode)]) -> CompileResult<()> {
    self.write("typedef enum{\n");
    let enum_name = name.identifier_name().unwrap_or_default().to_string();
    self.scopes.define(&enum_name, SymbolKind::Enum);

    for (i, (field_name, value)) in fields.iter().enumerate() {
      self.emit(name)?;
      self.write("____");
      let snapshot = self.begin_local();
      self.emit(field_name)?;
      self.end_local(snapshot);
      if !value.is_no_literal() {
        // unqualified names in the initializer resolve to sibling fields
        self.enum_context = Some(enum_name.clone());
        self.write(" = ");
        self.emit(value)?;
        self.enum_context = None;
      }
      if i != fields.len() - 1 {
        self.write(",\n");
      }
    }
    self.write("\n}");
    self.emit(name)?;
    Ok(())
  }

  // ----- Expressions -----

  fn emit_binary(&mut self, tok: &Token, left: &AstNode, right: &AstNode) -> CompileResult<()> {
    match tok.kind {
      TokenKind::Power => {
        self.write("_PEREGRINE_POWER(");
        self.emit(left)?;
        self.write(",");
        self.emit(right)?;
        self.write(")");
      }
      TokenKind::FloorDiv => {
        self.write("_PEREGRINE_FLOOR(");
        self.emit(left)?;
        self.write("/");
        self.emit(right)?;
        self.write(")");
      }
      TokenKind::In => {
        self.write("(");
        self.emit(right)?;
        self.write(&format!(".{LOCAL_PREFIX}__contains__("));
        self.emit(left)?;
        self.write("))");
      }
      TokenKind::NotIn => {
        self.write("(not ");
        self.emit(right)?;
        self.write(&format!(".{LOCAL_PREFIX}__contains__("));
        self.emit(left)?;
        self.write("))");
      }
      _ => {
        self.write("(");
        self.emit(left)?;
        let op = tok.lexeme.clone();
        self.write(&format!(" {op} "));
        self.emit(right)?;
        self.write(")");
      }
    }
    Ok(())
  }

  fn emit_member(
    &mut self,
    owner: &AstNode,
    referenced: &AstNode,
    arrow: bool,
  ) -> CompileResult<()> {
    // `Enum.Field` collapses into the enum constant
    if !arrow {
      if let Some(owner_name) = owner.identifier_name() {
        if self.scopes.lookup(owner_name) == Some(&SymbolKind::Enum)
          && self.mangler.contains(owner_name)
        {
          let mangled = self.mangler.lookup(owner_name);
          self.write(&mangled);
          self.write("________PEREGRINE____PEREGRINE____");
          let Some(field) = referenced.identifier_name() else {
            return Err(CompileError::internal(
              "an enum member access expects a plain field name",
            ));
          };
          self.write(field);
          return Ok(());
        }
      }
    }

    let saved_ref = self.is_ref;
    self.is_ref = false;
    self.emit(owner)?;
    self.write(if arrow { "->" } else { "." });
    self.is_ref = true;
    self.emit(referenced)?;
    self.is_ref = saved_ref;
    Ok(())
  }

  fn emit_identifier(&mut self, name: &str) {
    // reference position: prefix, never register
    if self.is_ref {
      self.write(&format!("{LOCAL_PREFIX}{name}"));
      return;
    }

    if let Some(enum_name) = self.enum_context.clone() {
      let mangled = self.mangler.lookup(&enum_name);
      self.write(&mangled);
      self.write("________PEREGRINE____PEREGRINE____");
      self.write(name);
      return;
    }

    if !self.mangler.contains(name) {
      if self.local {
        self.mangler.set_local(name);
      } else {
        let mangled = format!("{LOCAL_PREFIX}{}{name}", self.global_prefix);
        self.mangler.set_global(name, mangled);
      }
    } else if self.is_define && self.local {
      // a definition inside a scope shadows whatever was visible before;
      // top-level redefinitions keep their symbol (exported names rely on
      // this)
      self.mangler.set_local(name);
    }
    let mangled = self.mangler.lookup(name);
    self.write(&mangled);
  }

  fn emit_match_condition(
    &mut self,
    subjects: &[AstNode],
    patterns: &[AstNode],
  ) -> CompileResult<()> {
    let mut first = true;
    for (subject, pattern) in subjects.iter().zip(patterns.iter()) {
      if pattern.is_no_literal() {
        continue;
      }
      if !first {
        self.write(" and ");
      }
      first = false;
      let anchor = pattern
        .token()
        .cloned()
        .unwrap_or_else(|| Token::new(TokenKind::EqEq, "==", 0, 0, ""));
      let comparison = AstNode::BinaryOp {
        tok: Token::new(
          TokenKind::EqEq,
          "==",
          anchor.line,
          anchor.column,
          anchor.statement.clone(),
        ),
        left: Box::new(subject.clone()),
        right: Box::new(pattern.clone()),
      };
      self.emit(&comparison)?;
    }
    if first {
      self.write("true");
    }
    Ok(())
  }

  fn emit_except_clause(&mut self, clause: &ExceptClause) -> CompileResult<()> {
    if clause.types.is_empty() {
      self.write("true");
    }
    for (i, error_type) in clause.types.iter().enumerate() {
      self.write("__PEREGRINE__exception==");
      self.emit(error_type)?;
      if i < clause.types.len() - 1 {
        self.write(" or ");
      }
    }
    self.write("){\n");
    if !clause.bind.is_no_literal() {
      self.write("auto ");
      self.emit(&clause.bind)?;
      self.write("=__PEREGRINE__exception;\n");
    }
    self.emit(&clause.body)?;
    self.write("}\n");
    Ok(())
  }
}

fn tuple_types(return_type: &AstNode) -> Vec<AstNode> {
  match return_type {
    AstNode::ListLiteral { elements, .. } => elements.clone(),
    _ => Vec::new(),
  }
}
