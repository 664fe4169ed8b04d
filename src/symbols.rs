//! Symbol bookkeeping for code generation.
//!
//! Two structures coexist: a scoped lexical table used to answer "what kind
//! of thing does this name denote here", and the mangle map that rewrites
//! source identifiers into collision-free target symbols. Both live only for
//! the duration of a code generation pass.

use std::collections::HashMap;

/// Prefix applied to every locally scoped identifier.
pub const LOCAL_PREFIX: &str = "____PEREGRINE____PEREGRINE____";

/// Names emitted untouched; they refer to symbols the runtime provides.
const RESERVED: [&str; 2] = ["printf", "error"];

/// What a source name denotes, as far as lowering needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
  Enum,
  Class,
}

/// Lexically scoped name table: a stack of frames, innermost last.
#[derive(Debug, Default)]
pub struct ScopeTable<T> {
  frames: Vec<HashMap<String, T>>,
}

impl<T> ScopeTable<T> {
  pub fn new() -> Self {
    Self {
      frames: vec![HashMap::new()],
    }
  }

  pub fn push_frame(&mut self) {
    self.frames.push(HashMap::new());
  }

  /// Drop the innermost frame. The root frame is never dropped.
  pub fn pop_frame(&mut self) {
    if self.frames.len() > 1 {
      self.frames.pop();
    }
  }

  /// Walk frames innermost-first for the nearest binding.
  pub fn lookup(&self, name: &str) -> Option<&T> {
    self.frames.iter().rev().find_map(|frame| frame.get(name))
  }

  /// Bind a name in the innermost frame. Fails if the name is already
  /// visible from here.
  pub fn define(&mut self, name: &str, payload: T) -> bool {
    if self.lookup(name).is_some() {
      return false;
    }
    if let Some(frame) = self.frames.last_mut() {
      frame.insert(name.to_string(), payload);
    }
    true
  }

  /// Rewrite the nearest existing binding. Fails if the name is unbound.
  pub fn reassign(&mut self, name: &str, payload: T) -> bool {
    for frame in self.frames.iter_mut().rev() {
      if let Some(slot) = frame.get_mut(name) {
        *slot = payload;
        return true;
      }
    }
    false
  }
}

/// The two-tier mangle map.
///
/// Locals are always the fixed prefix plus the source name; globals record
/// whatever mangled form was chosen at definition time (normally the local
/// prefix plus the per-file prefix plus the name). Lookup order is
/// reserved, local, global, then the raw name.
#[derive(Debug, Clone, Default)]
pub struct MangleName {
  globals: HashMap<String, String>,
  locals: HashMap<String, String>,
}

impl MangleName {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_local(&mut self, original: &str) {
    self
      .locals
      .insert(original.to_string(), format!("{LOCAL_PREFIX}{original}"));
  }

  pub fn set_global(&mut self, original: &str, mangled: impl Into<String>) {
    self.globals.insert(original.to_string(), mangled.into());
  }

  pub fn clear_local(&mut self) {
    self.locals.clear();
  }

  pub fn contains(&self, name: &str) -> bool {
    RESERVED.contains(&name) || self.locals.contains_key(name) || self.globals.contains_key(name)
  }

  pub fn lookup(&self, name: &str) -> String {
    if RESERVED.contains(&name) {
      return name.to_string();
    }
    if let Some(mangled) = self.locals.get(name) {
      return mangled.clone();
    }
    if let Some(mangled) = self.globals.get(name) {
      return mangled.clone();
    }
    name.to_string()
  }
}

/// Per-file global prefix: path separators and the extension dot collapse
/// into runs of underscores so the result is a valid identifier fragment.
pub fn global_name(filename: &str) -> String {
  let mut res = String::new();
  for c in filename.chars() {
    if c == '\\' || c == '/' || c == '.' {
      res.push_str("____");
    } else {
      res.push(c);
    }
  }
  res
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn define_rejects_visible_duplicates() {
    let mut table: ScopeTable<SymbolKind> = ScopeTable::new();
    assert!(table.define("Color", SymbolKind::Enum));
    assert!(!table.define("Color", SymbolKind::Enum));

    table.push_frame();
    // still visible from the inner frame
    assert!(!table.define("Color", SymbolKind::Class));
    assert!(table.define("Point", SymbolKind::Class));
    table.pop_frame();

    assert!(table.lookup("Point").is_none());
    assert_eq!(table.lookup("Color"), Some(&SymbolKind::Enum));
  }

  #[test]
  fn reassign_rewrites_the_nearest_binding() {
    let mut table: ScopeTable<u32> = ScopeTable::new();
    table.define("x", 1);
    table.push_frame();
    table.define("y", 2);
    assert!(table.reassign("x", 10));
    assert!(!table.reassign("missing", 0));
    table.pop_frame();
    assert_eq!(table.lookup("x"), Some(&10));
  }

  #[test]
  fn mangle_lookup_order_is_reserved_local_global_raw() {
    let mut map = MangleName::new();
    assert_eq!(map.lookup("printf"), "printf");
    assert_eq!(map.lookup("error"), "error");
    assert!(map.contains("printf"));

    map.set_global("x", "____PEREGRINE____PEREGRINE____main____pex");
    assert_eq!(map.lookup("x"), "____PEREGRINE____PEREGRINE____main____pex");

    map.set_local("x");
    assert_eq!(map.lookup("x"), format!("{LOCAL_PREFIX}x"));

    map.clear_local();
    assert_eq!(map.lookup("x"), "____PEREGRINE____PEREGRINE____main____pex");
    assert_eq!(map.lookup("unknown"), "unknown");
  }

  #[test]
  fn filenames_mangle_into_identifier_fragments() {
    assert_eq!(global_name("main.pe"), "main____pe");
    assert_eq!(global_name("src/app.pe"), "src____app____pe");
    assert_eq!(global_name("a\\b.pe"), "a____b____pe");
  }
}
