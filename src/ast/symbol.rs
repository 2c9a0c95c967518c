//! Symbols and the lexically scoped symbol table.
use std::{collections::HashMap, fmt::Display, rc::Rc};

use once_cell::sync::Lazy;

use crate::typechecker::Type;

use super::Position;

/// A named entity introduced by a declaration.
///
/// Uses share the `Rc` of their declaration, so two uses resolving to the
/// same declaration carry the same symbol. The `id` is unique per
/// compilation and serves as the map key in later passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: usize,
    pub name: String,
    pub ty: Type,
    pub position: Position,
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Signatures of the six runtime I/O functions available in every program.
/// The generated code calls them by symbol; they resolve at link time.
static BUILTINS: Lazy<Vec<(&str, Type)>> = Lazy::new(|| {
    let func = |params: Vec<Type>, ret: Type| Type::Func {
        params,
        ret: Box::new(ret),
    };
    vec![
        ("readInt", func(vec![], Type::Int)),
        ("readChar", func(vec![], Type::Int)),
        ("printBool", func(vec![Type::Bool], Type::Void)),
        ("printInt", func(vec![Type::Int], Type::Void)),
        ("printChar", func(vec![Type::Int], Type::Void)),
        ("println", func(vec![], Type::Void)),
    ]
});

/// An ordered stack of scopes, innermost last. The bottom scope holds the
/// builtins together with the program's global declarations.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Rc<Symbol>>>,
    symbol_count: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            scopes: vec![],
            symbol_count: 0,
        };
        table.push();
        for (name, ty) in BUILTINS.iter() {
            table.declare(name, ty.clone(), (0, 0));
        }
        table
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn fresh(&mut self, name: &str, ty: Type, position: Position) -> Rc<Symbol> {
        let symbol = Rc::new(Symbol {
            id: self.symbol_count,
            name: name.to_owned(),
            ty,
            position,
        });
        self.symbol_count += 1;
        symbol
    }

    /// Check whether a name is already taken in the innermost scope.
    pub fn declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false)
    }

    /// Add a name to the innermost scope, replacing a same-scope duplicate.
    /// Callers are expected to check [`Self::declared_in_current_scope`]
    /// first and report the collision.
    pub fn declare(&mut self, name: &str, ty: Type, position: Position) -> Rc<Symbol> {
        let symbol = self.fresh(name, ty, position);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), Rc::clone(&symbol));
        }
        symbol
    }

    /// Find a name, searching from the innermost scope outwards.
    pub fn lookup(&self, name: &str) -> Option<Rc<Symbol>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    /// Sentinel symbol for a use that failed to resolve, so later passes can
    /// keep collecting errors.
    pub fn error_symbol(&mut self, name: &str, position: Position) -> Rc<Symbol> {
        self.fresh(
            name,
            Type::Error(format!("unresolved symbol '{name}'")),
            position,
        )
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_predeclared() {
        let table = SymbolTable::new();
        for name in [
            "readInt",
            "readChar",
            "printBool",
            "printInt",
            "printChar",
            "println",
        ] {
            let symbol = table.lookup(name).expect("builtin is declared");
            assert!(matches!(symbol.ty, Type::Func { .. }));
        }
        assert!(table.lookup("printFloat").is_none());
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut table = SymbolTable::new();
        let outer = table.declare("x", Type::Int, (1, 1));
        table.push();
        let inner = table.declare("x", Type::Bool, (2, 1));
        assert!(Rc::ptr_eq(&table.lookup("x").unwrap(), &inner));
        table.pop();
        assert!(Rc::ptr_eq(&table.lookup("x").unwrap(), &outer));
    }

    #[test]
    fn duplicate_detection_is_per_scope() {
        let mut table = SymbolTable::new();
        table.declare("x", Type::Int, (1, 1));
        assert!(table.declared_in_current_scope("x"));
        table.push();
        assert!(!table.declared_in_current_scope("x"));
    }

    #[test]
    fn scope_depth_is_balanced() {
        let mut table = SymbolTable::new();
        let depth = table.depth();
        table.push();
        table.push();
        table.pop();
        table.pop();
        assert_eq!(table.depth(), depth);
    }
}
