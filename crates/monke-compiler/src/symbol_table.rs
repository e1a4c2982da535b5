//! Nested name resolution for the compiler.
//!
//! Grounded on the teacher's `faxc-sem::scope::ScopeTree` (ribs chained by an
//! `outer` pointer, `enter_scope`/`exit_scope`/`resolve` walking the chain),
//! but reworked from an arena of index-addressed ribs into an owned chain of
//! scopes, since the compiler here needs ownership transfer on enter/leave
//! (the scope itself, not just a cursor into an arena, crosses the
//! compilation-scope boundary described in the bytecode compiler).

use monke_util::Symbol;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Local,
    Builtin,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub name: Symbol,
    pub scope: Scope,
    pub index: u16,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: FxHashMap<Symbol, Binding>,
    num_definitions: u16,
    pub free_symbols: Vec<Binding>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn num_definitions(&self) -> u16 {
        self.num_definitions
    }

    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Pushes a fresh inner scope, taking ownership of the current one as
    /// its `outer`. Mirrors entering a compilation scope (spec §4.5).
    pub fn push_scope(&mut self) {
        let outer = std::mem::take(self);
        *self = SymbolTable {
            outer: Some(Box::new(outer)),
            ..SymbolTable::default()
        };
    }

    /// Restores `outer`, discarding the inner scope's bindings.
    pub fn pop_scope(&mut self) {
        let outer = self.outer.take().expect("pop_scope with no outer scope");
        *self = *outer;
    }

    pub fn define(&mut self, name: Symbol) -> Binding {
        let scope = if self.is_global() {
            Scope::Global
        } else {
            Scope::Local
        };
        let binding = Binding {
            name,
            scope,
            index: self.num_definitions,
        };
        self.num_definitions += 1;
        self.store.insert(name, binding);
        binding
    }

    /// Registers a builtin at a fixed index. Only meaningful on the root
    /// scope, but callable anywhere the way `define_builtin` is in the
    /// source design note (spec §9).
    pub fn define_builtin(&mut self, index: u16, name: Symbol) -> Binding {
        let binding = Binding {
            name,
            scope: Scope::Builtin,
            index,
        };
        self.store.insert(name, binding);
        binding
    }

    fn define_free(&mut self, original: Binding) -> Binding {
        self.free_symbols.push(original);
        let binding = Binding {
            name: original.name,
            scope: Scope::Free,
            index: (self.free_symbols.len() - 1) as u16,
        };
        self.store.insert(original.name, binding);
        binding
    }

    /// Resolves `name` inner-to-outer. A name found in an enclosing
    /// LOCAL or FREE scope is re-defined here as FREE and recorded in
    /// `free_originals`, which the compiler drains when it emits the
    /// enclosing-scope loads for a closure's captures (spec §3, §4.5).
    pub fn resolve(&mut self, name: Symbol) -> Option<Binding> {
        if let Some(binding) = self.store.get(&name) {
            return Some(*binding);
        }

        let outer = self.outer.as_mut()?;
        let found = outer.resolve(name)?;

        match found.scope {
            Scope::Global | Scope::Builtin => Some(found),
            Scope::Local | Scope::Free => Some(self.define_free(found)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_defines_increasing_indices() {
        let mut table = SymbolTable::new();
        let a = table.define(Symbol::intern("a"));
        let b = table.define(Symbol::intern("b"));
        assert_eq!(a.scope, Scope::Global);
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
    }

    #[test]
    fn resolve_unchanged_for_global_and_builtin() {
        let mut table = SymbolTable::new();
        table.define(Symbol::intern("g"));
        table.define_builtin(0, Symbol::intern("len"));
        table.push_scope();

        let g = table.resolve(Symbol::intern("g")).unwrap();
        assert_eq!(g.scope, Scope::Global);
        let len = table.resolve(Symbol::intern("len")).unwrap();
        assert_eq!(len.scope, Scope::Builtin);
        assert!(table.free_symbols.is_empty());
    }

    #[test]
    fn resolve_promotes_enclosing_local_to_free() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.define(Symbol::intern("a"));
        table.push_scope();

        let resolved = table.resolve(Symbol::intern("a")).unwrap();
        assert_eq!(resolved.scope, Scope::Free);
        assert_eq!(resolved.index, 0);
        assert_eq!(table.free_symbols[0].scope, Scope::Local);
    }

    #[test]
    fn resolve_chains_free_through_two_levels() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.define(Symbol::intern("a"));
        table.push_scope();
        table.resolve(Symbol::intern("a")); // becomes Free here
        table.push_scope();

        let resolved = table.resolve(Symbol::intern("a")).unwrap();
        assert_eq!(resolved.scope, Scope::Free);
    }

    #[test]
    fn undefined_name_resolves_to_none() {
        let mut table = SymbolTable::new();
        assert!(table.resolve(Symbol::intern("missing")).is_none());
    }

    #[test]
    fn pop_scope_discards_inner_bindings() {
        let mut table = SymbolTable::new();
        table.define(Symbol::intern("g"));
        table.push_scope();
        table.define(Symbol::intern("l"));
        table.pop_scope();

        assert!(table.is_global());
        assert!(table.resolve(Symbol::intern("l")).is_none());
        assert!(table.resolve(Symbol::intern("g")).is_some());
    }
}
