//! Lexical scope for the tree-walking evaluator.
//!
//! A chain of scopes linked by an `outer` pointer, same shape as the
//! teacher's `faxc-sem::scope::ScopeTree` rib chain, but held behind
//! `Rc<RefCell<_>>` rather than arena-indexed: a closure captures its
//! defining environment by reference (spec §9), so later writes to an
//! outer scope must be visible through every closure that captured it,
//! which an arena of immutable ribs cannot express at runtime.

use crate::value::Value;
use monke_util::Symbol;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Inner>>);

#[derive(Debug)]
struct Inner {
    store: FxHashMap<Symbol, Value>,
    outer: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Environment(Rc::new(RefCell::new(Inner {
            store: FxHashMap::default(),
            outer: None,
        })))
    }

    pub fn enclosed(outer: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(Inner {
            store: FxHashMap::default(),
            outer: Some(outer.clone()),
        })))
    }

    pub fn get(&self, name: Symbol) -> Option<Value> {
        let inner = self.0.borrow();
        if let Some(value) = inner.store.get(&name) {
            return Some(value.clone());
        }
        inner.outer.as_ref()?.get(name)
    }

    /// Binds `name` in THIS scope only (spec §3: `set` writes to the
    /// innermost scope only).
    pub fn set(&self, name: Symbol, value: Value) {
        self.0.borrow_mut().store.insert(name, value);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl PartialEq for Environment {
    /// Environments compare by identity: two scopes are "the same" only
    /// if a closure capturing one would observe the other's writes.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_outward_through_enclosing_scopes() {
        let outer = Environment::new();
        outer.set(Symbol::intern("x"), Value::Integer(1));
        let inner = Environment::enclosed(&outer);

        assert_eq!(inner.get(Symbol::intern("x")), Some(Value::Integer(1)));
        assert_eq!(inner.get(Symbol::intern("y")), None);
    }

    #[test]
    fn set_never_escapes_to_the_outer_scope() {
        let outer = Environment::new();
        let inner = Environment::enclosed(&outer);
        inner.set(Symbol::intern("x"), Value::Integer(1));

        assert_eq!(outer.get(Symbol::intern("x")), None);
    }

    #[test]
    fn closures_observe_later_writes_to_the_captured_scope() {
        let outer = Environment::new();
        let captured = outer.clone();
        outer.set(Symbol::intern("x"), Value::Integer(1));

        assert_eq!(captured.get(Symbol::intern("x")), Some(Value::Integer(1)));
    }
}
