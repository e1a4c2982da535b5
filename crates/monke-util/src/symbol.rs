//! String interning for identifiers.
//!
//! A [`Symbol`] is a compact handle to an interned string: comparing two
//! symbols is an integer comparison rather than a byte-by-byte one, which
//! matters once the same identifier (`x`, `fn`, a hot loop variable) shows
//! up thousands of times across a lexed-and-parsed program.
//!
//! Monke runs single-threaded (see spec non-goal: no concurrency), so the
//! table is a plain `RwLock<HashMap>` behind a `OnceLock` rather than the
//! lock-free `DashMap` the teacher crate uses for its concurrent compiler.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

/// An interned identifier. Cheap to copy, compare, and hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

struct Table {
    strings: Vec<Box<str>>,
    indices: FxHashMap<Box<str>, u32>,
}

impl Table {
    fn new() -> Self {
        Table {
            strings: Vec::new(),
            indices: FxHashMap::default(),
        }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&idx) = self.indices.get(s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.indices.insert(boxed, idx);
        idx
    }

    fn resolve(&self, idx: u32) -> &str {
        &self.strings[idx as usize]
    }
}

static TABLE: OnceLock<RwLock<Table>> = OnceLock::new();

fn table() -> &'static RwLock<Table> {
    TABLE.get_or_init(|| RwLock::new(Table::new()))
}

impl Symbol {
    /// Interns `s`, returning a handle shared by every prior call with the
    /// same contents.
    pub fn intern(s: &str) -> Symbol {
        let idx = table().write().unwrap().intern(s);
        Symbol(idx)
    }

    /// Returns the original string. Allocates a fresh `String` since the
    /// backing table cannot hand out a borrow past the lock guard.
    pub fn as_str(&self) -> String {
        table().read().unwrap().resolve(self.0).to_owned()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_interns_to_the_same_symbol() {
        let a = Symbol::intern("fib");
        let b = Symbol::intern("fib");
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_interns_to_different_symbols() {
        let a = Symbol::intern("fib");
        let b = Symbol::intern("fib2");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_as_str() {
        let s = Symbol::intern("newAdder");
        assert_eq!(s.as_str(), "newAdder");
    }
}
