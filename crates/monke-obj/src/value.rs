//! The runtime value model shared by the evaluator and the VM.
//!
//! A tagged sum type stands in for the source's polymorphic object
//! hierarchy (spec §9 re-architecture note); heap-shaped variants wrap
//! their payload in `Rc` so that pushing a value onto the VM's data stack
//! or returning one from a builtin is a cheap reference-count bump rather
//! than a deep clone.

use crate::environment::Environment;
use indexmap::IndexMap;
use monke_code::Instructions;
use monke_par::BlockStatement;
use monke_util::Symbol;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Str(Rc<str>),
    Null,
    Array(Rc<Vec<Value>>),
    Hash(Rc<IndexMap<HashKey, Value>>),
    ReturnValue(Box<Value>),
    Error(String),
    Function(Rc<Function>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(Builtin),
}

#[derive(Debug, PartialEq)]
pub struct Function {
    pub params: Vec<Symbol>,
    pub body: BlockStatement,
    pub env: Environment,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: u16,
    pub num_params: u16,
}

#[derive(Debug, PartialEq)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

pub type BuiltinFn = fn(&[Value]) -> Value;

#[derive(Clone, Copy, PartialEq)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

/// The three key variants a `Hash` accepts, per spec §3. Constructed via
/// [`HashKey::from_value`]; anything else is the caller's
/// `"unusable as hash key"` error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    Str(Rc<str>),
}

impl HashKey {
    pub fn from_value(value: &Value) -> Option<HashKey> {
        match value {
            Value::Integer(i) => Some(HashKey::Integer(*i)),
            Value::Boolean(b) => Some(HashKey::Boolean(*b)),
            Value::Str(s) => Some(HashKey::Str(s.clone())),
            _ => None,
        }
    }
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(values))
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The upper-case type tag used in error messages (spec §7): e.g.
    /// `"ERROR: type mismatch: INTEGER + BOOLEAN"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Str(_) => "STRING",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::ReturnValue(_) => "RETURN_VALUE",
            Value::Error(_) => "ERROR",
            Value::Function(_) => "FUNCTION",
            Value::CompiledFunction(_) => "COMPILED_FUNCTION",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
        }
    }

    /// The human-facing rendering used by the REPL and `puts` (spec §6).
    pub fn inspect(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => {
                let body = items
                    .iter()
                    .map(Value::inspect)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{body}]")
            }
            Value::Hash(pairs) => {
                let body = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", hash_key_inspect(k), v.inspect()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{body}}}")
            }
            Value::ReturnValue(inner) => inner.inspect(),
            Value::Error(msg) => format!("ERROR: {msg}"),
            Value::Function(f) => {
                let params = f
                    .params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("fn({params}) {{\n{}\n}}", f.body)
            }
            Value::CompiledFunction(cf) => format!("CompiledFunction[{:p}]", Rc::as_ptr(cf)),
            Value::Closure(c) => format!("Closure[{:p}]", Rc::as_ptr(c)),
            Value::Builtin(b) => format!("builtin function: {}", b.name),
        }
    }

    /// Structural equality for `Equal`/`NotEqual` (spec §4.6): integers and
    /// strings compare by value, booleans by value, everything else not
    /// explicitly value-like compares by identity.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Integer(x), Value::Integer(y)) => x == y,
            (Value::Boolean(x), Value::Boolean(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Null, Value::Null) => true,
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| Value::values_equal(a, b))
            }
            (Value::Hash(x), Value::Hash(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .all(|(k, v)| y.get(k).is_some_and(|v2| Value::values_equal(v, v2)))
            }
            (Value::Closure(x), Value::Closure(y)) => Rc::ptr_eq(x, y),
            (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
            (Value::Builtin(x), Value::Builtin(y)) => x.func as usize == y.func as usize,
            _ => false,
        }
    }
}

fn hash_key_inspect(key: &HashKey) -> String {
    match key {
        HashKey::Integer(i) => i.to_string(),
        HashKey::Boolean(b) => b.to_string(),
        HashKey::Str(s) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_rule() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn inspect_renders_array_and_hash() {
        let arr = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(arr.inspect(), "[1, 2]");

        let mut map = IndexMap::new();
        map.insert(HashKey::Str("one".into()), Value::Integer(1));
        let hash = Value::Hash(Rc::new(map));
        assert_eq!(hash.inspect(), "{one: 1}");
    }

    #[test]
    fn values_equal_compares_arrays_structurally() {
        let a = Value::array(vec![Value::Integer(1), Value::str("x")]);
        let b = Value::array(vec![Value::Integer(1), Value::str("x")]);
        assert!(Value::values_equal(&a, &b));
    }

    #[test]
    fn hash_key_rejects_non_hashable_values() {
        assert!(HashKey::from_value(&Value::Null).is_none());
        assert!(HashKey::from_value(&Value::Integer(5)).is_some());
    }
}
