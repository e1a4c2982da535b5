//! The builtin function registry.
//!
//! Order matters: the compiler hardcodes each builtin's index via
//! `define_builtin` and the VM's `GetBuiltin idx` indexes straight into
//! this table, so this single ordered list is the one place that ordering
//! is decided (spec §6, §9 design note on builtins as host functions).

use crate::value::{Builtin, Value};

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "puts",
        func: builtin_puts,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
];

pub fn lookup(name: &str) -> Option<(usize, Builtin)> {
    BUILTINS.iter().position(|b| b.name == name).map(|i| (i, BUILTINS[i]))
}

fn wrong_arity(got: usize, want: usize) -> Value {
    Value::Error(format!("wrong number of arguments. got={got}, want={want}"))
}

fn unsupported(name: &str, arg: &Value) -> Value {
    Value::Error(format!(
        "argument to `{name}` not supported, got {}",
        arg.type_name()
    ))
}

fn builtin_len(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Str(s) => Value::Integer(s.chars().count() as i64),
        Value::Array(items) => Value::Integer(items.len() as i64),
        other => unsupported("len", other),
    }
}

fn builtin_puts(args: &[Value]) -> Value {
    for arg in args {
        println!("{}", arg.inspect());
    }
    Value::Null
}

fn builtin_first(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => unsupported("first", other),
    }
}

fn builtin_last(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Array(items) => items.last().cloned().unwrap_or(Value::Null),
        other => unsupported("last", other),
    }
}

fn builtin_rest(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_arity(args.len(), 1);
    }
    match &args[0] {
        Value::Array(items) if items.is_empty() => Value::Null,
        Value::Array(items) => Value::array(items[1..].to_vec()),
        other => unsupported("rest", other),
    }
}

fn builtin_push(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_arity(args.len(), 2);
    }
    match &args[0] {
        Value::Array(items) => {
            let mut next = (**items).clone();
            next.push(args[1].clone());
            Value::array(next)
        }
        other => unsupported("push", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_reports_string_and_array_length() {
        assert_eq!((BUILTINS[0].func)(&[Value::str("mon")]), Value::Integer(3));
        assert_eq!(
            (BUILTINS[0].func)(&[Value::array(vec![Value::Integer(1)])]),
            Value::Integer(1)
        );
    }

    #[test]
    fn len_on_unsupported_type_is_an_error() {
        assert!((BUILTINS[0].func)(&[Value::Integer(1)]).is_error());
    }

    #[test]
    fn rest_and_push_do_not_mutate_the_input_array() {
        let original = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        let rest = builtin_rest(&[original.clone()]);
        assert_eq!(rest, Value::array(vec![Value::Integer(2)]));

        let pushed = builtin_push(&[original.clone(), Value::Integer(3)]);
        assert_eq!(
            pushed,
            Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        );
        assert_eq!(original, Value::array(vec![Value::Integer(1), Value::Integer(2)]));
    }

    #[test]
    fn lookup_resolves_by_name_and_index() {
        let (idx, b) = lookup("puts").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(b.name, "puts");
        assert!(lookup("nope").is_none());
    }
}
