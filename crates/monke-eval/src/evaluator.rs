//! The recursive AST interpreter (spec §4.3).
//!
//! Structured like the teacher's `faxc-sem::analysis::SemanticAnalyzer`
//! recursive-descent walk, but dispatching with a free function per AST
//! variant and threading errors as `Value::Error` return values instead of
//! a diagnostic handler, per the source's error-by-value design (spec §9).

use indexmap::IndexMap;
use monke_obj::{lookup_builtin, Environment, Function, HashKey, Value};
use monke_par::{BlockStatement, Expr, Program, Statement};
use monke_util::Symbol;
use std::rc::Rc;

pub fn eval_program(program: &Program, env: &Environment) -> Value {
    let mut result = Value::Null;
    for stmt in &program.statements {
        result = eval_statement(stmt, env);
        match result {
            Value::ReturnValue(inner) => return *inner,
            Value::Error(_) => return result,
            _ => {}
        }
    }
    result
}

fn eval_block(block: &BlockStatement, env: &Environment) -> Value {
    let mut result = Value::Null;
    for stmt in &block.statements {
        result = eval_statement(stmt, env);
        if matches!(result, Value::ReturnValue(_) | Value::Error(_)) {
            return result;
        }
    }
    result
}

fn eval_statement(stmt: &Statement, env: &Environment) -> Value {
    match stmt {
        Statement::Let { name, value } => {
            let value = eval_expr(value, env);
            if value.is_error() {
                return value;
            }
            env.set(*name, value);
            Value::Null
        }
        Statement::Return(value) => {
            let value = eval_expr(value, env);
            if value.is_error() {
                return value;
            }
            Value::ReturnValue(Box::new(value))
        }
        Statement::Expression(expr) => eval_expr(expr, env),
    }
}

fn eval_expr(expr: &Expr, env: &Environment) -> Value {
    match expr {
        Expr::IntegerLiteral(v) => Value::Integer(*v),
        Expr::StringLiteral(s) => Value::str(s.as_str()),
        Expr::Boolean(b) => Value::Boolean(*b),
        Expr::Identifier(name) => eval_identifier(*name, env),
        Expr::Prefix { op, right } => {
            let right = eval_expr(right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix(op, right)
        }
        Expr::Infix { left, op, right } => {
            let left = eval_expr(left, env);
            if left.is_error() {
                return left;
            }
            let right = eval_expr(right, env);
            if right.is_error() {
                return right;
            }
            eval_infix(op, left, right)
        }
        Expr::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expr(condition, env);
            if condition.is_error() {
                return condition;
            }
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alt) = alternative {
                eval_block(alt, env)
            } else {
                Value::Null
            }
        }
        Expr::FunctionLiteral { params, body } => Value::Function(Rc::new(Function {
            params: params.clone(),
            body: body.clone(),
            env: env.clone(),
        })),
        Expr::Call { function, args } => {
            let callee = eval_expr(function, env);
            if callee.is_error() {
                return callee;
            }
            let args = match eval_expr_list(args, env) {
                Ok(args) => args,
                Err(e) => return e,
            };
            apply_function(callee, &args)
        }
        Expr::ArrayLiteral(elements) => match eval_expr_list(elements, env) {
            Ok(values) => Value::array(values),
            Err(e) => e,
        },
        Expr::HashLiteral(pairs) => eval_hash_literal(pairs, env),
        Expr::Index { left, index } => {
            let left = eval_expr(left, env);
            if left.is_error() {
                return left;
            }
            let index = eval_expr(index, env);
            if index.is_error() {
                return index;
            }
            eval_index(left, index)
        }
    }
}

fn eval_expr_list(exprs: &[Expr], env: &Environment) -> Result<Vec<Value>, Value> {
    let mut values = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let value = eval_expr(expr, env);
        if value.is_error() {
            return Err(value);
        }
        values.push(value);
    }
    Ok(values)
}

fn eval_identifier(name: Symbol, env: &Environment) -> Value {
    if name.as_str() == "null" {
        return Value::Null;
    }
    if let Some(value) = env.get(name) {
        return value;
    }
    if let Some((_, builtin)) = lookup_builtin(&name.as_str()) {
        return Value::Builtin(builtin);
    }
    Value::Error(format!("identifier not found: {name}"))
}

fn eval_prefix(op: &str, right: Value) -> Value {
    match op {
        "!" => Value::Boolean(!right.is_truthy()),
        "-" => match right {
            Value::Integer(v) => Value::Integer(-v),
            other => Value::Error(format!("unknown operator: -{}", other.type_name())),
        },
        other => Value::Error(format!("unknown operator: {other}{}", right.type_name())),
    }
}

fn eval_infix(op: &str, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix(op, *l, *r),
        (Value::Boolean(l), Value::Boolean(r)) => eval_equality_infix(op, l == r, &left, &right),
        (Value::Str(l), Value::Str(r)) => match op {
            "+" => Value::str(format!("{l}{r}")),
            other => Value::Error(format!("unknown operator: STRING {other} STRING")),
        },
        _ if std::mem::discriminant(&left) != std::mem::discriminant(&right) => Value::Error(
            format!("type mismatch: {} {op} {}", left.type_name(), right.type_name()),
        ),
        _ => Value::Error(format!(
            "unknown operator: {} {op} {}",
            left.type_name(),
            right.type_name()
        )),
    }
}

fn eval_integer_infix(op: &str, l: i64, r: i64) -> Value {
    match op {
        "+" => Value::Integer(l.wrapping_add(r)),
        "-" => Value::Integer(l.wrapping_sub(r)),
        "*" => Value::Integer(l.wrapping_mul(r)),
        "/" => {
            if r == 0 {
                Value::Null
            } else {
                Value::Integer(floor_div(l, r))
            }
        }
        "<" => Value::Boolean(l < r),
        ">" => Value::Boolean(l > r),
        "==" => Value::Boolean(l == r),
        "!=" => Value::Boolean(l != r),
        other => Value::Error(format!("unknown operator: INTEGER {other} INTEGER")),
    }
}

/// True floor division (rounds toward negative infinity for every sign
/// combination). `div_euclid` only agrees with this for a non-negative
/// divisor, e.g. `7.div_euclid(-2) == -3` but floor(7 / -2) == -4.
fn floor_div(l: i64, r: i64) -> i64 {
    let q = l / r;
    let rem = l % r;
    if rem != 0 && (rem < 0) != (r < 0) {
        q - 1
    } else {
        q
    }
}

fn eval_equality_infix(op: &str, equal: bool, left: &Value, right: &Value) -> Value {
    match op {
        "==" => Value::Boolean(equal),
        "!=" => Value::Boolean(!equal),
        other => Value::Error(format!(
            "unknown operator: {} {other} {}",
            left.type_name(),
            right.type_name()
        )),
    }
}

fn eval_hash_literal(pairs: &[(Expr, Expr)], env: &Environment) -> Value {
    let mut map = IndexMap::with_capacity(pairs.len());
    for (key_expr, value_expr) in pairs {
        let key = eval_expr(key_expr, env);
        if key.is_error() {
            return key;
        }
        let value = eval_expr(value_expr, env);
        if value.is_error() {
            return value;
        }
        let key = match HashKey::from_value(&key) {
            Some(key) => key,
            None => return Value::Error(format!("unusable as hash key: {}", key.type_name())),
        };
        map.insert(key, value);
    }
    Value::Hash(Rc::new(map))
}

fn eval_index(left: Value, index: Value) -> Value {
    match (&left, &index) {
        (Value::Array(items), Value::Integer(i)) => {
            let len = items.len() as i64;
            let idx = if *i < 0 { i + len } else { *i };
            if idx < 0 || idx >= len {
                Value::Null
            } else {
                items[idx as usize].clone()
            }
        }
        (Value::Hash(map), _) => match HashKey::from_value(&index) {
            Some(key) => map.get(&key).cloned().unwrap_or(Value::Null),
            None => Value::Error(format!("unusable as hash key: {}", index.type_name())),
        },
        _ => Value::Error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}

fn apply_function(callee: Value, args: &[Value]) -> Value {
    match callee {
        Value::Function(func) => {
            let call_env = Environment::enclosed(&func.env);
            for (param, arg) in func.params.iter().zip(args) {
                call_env.set(*param, arg.clone());
            }
            let result = eval_block(&func.body, &call_env);
            match result {
                Value::ReturnValue(inner) => *inner,
                other => other,
            }
        }
        Value::Builtin(builtin) => (builtin.func)(args),
        other => Value::Error(format!("not a function: {}", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monke_par::Parser;

    fn eval_source(src: &str) -> Value {
        let mut parser = Parser::new(src);
        let program = parser.parse_program();
        assert!(parser.errors().is_empty(), "{:?}", parser.errors());
        eval_program(&program, &Environment::new())
    }

    #[test]
    fn evaluates_integer_arithmetic() {
        assert_eq!(eval_source("5 + 5 * 2"), Value::Integer(15));
        assert_eq!(eval_source("(5 + 10) / 3"), Value::Integer(5));
    }

    #[test]
    fn division_by_zero_is_null() {
        assert_eq!(eval_source("5 / 0"), Value::Null);
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        assert_eq!(eval_source("-7 / 2"), Value::Integer(-4));
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity_with_a_negative_divisor() {
        assert_eq!(eval_source("7 / -2"), Value::Integer(-4));
        assert_eq!(eval_source("-7 / -2"), Value::Integer(3));
    }

    #[test]
    fn type_mismatch_produces_the_documented_error() {
        match eval_source("5 + true") {
            Value::Error(msg) => assert_eq!(msg, "type mismatch: INTEGER + BOOLEAN"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn let_and_return_interact_with_functions() {
        assert_eq!(
            eval_source("let identity = fn(x) { return x; }; identity(5);"),
            Value::Integer(5)
        );
    }

    #[test]
    fn closures_capture_their_defining_environment_by_reference() {
        let src = "let newAdder = fn(a) { fn(b) { a + b } }; let addTwo = newAdder(2); addTwo(3);";
        assert_eq!(eval_source(src), Value::Integer(5));
    }

    #[test]
    fn array_index_wraps_negative_indices() {
        assert_eq!(eval_source("[1, 2, 3][-1]"), Value::Integer(3));
        assert_eq!(eval_source("[1, 2, 3][10]"), Value::Null);
    }

    #[test]
    fn hash_literal_and_index_round_trip() {
        let src = r#"{"one": 1, "two": 2}["one"] + {"one": 1, "two": 2}["two"]"#;
        assert_eq!(eval_source(src), Value::Integer(3));
    }

    #[test]
    fn unusable_hash_key_is_an_error() {
        match eval_source("{fn(x){x}: 1}") {
            Value::Error(msg) => assert!(msg.starts_with("unusable as hash key")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn builtins_are_reachable_as_identifiers() {
        assert_eq!(eval_source(r#"len("monkey")"#), Value::Integer(6));
    }

    #[test]
    fn recursive_fibonacci_matches_expected_value() {
        let src = "let fib = fn(x){ if (x==0){0} else { if (x==1){1} else { fib(x-1)+fib(x-2) } } }; fib(15)";
        assert_eq!(eval_source(src), Value::Integer(610));
    }
}
