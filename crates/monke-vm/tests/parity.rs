//! Cross-backend parity: the tree-walking evaluator and the compiler+VM
//! pipeline must agree on every program's observable result.

use monke_compiler::Compiler;
use monke_eval::eval_program;
use monke_obj::Environment;
use monke_par::Parser;
use monke_vm::Vm;

fn parse(source: &str) -> monke_par::Program {
    let mut parser = Parser::new(source);
    let program = parser.parse_program();
    assert!(
        parser.errors().is_empty(),
        "unexpected parse errors: {:?}",
        parser.errors()
    );
    program
}

fn assert_parity(source: &str) {
    let program = parse(source);

    let env = Environment::new();
    let evaluated = eval_program(&program, &env);

    let mut compiler = Compiler::new();
    compiler.compile_program(&program);
    assert!(
        compiler.errors().is_empty(),
        "unexpected compile errors for {source:?}: {:?}",
        compiler.errors()
    );
    let bytecode = compiler.into_bytecode();
    let mut vm = Vm::new(bytecode);
    vm.run().unwrap_or_else(|e| panic!("vm error for {source:?}: {e}"));

    assert_eq!(
        evaluated.inspect(),
        vm.last_popped().inspect(),
        "evaluator and vm diverged on {source:?}"
    );
}

#[test]
fn integer_arithmetic_agrees() {
    assert_parity("1 + 2 * 3 - (4 / 2)");
    assert_parity("5 / 0");
}

#[test]
fn floor_division_agrees_on_negative_divisors() {
    assert_parity("-7 / 2");
    assert_parity("7 / -2");
    assert_parity("-7 / -2");
}

#[test]
fn booleans_and_comparisons_agree() {
    assert_parity("1 < 2 == true");
    assert_parity("!(1 > 2)");
}

#[test]
fn conditionals_agree() {
    assert_parity("if (1 > 2) { 10 } else { 20 }");
    assert_parity("if (false) { 10 }");
}

#[test]
fn globals_agree() {
    assert_parity("let one = 1; let two = 2; one + two");
}

#[test]
fn string_concatenation_agrees() {
    assert_parity(r#""mon" + "ke""#);
}

#[test]
fn arrays_and_hashes_agree() {
    assert_parity("[1, 2, 3][1 + 1]");
    assert_parity(r#"let h = {"a": 1, "b": 2}; h["b"]"#);
    assert_parity("[1, 2, 3][-1]");
}

#[test]
fn functions_and_closures_agree() {
    assert_parity("let add = fn(a, b) { a + b }; add(1, 2)");
    assert_parity(
        "let newAdder = fn(a) { fn(b) { a + b } }; let addTwo = newAdder(2); addTwo(3)",
    );
}

#[test]
fn recursive_functions_agree() {
    assert_parity(
        "let fib = fn(x) { if (x < 2) { x } else { fib(x - 1) + fib(x - 2) } }; fib(15)",
    );
}

#[test]
fn builtins_agree() {
    assert_parity(r#"len("monke")"#);
    assert_parity("first([1, 2, 3])");
    assert_parity("rest([1, 2, 3])");
    assert_parity("push([1], 2)");
}

#[test]
fn type_mismatch_diverges_to_null_not_error() {
    // Documented divergence: the evaluator raises a `Value::Error`, the VM
    // is lenient and pushes `Value::Null` (spec §7, §9). Parity here means
    // "both backends are internally consistent with that rule", not that
    // their outputs match byte for byte.
    let program = parse("1 + true");

    let env = Environment::new();
    let evaluated = eval_program(&program, &env);
    assert!(evaluated.is_error());

    let mut compiler = Compiler::new();
    compiler.compile_program(&program);
    let bytecode = compiler.into_bytecode();
    let mut vm = Vm::new(bytecode);
    vm.run().unwrap();
    assert_eq!(vm.last_popped(), &monke_obj::Value::Null);
}
