//! monke-eval — the recursive tree-walking evaluator: the reference
//! semantics the compiler and VM are cross-validated against.

mod evaluator;

pub use evaluator::eval_program;
