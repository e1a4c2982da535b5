//! monke-par — AST types and the Pratt parser that builds them from tokens.

mod ast;
mod error;
mod parser;

pub use ast::{BlockStatement, Expr, Program, Statement};
pub use error::ParseError;
pub use parser::Parser;
