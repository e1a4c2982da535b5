//! AST node definitions.
//!
//! Following the teacher's split (`faxc-par::ast`) of types-only here with
//! parsing logic elsewhere, but as tagged sum types rather than the
//! teacher's struct-per-item shape, since Monke's AST is an expression
//! grammar, not an item grammar.

use monke_util::Symbol;
use std::fmt;

/// A whole parsed program: a flat list of top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

/// A `{ ... }` block: the body of a function, `if`, or `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let { name: Symbol, value: Expr },
    Return(Expr),
    Expression(Expr),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {name} = {value};"),
            Statement::Return(value) => write!(f, "return {value};"),
            Statement::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Symbol),
    IntegerLiteral(i64),
    StringLiteral(String),
    Boolean(bool),
    ArrayLiteral(Vec<Expr>),
    /// Key/value pairs in source order (spec §3: "pairs preserve source order").
    HashLiteral(Vec<(Expr, Expr)>),
    Prefix {
        op: String,
        right: Box<Expr>,
    },
    Infix {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    FunctionLiteral {
        params: Vec<Symbol>,
        body: BlockStatement,
    },
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::IntegerLiteral(v) => write!(f, "{v}"),
            Expr::StringLiteral(s) => write!(f, "{s}"),
            Expr::Boolean(b) => write!(f, "{b}"),
            Expr::ArrayLiteral(elems) => {
                write!(f, "[{}]", join(elems))
            }
            Expr::HashLiteral(pairs) => {
                let body = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}:{v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{body}}}")
            }
            Expr::Prefix { op, right } => write!(f, "({op}{right})"),
            Expr::Infix { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{condition} {consequence}")?;
                if let Some(alt) = alternative {
                    write!(f, "else {alt}")?;
                }
                Ok(())
            }
            Expr::FunctionLiteral { params, body } => {
                let names = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "fn({names}) {body}")
            }
            Expr::Call { function, args } => write!(f, "{function}({})", join(args)),
            Expr::Index { left, index } => write!(f, "({left}[{index}])"),
        }
    }
}

fn join(exprs: &[Expr]) -> String {
    exprs
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
