//! AST → bytecode compiler (spec §4.5).
//!
//! Holds an explicit stack of compilation scopes rather than proxying
//! "current instructions" through mutable fields, per the source's own
//! re-architecture note (spec §9): each scope owns its instructions
//! buffer and its last/previous emitted-instruction bookkeeping directly.

use crate::error::CompileError;
use crate::symbol_table::{Binding, Scope, SymbolTable};
use monke_code::{Instructions, Opcode};
use monke_obj::{CompiledFunction, Value, BUILTINS};
use monke_par::{BlockStatement, Expr, Program, Statement};
use monke_util::Symbol;
use std::rc::Rc;

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

pub struct Compiler {
    constants: Vec<Value>,
    scopes: Vec<CompilationScope>,
    symbol_table: SymbolTable,
    errors: Vec<CompileError>,
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (i, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(i as u16, Symbol::intern(builtin.name));
        }
        Compiler {
            constants: Vec::new(),
            scopes: vec![CompilationScope::default()],
            symbol_table,
            errors: Vec::new(),
        }
    }

    /// Fresh instructions, but the symbol table and constant pool carry
    /// over — what the REPL uses so each line sees every earlier binding
    /// (spec's ambient stack: a session persists across input lines).
    pub fn new_with_state(constants: Vec<Value>, symbol_table: SymbolTable) -> Self {
        Compiler {
            constants,
            scopes: vec![CompilationScope::default()],
            symbol_table,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub fn compile_program(&mut self, program: &Program) {
        for stmt in &program.statements {
            self.compile_statement(stmt);
            if !self.errors.is_empty() {
                return;
            }
        }
    }

    /// Consumes the compiler, handing back the top-level instructions and
    /// the constant pool built alongside them.
    pub fn into_bytecode(mut self) -> Bytecode {
        let top = self.scopes.pop().expect("compiler always has a scope");
        Bytecode {
            instructions: top.instructions,
            constants: self.constants,
        }
    }

    /// Splits the compiler into reusable REPL state plus the bytecode
    /// just produced, without cloning the constant pool.
    pub fn into_parts(mut self) -> (Bytecode, SymbolTable) {
        let top = self.scopes.pop().expect("compiler always has a scope");
        (
            Bytecode {
                instructions: top.instructions,
                constants: self.constants,
            },
            self.symbol_table,
        )
    }

    fn compile_block(&mut self, block: &BlockStatement) {
        for stmt in &block.statements {
            self.compile_statement(stmt);
            if !self.errors.is_empty() {
                return;
            }
        }
    }

    fn compile_statement(&mut self, stmt: &Statement) {
        if !self.errors.is_empty() {
            return;
        }
        match stmt {
            Statement::Expression(expr) => {
                self.compile_expr(expr);
                if self.errors.is_empty() {
                    self.emit(Opcode::Pop, &[]);
                }
            }
            Statement::Let { name, value } => {
                // Defined BEFORE compiling the value so `let f = fn(){ f() }`
                // resolves `f` inside its own body (spec §9 Open Question).
                let binding = self.symbol_table.define(*name);
                self.compile_expr(value);
                if !self.errors.is_empty() {
                    return;
                }
                match binding.scope {
                    Scope::Global => self.emit(Opcode::SetGlobal, &[binding.index as u32]),
                    Scope::Local => self.emit(Opcode::SetLocal, &[binding.index as u32]),
                    Scope::Builtin | Scope::Free => unreachable!("define() never yields this"),
                };
            }
            Statement::Return(value) => {
                self.compile_expr(value);
                if self.errors.is_empty() {
                    self.emit(Opcode::ReturnValue, &[]);
                }
            }
        }
    }

    fn compile_expr(&mut self, expr: &Expr) {
        if !self.errors.is_empty() {
            return;
        }
        match expr {
            Expr::IntegerLiteral(v) => {
                let idx = self.add_constant(Value::Integer(*v));
                self.emit(Opcode::PConstant, &[idx]);
            }
            Expr::StringLiteral(s) => {
                let idx = self.add_constant(Value::str(s.as_str()));
                self.emit(Opcode::PConstant, &[idx]);
            }
            Expr::Boolean(true) => {
                self.emit(Opcode::PTrue, &[]);
            }
            Expr::Boolean(false) => {
                self.emit(Opcode::PFalse, &[]);
            }
            Expr::Identifier(name) => self.compile_identifier(*name),
            Expr::Prefix { op, right } => {
                self.compile_expr(right);
                if !self.errors.is_empty() {
                    return;
                }
                match op.as_str() {
                    "-" => self.emit(Opcode::Minus, &[]),
                    "!" => self.emit(Opcode::Bang, &[]),
                    other => {
                        self.errors
                            .push(CompileError::Unsupported(format!("prefix operator {other}")));
                        return;
                    }
                };
            }
            Expr::Infix { left, op, right } => self.compile_infix(left, op, right),
            Expr::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expr(element);
                    if !self.errors.is_empty() {
                        return;
                    }
                }
                self.emit(Opcode::PArray, &[elements.len() as u32]);
            }
            Expr::HashLiteral(pairs) => {
                for (key, value) in pairs {
                    self.compile_expr(key);
                    self.compile_expr(value);
                    if !self.errors.is_empty() {
                        return;
                    }
                }
                self.emit(Opcode::PHash, &[(pairs.len() * 2) as u32]);
            }
            Expr::Index { left, index } => {
                self.compile_expr(left);
                self.compile_expr(index);
                if !self.errors.is_empty() {
                    return;
                }
                self.emit(Opcode::Index, &[]);
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref()),
            Expr::FunctionLiteral { params, body } => self.compile_function_literal(params, body),
            Expr::Call { function, args } => {
                self.compile_expr(function);
                for arg in args {
                    self.compile_expr(arg);
                    if !self.errors.is_empty() {
                        return;
                    }
                }
                self.emit(Opcode::Call, &[args.len() as u32]);
            }
        }
    }

    fn compile_identifier(&mut self, name: Symbol) {
        if name.as_str() == "null" {
            self.emit(Opcode::PNull, &[]);
            return;
        }
        match self.symbol_table.resolve(name) {
            Some(binding) => self.load_symbol(binding),
            None => self
                .errors
                .push(CompileError::UnknownIdentifier(name.to_string())),
        };
    }

    fn load_symbol(&mut self, binding: Binding) {
        let index = binding.index as u32;
        match binding.scope {
            Scope::Global => self.emit(Opcode::GetGlobal, &[index]),
            Scope::Local => self.emit(Opcode::GetLocal, &[index]),
            Scope::Builtin => self.emit(Opcode::GetBuiltin, &[index]),
            Scope::Free => self.emit(Opcode::GetFree, &[index]),
        };
    }

    fn compile_infix(&mut self, left: &Expr, op: &str, right: &Expr) {
        // `<` reuses `GreaterThan` by swapping evaluation order (spec §4.5).
        if op == "<" {
            self.compile_expr(right);
            self.compile_expr(left);
        } else {
            self.compile_expr(left);
            self.compile_expr(right);
        }
        if !self.errors.is_empty() {
            return;
        }
        match op {
            "+" => self.emit(Opcode::Add, &[]),
            "-" => self.emit(Opcode::Sub, &[]),
            "*" => self.emit(Opcode::Mul, &[]),
            "/" => self.emit(Opcode::Div, &[]),
            "==" => self.emit(Opcode::Equal, &[]),
            "!=" => self.emit(Opcode::NotEqual, &[]),
            ">" | "<" => self.emit(Opcode::GreaterThan, &[]),
            other => {
                self.errors
                    .push(CompileError::Unsupported(format!("infix operator {other}")));
                return;
            }
        };
    }

    fn compile_if(&mut self, condition: &Expr, consequence: &BlockStatement, alternative: Option<&BlockStatement>) {
        self.compile_expr(condition);
        if !self.errors.is_empty() {
            return;
        }
        let jump_nt_pos = self.emit(Opcode::JumpNT, &[0xFFFF]);

        self.compile_block(consequence);
        if !self.errors.is_empty() {
            return;
        }
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        }

        let jump_pos = self.emit(Opcode::Jump, &[0xFFFF]);
        let after_consequence = self.current_instructions().len() as u32;
        self.back_patch(jump_nt_pos, after_consequence);

        match alternative {
            Some(alt) => {
                self.compile_block(alt);
                if !self.errors.is_empty() {
                    return;
                }
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }
            }
            None => {
                self.emit(Opcode::PNull, &[]);
            }
        }

        let after_alternative = self.current_instructions().len() as u32;
        self.back_patch(jump_pos, after_alternative);
    }

    fn compile_function_literal(&mut self, params: &[Symbol], body: &BlockStatement) {
        self.enter_scope();

        for param in params {
            self.symbol_table.define(*param);
        }

        self.compile_block(body);
        if !self.errors.is_empty() {
            // Error state is global; unwind the scope so `errors` stays
            // consistent even though we never finish this literal.
            self.leave_scope();
            return;
        }

        if self.current_instructions().is_empty() {
            self.emit(Opcode::Return, &[]);
        } else if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        } else if !self.last_instruction_is(Opcode::ReturnValue) && !self.last_instruction_is(Opcode::Return) {
            self.emit(Opcode::Return, &[]);
        }

        let free_symbols = self.symbol_table.free_symbols.clone();
        let num_locals = self.symbol_table.num_definitions();
        let instructions = self.leave_scope();

        for symbol in &free_symbols {
            self.load_symbol(*symbol);
        }

        let compiled = Value::CompiledFunction(Rc::new(CompiledFunction {
            instructions,
            num_locals,
            num_params: params.len() as u16,
        }));
        let const_idx = self.add_constant(compiled);
        self.emit(Opcode::Closure, &[const_idx, free_symbols.len() as u32]);
    }

    fn add_constant(&mut self, value: Value) -> u32 {
        self.constants.push(value);
        (self.constants.len() - 1) as u32
    }

    fn emit(&mut self, op: Opcode, operands: &[u32]) -> usize {
        let scope = self.scopes.last_mut().expect("at least one scope");
        let position = scope.instructions.push_instruction(op, operands);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode: op, position });
        position
    }

    fn current_instructions(&self) -> &Instructions {
        &self.scopes.last().expect("at least one scope").instructions
    }

    fn back_patch(&mut self, position: usize, operand: u32) {
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .instructions
            .replace_operand(position, operand);
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.scopes
            .last()
            .and_then(|scope| scope.last_instruction)
            .is_some_and(|emitted| emitted.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.scopes.last_mut().expect("at least one scope");
        let last = scope.last_instruction.expect("remove_last_pop with no last instruction");
        scope.instructions.0.truncate(last.position);
        scope.last_instruction = scope.previous_instruction;
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.scopes.last_mut().expect("at least one scope");
        let last = scope
            .last_instruction
            .expect("replace_last_pop with no last instruction");
        scope.instructions.0[last.position] = Opcode::ReturnValue as u8;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: Opcode::ReturnValue,
            position: last.position,
        });
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbol_table.push_scope();
    }

    fn leave_scope(&mut self) -> Instructions {
        self.symbol_table.pop_scope();
        self.scopes.pop().expect("leave_scope with no scope").instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monke_par::Parser;

    fn compile(src: &str) -> Bytecode {
        let mut parser = Parser::new(src);
        let program = parser.parse_program();
        assert!(parser.errors().is_empty(), "{:?}", parser.errors());
        let mut compiler = Compiler::new();
        compiler.compile_program(&program);
        assert!(compiler.errors().is_empty(), "{:?}", compiler.errors());
        compiler.into_bytecode()
    }

    #[test]
    fn disassembles_exactly_as_the_worked_example_expects() {
        let bytecode = compile("1 + 2");
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(
            bytecode.instructions.to_string(),
            "0000 PConstant 0\n0003 PConstant 1\n0006 Add\n0007 Pop\n"
        );
    }

    #[test]
    fn less_than_reuses_greater_than_with_swapped_operands() {
        let bytecode = compile("1 < 2");
        assert_eq!(
            bytecode.instructions.to_string(),
            "0000 PConstant 0\n0003 PConstant 1\n0006 GreaterThan\n0007 Pop\n"
        );
        // operands were swapped, so constant 0 is the literal `2`
        assert_eq!(bytecode.constants[0], Value::Integer(2));
    }

    #[test]
    fn if_without_else_pushes_null_on_the_false_branch() {
        let bytecode = compile("if (true) { 10 }; 3333;");
        let expected = "\
0000 PTrue
0001 JumpNT 0010
0004 PConstant 0
0007 Jump 0011
0010 PNull
0011 Pop
0012 PConstant 1
0015 Pop
";
        assert_eq!(bytecode.instructions.to_string(), expected);
    }

    #[test]
    fn global_let_statements_emit_set_and_get_global() {
        let bytecode = compile("let one = 1; let two = 2; one + two;");
        let expected = "\
0000 PConstant 0
0003 SetGlobal 0
0006 PConstant 1
0009 SetGlobal 1
0012 GetGlobal 0
0015 GetGlobal 1
0018 Add
0019 Pop
";
        assert_eq!(bytecode.instructions.to_string(), expected);
    }

    #[test]
    fn closure_compilation_matches_the_worked_example() {
        let bytecode = compile("fn(a){ fn(b){ a + b } }");
        match bytecode.constants.last().unwrap() {
            Value::CompiledFunction(outer_fn_const) => {
                assert_eq!(
                    outer_fn_const.instructions.to_string(),
                    "0000 GetLocal 0\n0002 Closure 0 1\n0006 ReturnValue\n"
                );
            }
            other => panic!("expected the outer function literal, got {other:?}"),
        }
        match &bytecode.constants[0] {
            Value::CompiledFunction(inner_fn_const) => {
                assert_eq!(
                    inner_fn_const.instructions.to_string(),
                    "0000 GetFree 0\n0002 GetLocal 0\n0004 Add\n0005 ReturnValue\n"
                );
            }
            other => panic!("expected the inner function literal, got {other:?}"),
        }
    }

    #[test]
    fn unknown_identifier_is_a_compile_error() {
        let mut parser = Parser::new("foobar;");
        let program = parser.parse_program();
        let mut compiler = Compiler::new();
        compiler.compile_program(&program);
        assert_eq!(compiler.errors().len(), 1);
        assert_eq!(
            compiler.errors()[0],
            CompileError::UnknownIdentifier("foobar".to_string())
        );
    }

    #[test]
    fn array_and_hash_literals_emit_collection_opcodes() {
        let bytecode = compile("[1, 2, 3]");
        assert!(bytecode.instructions.to_string().contains("PArray 3"));

        let bytecode = compile(r#"{"one": 1}"#);
        assert!(bytecode.instructions.to_string().contains("PHash 2"));
    }

    #[test]
    fn compiling_the_same_program_twice_is_deterministic() {
        let src = "let a = 1; let b = a + 2; b";
        let first = compile(src);
        let second = compile(src);
        assert_eq!(first.instructions, second.instructions);
        assert_eq!(first.constants, second.constants);
    }
}
