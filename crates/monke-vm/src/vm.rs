//! The stack virtual machine (spec §4.6).
//!
//! A single fetch-decode-dispatch loop over a fixed-capacity data stack,
//! mirroring the compiler's "no mutable-field proxies" style (spec §9):
//! `sp` and `frames` are held directly on `Vm`, never behind accessor
//! indirection.

use crate::error::VmError;
use crate::frame::Frame;
use indexmap::IndexMap;
use monke_code::{read_operands, Opcode};
use monke_compiler::Bytecode;
use monke_obj::{Closure, CompiledFunction, HashKey, Value, BUILTINS};
use std::rc::Rc;

const STACK_SIZE: usize = 2048;
const GLOBALS_SIZE: usize = 65536;
const MAX_FRAMES: usize = 1024;

#[derive(Debug)]
pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Vm::with_globals(bytecode, vec![Value::Null; GLOBALS_SIZE])
    }

    /// Reuses a globals array across calls, the way the REPL keeps state
    /// alive from one input line to the next.
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let main_fn = Rc::new(CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_params: 0,
        });
        let main_closure = Rc::new(Closure {
            func: main_fn,
            free: Vec::new(),
        });
        Vm {
            constants: bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![Frame::new(main_closure, 0)],
        }
    }

    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The slot just above the stack top: the conventional REPL output
    /// (spec §4.6 "last_popped").
    pub fn last_popped(&self) -> &Value {
        &self.stack[self.sp]
    }

    pub fn run(&mut self) -> Result<(), VmError> {
        while self.current_frame().ip < self.current_frame().instructions_len() {
            let ip = self.current_frame().ip;
            let closure = self.current_frame().closure.clone();
            let bytes = &closure.func.instructions.0;

            let opcode_byte = bytes[ip];
            let op = Opcode::from_byte(opcode_byte).ok_or(VmError::UnknownOpcode(opcode_byte))?;
            let (operands, width) = read_operands(op, &bytes[ip + 1..]);
            self.current_frame_mut().ip = ip + 1 + width;

            self.execute(op, &operands)?;
        }
        Ok(())
    }

    fn execute(&mut self, op: Opcode, operands: &[u32]) -> Result<(), VmError> {
        match op {
            Opcode::PConstant => {
                let value = self.constants[operands[0] as usize].clone();
                self.push(value)?;
            }
            Opcode::PTrue => self.push(Value::Boolean(true))?,
            Opcode::PFalse => self.push(Value::Boolean(false))?,
            Opcode::PNull => self.push(Value::Null)?,
            Opcode::Pop => {
                self.pop();
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                let right = self.pop();
                let left = self.pop();
                self.push(execute_binary_operation(op, left, right))?;
            }
            Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => {
                let right = self.pop();
                let left = self.pop();
                self.push(execute_comparison(op, &left, &right))?;
            }
            Opcode::Minus => {
                let operand = self.pop();
                let value = match operand {
                    Value::Integer(v) => Value::Integer(-v),
                    _ => Value::Null,
                };
                self.push(value)?;
            }
            Opcode::Bang => {
                let operand = self.pop();
                self.push(Value::Boolean(!operand.is_truthy()))?;
            }
            Opcode::Jump => {
                self.current_frame_mut().ip = operands[0] as usize;
            }
            Opcode::JumpNT => {
                let condition = self.pop();
                if !condition.is_truthy() {
                    self.current_frame_mut().ip = operands[0] as usize;
                }
            }
            Opcode::SetGlobal => {
                let value = self.pop();
                self.globals[operands[0] as usize] = value;
            }
            Opcode::GetGlobal => {
                let value = self.globals[operands[0] as usize].clone();
                self.push(value)?;
            }
            Opcode::SetLocal => {
                let bp = self.current_frame().bp;
                let value = self.pop();
                self.stack[bp + operands[0] as usize] = value;
            }
            Opcode::GetLocal => {
                let bp = self.current_frame().bp;
                let value = self.stack[bp + operands[0] as usize].clone();
                self.push(value)?;
            }
            Opcode::GetBuiltin => {
                self.push(Value::Builtin(BUILTINS[operands[0] as usize]))?;
            }
            Opcode::GetFree => {
                let value = self.current_frame().closure.free[operands[0] as usize].clone();
                self.push(value)?;
            }
            Opcode::PArray => {
                let n = operands[0] as usize;
                let elements = self.stack[self.sp - n..self.sp].to_vec();
                self.sp -= n;
                self.push(Value::array(elements))?;
            }
            Opcode::PHash => {
                let n = operands[0] as usize;
                let pairs = self.stack[self.sp - n..self.sp].to_vec();
                self.sp -= n;
                let hash = self.build_hash(&pairs)?;
                self.push(hash)?;
            }
            Opcode::Index => {
                let index = self.pop();
                let left = self.pop();
                let value = execute_index(left, index)?;
                self.push(value)?;
            }
            Opcode::Call => self.execute_call(operands[0] as usize)?,
            Opcode::ReturnValue => {
                let value = self.pop();
                let frame = self.frames.pop().expect("return with no frame");
                self.sp = frame.bp - 1;
                self.push(value)?;
            }
            Opcode::Return => {
                let frame = self.frames.pop().expect("return with no frame");
                self.sp = frame.bp - 1;
                self.push(Value::Null)?;
            }
            Opcode::Closure => self.execute_closure(operands[0], operands[1] as usize)?,
        }
        Ok(())
    }

    fn execute_call(&mut self, n_args: usize) -> Result<(), VmError> {
        let callee = self.stack[self.sp - 1 - n_args].clone();
        match callee {
            Value::Closure(closure) => {
                if n_args != closure.func.num_params as usize {
                    return Err(VmError::WrongArgumentCount {
                        want: closure.func.num_params as usize,
                        got: n_args,
                    });
                }
                if self.frames.len() >= MAX_FRAMES {
                    return Err(VmError::FrameOverflow);
                }
                let bp = self.sp - n_args;
                self.sp = bp + closure.func.num_locals as usize;
                self.frames.push(Frame::new(closure, bp));
            }
            Value::Builtin(builtin) => {
                let args = self.stack[self.sp - n_args..self.sp].to_vec();
                let result = (builtin.func)(&args);
                self.sp -= n_args + 1;
                self.push(result)?;
            }
            _ => return Err(VmError::NotCallable),
        }
        Ok(())
    }

    fn execute_closure(&mut self, const_idx: u32, n_free: usize) -> Result<(), VmError> {
        let func = match &self.constants[const_idx as usize] {
            Value::CompiledFunction(func) => func.clone(),
            _ => return Err(VmError::NotACompiledFunction(const_idx)),
        };
        let free = self.stack[self.sp - n_free..self.sp].to_vec();
        self.sp -= n_free;
        self.push(Value::Closure(Rc::new(Closure { func, free })))
    }

    fn build_hash(&self, pairs: &[Value]) -> Result<Value, VmError> {
        let mut map = IndexMap::with_capacity(pairs.len() / 2);
        for chunk in pairs.chunks(2) {
            let key = HashKey::from_value(&chunk[0]).ok_or_else(|| {
                VmError::Runtime(format!("unusable as hash key: {}", chunk[0].type_name()))
            })?;
            map.insert(key, chunk[1].clone());
        }
        Ok(Value::Hash(Rc::new(map)))
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("vm always has a frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("vm always has a frame")
    }

    fn push(&mut self, value: Value) -> Result<(), VmError> {
        if self.sp >= STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.sp -= 1;
        self.stack[self.sp].clone()
    }
}

fn execute_binary_operation(op: Opcode, left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => match op {
            Opcode::Add => Value::Integer(l.wrapping_add(r)),
            Opcode::Sub => Value::Integer(l.wrapping_sub(r)),
            Opcode::Mul => Value::Integer(l.wrapping_mul(r)),
            Opcode::Div => {
                if r == 0 {
                    Value::Null
                } else {
                    Value::Integer(floor_div(l, r))
                }
            }
            _ => unreachable!("execute_binary_operation only called for arithmetic opcodes"),
        },
        (Value::Str(l), Value::Str(r)) if op == Opcode::Add => {
            Value::str(format!("{l}{r}"))
        }
        // Type-mismatched or otherwise unsupported operands: the VM is
        // lenient here where the evaluator raises an error (spec §7, §9).
        _ => Value::Null,
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

fn execute_comparison(op: Opcode, left: &Value, right: &Value) -> Value {
    match op {
        Opcode::Equal => Value::Boolean(Value::values_equal(left, right)),
        Opcode::NotEqual => Value::Boolean(!Value::values_equal(left, right)),
        Opcode::GreaterThan => match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Value::Boolean(l > r),
            _ => Value::Null,
        },
        _ => unreachable!("execute_comparison only called for comparison opcodes"),
    }
}

fn execute_index(left: Value, index: Value) -> Result<Value, VmError> {
    match (&left, &index) {
        (Value::Array(items), Value::Integer(i)) => {
            let len = items.len() as i64;
            let idx = if *i < 0 { i + len } else { *i };
            if idx < 0 || idx >= len {
                Ok(Value::Null)
            } else {
                Ok(items[idx as usize].clone())
            }
        }
        (Value::Hash(map), _) => match HashKey::from_value(&index) {
            Some(key) => Ok(map.get(&key).cloned().unwrap_or(Value::Null)),
            None => Err(VmError::Runtime(format!(
                "unusable as hash key: {}",
                index.type_name()
            ))),
        },
        _ => Err(VmError::Runtime(format!(
            "index operator not supported: {}",
            left.type_name()
        ))),
    }
}
