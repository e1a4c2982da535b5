//! A VM activation record (spec §3: "Frame").

use monke_obj::Closure;
use std::rc::Rc;

#[derive(Debug)]
pub struct Frame {
    pub closure: Rc<Closure>,
    pub ip: usize,
    pub bp: usize,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, bp: usize) -> Self {
        Frame { closure, ip: 0, bp }
    }

    pub fn instructions_len(&self) -> usize {
        self.closure.func.instructions.len()
    }
}
