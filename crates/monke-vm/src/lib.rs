mod error;
mod frame;
mod vm;

pub use error::VmError;
pub use frame::Frame;
pub use vm::Vm;
