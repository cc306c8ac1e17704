//! Task unit: one named operation with uniform timing and failure capture.

mod operation;
pub use operation::{BlockingOperation, FnOperation, Operation, OperationError};

mod unit;
pub use unit::Task;

pub(crate) mod panic;
