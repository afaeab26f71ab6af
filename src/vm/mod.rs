mod invocation;
pub use self::invocation::*;

mod java_vm;
pub use self::java_vm::*;
