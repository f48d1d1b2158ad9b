//! Compiler and stack-machine VM for the Wollok execution core.
//!
//! The crate lowers linked AST nodes (from [`wollok_model`]) into stack
//! machine instructions and executes them over an [`Evaluation`]: a frame
//! stack and an object heap sharing an immutable environment. Non-local
//! control flow (`return`, exceptions, branch results) travels as
//! interruptions that unwind frames until one resumes them.

pub mod compiler;
pub mod error;
pub mod evaluation;
pub mod frame;
pub mod heap;
pub mod instruction;
pub mod natives;
pub mod runner;
pub mod step;

pub use compiler::Compiler;
pub use error::VmError;
pub use evaluation::Evaluation;
pub use frame::{Frame, ResumeSet};
pub use heap::{round_decimals, Heap, Id, InnerValue, RuntimeObject};
pub use instruction::{
    Instruction, InstructionSeq, Interruption, EXCEPTION_LOCAL, PREVIOUS_INTERRUPTION_LOCAL, SELF,
};
pub use natives::{LangNativeProvider, NativeFn, NativeProvider, NativeRegistry};
pub use runner::{bootstrap, build_evaluation_for, run, run_tests, TestOutcome, TestReport};
pub use step::step;
